//! Boot-time calibration window and the range it records.
//!
//! The calibrator is an explicit `Calibrating -> Ready` state machine driven
//! by timestamps, so it can be stepped in tests without real delays. On the
//! device, [`run_calibration`] drives it to completion against a real clock.
//!
//! The window is counted from boot (clock zero), not from when calibration
//! starts, so setup work before it shortens the window rather than moving it.
//! A range is only handed out once it holds at least one observation, which
//! keeps `low <= high` for every range callers can see.
//!
//! The recorded range is informational: nothing downstream consults it.

use log::{info, warn};

use crate::traits::{AnalogInput, Clock};

/// Clock reading at reset; calibration windows are measured from here.
pub const BOOT_MS: u64 = 0;

/// Running min/max of raw values seen during the calibration window.
///
/// Starts at sentinel extremes (`low = adc_max`, `high = 0`) so the first
/// observation sets both bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CalibrationRange {
    low: i32,
    high: i32,
    observations: u32,
}

impl CalibrationRange {
    /// Create an empty range for an ADC whose full scale is `adc_max`.
    pub(crate) fn new(adc_max: i32) -> Self {
        Self {
            low: adc_max,
            high: 0,
            observations: 0,
        }
    }

    /// Widen the range to include `value`.
    pub fn observe(&mut self, value: i32) {
        if value > self.high {
            self.high = value;
        }
        if value < self.low {
            self.low = value;
        }
        self.observations = self.observations.saturating_add(1);
    }

    /// Lowest value observed.
    pub fn low(&self) -> i32 {
        self.low
    }

    /// Highest value observed.
    pub fn high(&self) -> i32 {
        self.high
    }

    /// Number of valid values observed.
    pub fn observations(&self) -> u32 {
        self.observations
    }

    /// True once at least one value has been observed.
    pub fn is_populated(&self) -> bool {
        self.observations > 0
    }
}

/// Where the calibrator is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CalibrationState {
    /// The window is open; observations widen the range.
    Calibrating {
        /// When the window opened.
        started_ms: u64,
    },
    /// The window has closed; the range is frozen.
    Ready,
}

/// Tracks sensor bounds for a fixed window after boot.
#[derive(Debug)]
pub struct Calibrator {
    state: CalibrationState,
    window_ms: u64,
    range: CalibrationRange,
}

impl Calibrator {
    /// Open a calibration window of `window_ms` starting at `started_ms`.
    ///
    /// On the device `started_ms` is [`BOOT_MS`].
    pub fn start(started_ms: u64, window_ms: u64, adc_max: i32) -> Self {
        Self {
            state: CalibrationState::Calibrating { started_ms },
            window_ms,
            range: CalibrationRange::new(adc_max),
        }
    }

    /// Current state.
    pub fn state(&self) -> CalibrationState {
        self.state
    }

    /// True once the window has closed.
    pub fn is_ready(&self) -> bool {
        self.state == CalibrationState::Ready
    }

    /// Close the window if it has elapsed at `now_ms`.
    ///
    /// Returns the (possibly new) state.
    pub fn update(&mut self, now_ms: u64) -> CalibrationState {
        if let CalibrationState::Calibrating { started_ms } = self.state {
            if now_ms.saturating_sub(started_ms) >= self.window_ms {
                self.state = CalibrationState::Ready;
            }
        }
        self.state
    }

    /// Record a raw sample taken at `now_ms`.
    ///
    /// Samples arriving after the window has closed are ignored, as are
    /// non-finite values. Returns the state after the update.
    pub fn observe(&mut self, now_ms: u64, raw: f32) -> CalibrationState {
        if self.update(now_ms) == CalibrationState::Ready {
            return CalibrationState::Ready;
        }
        if raw.is_finite() {
            self.range.observe(round_to_int(raw));
        }
        self.state
    }

    /// The range observed so far, if any value was valid. Frozen once
    /// [`Self::is_ready`] is true.
    pub fn range(&self) -> Option<&CalibrationRange> {
        self.range.is_populated().then_some(&self.range)
    }

    /// Consume the calibrator, returning the range if the window has closed
    /// and saw at least one valid value.
    pub fn finish(self) -> Option<CalibrationRange> {
        if self.is_ready() && self.range.is_populated() {
            Some(self.range)
        } else {
            None
        }
    }
}

/// Round half away from zero; `f32::round` needs std.
fn round_to_int(raw: f32) -> i32 {
    if raw >= 0.0 {
        (raw + 0.5) as i32
    } else {
        (raw - 0.5) as i32
    }
}

/// Sample `input` continuously until `window_ms` after boot.
///
/// Blocks the caller until the clock passes `BOOT_MS + window_ms`; this is
/// the boot-time calibration step and runs before the control loop and
/// before any network service starts. Returns `None` when no valid value
/// was seen, including when the window had already closed on entry.
pub fn run_calibration<A, C>(
    input: &mut A,
    clock: &C,
    window_ms: u64,
    adc_max: i32,
) -> Option<CalibrationRange>
where
    A: AnalogInput,
    C: Clock,
{
    let mut calibrator = Calibrator::start(BOOT_MS, window_ms, adc_max);
    let now = clock.now_ms();
    if calibrator.update(now) == CalibrationState::Ready {
        warn!("calibration window closed {} ms before calibration began", now - window_ms);
        return None;
    }

    info!("calibrating sensor until {} ms after boot", window_ms);
    loop {
        let raw = input.read().unwrap_or(f32::NAN);
        if calibrator.observe(clock.now_ms(), raw) == CalibrationState::Ready {
            break;
        }
    }

    let range = calibrator.finish();
    match range {
        Some(range) => info!(
            "calibration complete: low={} high={} ({} samples)",
            range.low(),
            range.high(),
            range.observations()
        ),
        None => warn!("calibration window closed without a valid sample"),
    }
    range
}
