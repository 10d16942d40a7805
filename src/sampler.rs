//! Interval-gated sensor sampling.
//!
//! The sampler owns the analog input and a monotonic anchor. [`SensorSampler::poll`]
//! takes at most one sample per interval; a failed read still consumes the
//! interval, so there is no early retry.

use core::fmt::Write;

use heapless::String as HString;
use log::{debug, warn};

use crate::traits::AnalogInput;

/// Capacity of a formatted reading. Large enough for any finite `f32`
/// printed with one decimal.
pub const VALUE_CAPACITY: usize = 48;

/// A successfully sampled value and its wire representation.
#[derive(Clone, Debug, PartialEq)]
pub struct Reading {
    raw: f32,
    formatted: HString<VALUE_CAPACITY>,
}

impl Reading {
    /// Build a reading from a raw value.
    ///
    /// Returns `None` for NaN or infinite values.
    pub fn from_raw(raw: f32) -> Option<Self> {
        if !raw.is_finite() {
            return None;
        }
        let mut formatted = HString::new();
        write!(formatted, "{:.1}", raw).ok()?;
        Some(Self { raw, formatted })
    }

    /// The raw value as read from the ADC.
    pub fn raw(&self) -> f32 {
        self.raw
    }

    /// The value as a fixed-precision decimal string, e.g. `"512.0"`.
    pub fn formatted(&self) -> &str {
        self.formatted.as_str()
    }
}

/// Result of one sample attempt.
#[derive(Clone, Debug, PartialEq)]
pub enum SampleOutcome {
    /// The sensor produced a usable value.
    Valid(Reading),
    /// The read failed or returned a not-a-number sentinel.
    Invalid,
}

/// Reads the sensor no more often than once per interval.
#[derive(Debug)]
pub struct SensorSampler<A> {
    input: A,
    interval_ms: u64,
    last_sample_ms: u64,
}

impl<A: AnalogInput> SensorSampler<A> {
    /// Create a sampler whose first sample is due `interval_ms` after time 0.
    pub fn new(input: A, interval_ms: u64) -> Self {
        Self {
            input,
            interval_ms,
            last_sample_ms: 0,
        }
    }

    /// Re-anchor the interval so the next sample is due `interval_ms` after `now_ms`.
    pub fn restart(&mut self, now_ms: u64) {
        self.last_sample_ms = now_ms;
    }

    /// Returns true once a full interval has passed since the last sample.
    pub fn is_due(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_sample_ms) >= self.interval_ms
    }

    /// Take a sample if one is due.
    ///
    /// The anchor advances whenever a sample is attempted, whatever its outcome.
    pub fn poll(&mut self, now_ms: u64) -> Option<SampleOutcome> {
        if !self.is_due(now_ms) {
            return None;
        }
        self.last_sample_ms = now_ms;
        Some(self.sample())
    }

    /// Read the sensor once, ignoring the interval.
    pub fn sample(&mut self) -> SampleOutcome {
        match self.input.read() {
            Ok(raw) => match Reading::from_raw(raw) {
                Some(reading) => {
                    debug!("sampled {}", reading.formatted());
                    SampleOutcome::Valid(reading)
                }
                None => {
                    warn!("failed to read from sensor: non-finite value");
                    SampleOutcome::Invalid
                }
            },
            Err(e) => {
                warn!("failed to read from sensor: {:?}", e);
                SampleOutcome::Invalid
            }
        }
    }

    /// Interval between samples in milliseconds.
    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// Timestamp of the last attempted sample (or the last restart).
    pub fn last_sample_ms(&self) -> u64 {
        self.last_sample_ms
    }

    /// Mutable access to the analog input, used by boot-time calibration.
    pub fn input_mut(&mut self) -> &mut A {
        &mut self.input
    }

    /// Shared access to the analog input.
    pub fn input(&self) -> &A {
        &self.input
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::MockAnalog;

    #[test]
    fn reading_uses_one_decimal() {
        assert_eq!(Reading::from_raw(512.0).unwrap().formatted(), "512.0");
        assert_eq!(Reading::from_raw(0.0).unwrap().formatted(), "0.0");
        assert_eq!(Reading::from_raw(3.14159).unwrap().formatted(), "3.1");
        assert_eq!(Reading::from_raw(-2.5).unwrap().formatted(), "-2.5");
    }

    #[test]
    fn reading_rejects_non_finite() {
        assert!(Reading::from_raw(f32::NAN).is_none());
        assert!(Reading::from_raw(f32::INFINITY).is_none());
        assert!(Reading::from_raw(f32::NEG_INFINITY).is_none());
    }

    #[test]
    fn reading_fits_largest_float() {
        let reading = Reading::from_raw(f32::MAX).unwrap();
        assert!(reading.formatted().ends_with(".0"));
    }

    #[test]
    fn not_due_before_interval() {
        let mut analog = MockAnalog::new();
        analog.queue(100.0);
        let mut sampler = SensorSampler::new(analog, 15_000);

        assert_eq!(sampler.poll(0), None);
        assert_eq!(sampler.poll(14_999), None);
        assert_eq!(sampler.input().read_count, 0);
    }

    #[test]
    fn due_exactly_at_interval() {
        let mut analog = MockAnalog::new();
        analog.queue(100.0);
        let mut sampler = SensorSampler::new(analog, 15_000);

        let outcome = sampler.poll(15_000).unwrap();
        assert_eq!(outcome, SampleOutcome::Valid(Reading::from_raw(100.0).unwrap()));
        assert_eq!(sampler.last_sample_ms(), 15_000);
    }

    #[test]
    fn at_most_one_sample_per_interval_at_any_tick_rate() {
        let mut analog = MockAnalog::new();
        analog.set_fallback(42.0);
        let mut sampler = SensorSampler::new(analog, 15_000);

        let samples = (0..=60_000u64)
            .step_by(7)
            .filter_map(|now| sampler.poll(now))
            .count();

        // ticks every 7ms drift slightly past each boundary
        assert_eq!(samples, 3);
        assert_eq!(sampler.input().read_count, 3);
    }

    #[test]
    fn invalid_sample_still_advances_anchor() {
        let mut analog = MockAnalog::new();
        analog.queue_invalid();
        let mut sampler = SensorSampler::new(analog, 15_000);

        assert_eq!(sampler.poll(15_000), Some(SampleOutcome::Invalid));
        assert_eq!(sampler.poll(15_001), None);
        assert_eq!(sampler.last_sample_ms(), 15_000);
    }

    #[test]
    fn read_error_is_invalid() {
        let mut analog = MockAnalog::new();
        analog.queue_error();
        let mut sampler = SensorSampler::new(analog, 10);
        assert_eq!(sampler.sample(), SampleOutcome::Invalid);
    }

    #[test]
    fn restart_reanchors_interval() {
        let mut analog = MockAnalog::new();
        analog.set_fallback(1.0);
        let mut sampler = SensorSampler::new(analog, 1_000);

        sampler.restart(5_000);
        assert!(!sampler.is_due(5_999));
        assert!(sampler.is_due(6_000));
    }
}
