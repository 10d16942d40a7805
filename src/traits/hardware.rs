//! Hardware abstraction traits for sensor input, indicators, and timing.
//!
//! This module defines the pin-level interfaces that let the control loop
//! run unchanged on the ESP32 and on desktop mocks.
//!
//! # Key Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`AnalogInput`] | Raw sensor reads from an ADC channel |
//! | [`DigitalOutput`] | Drive a GPIO high or low |
//! | [`Clock`] | Monotonic millisecond time source |
//! | [`NetworkLink`] | Association state of the WiFi stack |
//! | [`Entropy`] | Random numbers for broker client ids |
//!
//! # Implementation
//!
//! For testing and desktop development, use the mock implementations
//! from [`crate::hal::mock`]. For ESP32 hardware, use the
//! implementations from `hal::esp32` (requires `esp32` feature).
//!
//! # Example
//!
//! ```rust
//! use sensor_node::traits::{AnalogInput, Indicator};
//! use sensor_node::hal::{MockAnalog, MockPin};
//!
//! let mut sensor = MockAnalog::new();
//! sensor.queue(300.0);
//! assert_eq!(sensor.read().unwrap(), 300.0);
//!
//! let mut led = Indicator::active_low(MockPin::new());
//! led.on().unwrap();
//! assert!(!led.pin().high); // active-low: on means driven low
//! ```

/// Analog sensor input.
///
/// Returns the raw converted value of a single ADC read. A read that the
/// hardware could not complete is reported either as `Err` or as a
/// non-finite value (NaN), and both are treated as an invalid sample.
pub trait AnalogInput {
    /// Error type for ADC reads.
    type Error: core::fmt::Debug;

    /// Perform one conversion and return the raw value.
    fn read(&mut self) -> Result<f32, Self::Error>;
}

/// A single digital output pin.
pub trait DigitalOutput {
    /// Error type for pin writes.
    type Error: core::fmt::Debug;

    /// Drive the pin high.
    fn set_high(&mut self) -> Result<(), Self::Error>;

    /// Drive the pin low.
    fn set_low(&mut self) -> Result<(), Self::Error>;
}

/// An indicator LED with its polarity folded in.
///
/// Most dev boards wire their onboard LEDs active-low, so `on()` drives the
/// pin low. The indicator also remembers the last requested state.
#[derive(Debug)]
pub struct Indicator<P> {
    pin: P,
    active_low: bool,
    lit: bool,
}

impl<P: DigitalOutput> Indicator<P> {
    /// Wraps an LED that lights when the pin is driven low.
    pub fn active_low(pin: P) -> Self {
        Self {
            pin,
            active_low: true,
            lit: false,
        }
    }

    /// Wraps an LED that lights when the pin is driven high.
    pub fn active_high(pin: P) -> Self {
        Self {
            pin,
            active_low: false,
            lit: false,
        }
    }

    /// Turn the indicator on or off.
    pub fn set(&mut self, on: bool) -> Result<(), P::Error> {
        if on != self.active_low {
            self.pin.set_high()?;
        } else {
            self.pin.set_low()?;
        }
        self.lit = on;
        Ok(())
    }

    /// Turn the indicator on.
    pub fn on(&mut self) -> Result<(), P::Error> {
        self.set(true)
    }

    /// Turn the indicator off.
    pub fn off(&mut self) -> Result<(), P::Error> {
        self.set(false)
    }

    /// Returns the last state set through this indicator.
    pub fn is_on(&self) -> bool {
        self.lit
    }

    /// Returns the underlying pin.
    pub fn pin(&self) -> &P {
        &self.pin
    }
}

/// Time source trait for `no_std` compatibility.
///
/// Provides monotonic time in milliseconds for interval gating and the
/// calibration window. On desktop, this can wrap `std::time::Instant`.
/// On embedded, use a hardware timer.
///
/// # Example
///
/// ```rust
/// use sensor_node::traits::Clock;
/// use sensor_node::hal::MockClock;
///
/// let mut clock = MockClock::new();
/// assert_eq!(clock.now_ms(), 0);
///
/// clock.advance(100);
/// assert_eq!(clock.now_ms(), 100);
/// ```
pub trait Clock {
    /// Returns current time in milliseconds since an arbitrary epoch.
    ///
    /// Must be monotonically increasing.
    fn now_ms(&self) -> u64;
}

/// Association state of the underlying network stack.
///
/// The stack reassociates on its own; the control loop only observes.
pub trait NetworkLink {
    /// Returns true while the station is associated and has an address.
    fn is_associated(&self) -> bool;
}

/// Source of random numbers.
pub trait Entropy {
    /// Returns a random 16-bit value.
    fn next_u16(&mut self) -> u16;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingPin {
        levels: alloc::vec::Vec<bool>,
    }

    impl DigitalOutput for RecordingPin {
        type Error = ();

        fn set_high(&mut self) -> Result<(), ()> {
            self.levels.push(true);
            Ok(())
        }

        fn set_low(&mut self) -> Result<(), ()> {
            self.levels.push(false);
            Ok(())
        }
    }

    struct BrokenPin;

    impl DigitalOutput for BrokenPin {
        type Error = &'static str;

        fn set_high(&mut self) -> Result<(), &'static str> {
            Err("gpio fault")
        }

        fn set_low(&mut self) -> Result<(), &'static str> {
            Err("gpio fault")
        }
    }

    #[test]
    fn active_low_indicator_inverts_levels() {
        let mut led = Indicator::active_low(RecordingPin::default());
        led.on().unwrap();
        led.off().unwrap();
        assert_eq!(led.pin().levels, [false, true]);
        assert!(!led.is_on());
    }

    #[test]
    fn active_high_indicator_follows_levels() {
        let mut led = Indicator::active_high(RecordingPin::default());
        led.on().unwrap();
        led.off().unwrap();
        assert_eq!(led.pin().levels, [true, false]);
    }

    #[test]
    fn indicator_starts_off() {
        let led = Indicator::active_low(RecordingPin::default());
        assert!(!led.is_on());
        assert!(led.pin().levels.is_empty());
    }

    #[test]
    fn failed_write_keeps_previous_state() {
        let mut led = Indicator::active_low(BrokenPin);
        assert_eq!(led.on(), Err("gpio fault"));
        assert!(!led.is_on());
    }
}
