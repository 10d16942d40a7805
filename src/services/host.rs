//! Host stand-ins for the board peripherals.
//!
//! Used by the desktop binary to run the unchanged control loop on a
//! workstation: a wall clock, OS-seeded randomness, a noisy simulated
//! sensor, an always-associated network and LEDs that log their state.

use std::time::Instant;

use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::traits::{AnalogInput, Clock, DigitalOutput, Entropy, NetworkLink};

/// Monotonic milliseconds since the clock was created.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    /// Start counting from now.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

/// Client-id entropy from the thread-local RNG.
#[derive(Debug, Default)]
pub struct RandEntropy;

impl Entropy for RandEntropy {
    fn next_u16(&mut self) -> u16 {
        rand::rng().random()
    }
}

/// A sensor that drifts around a baseline with occasional dropouts.
#[derive(Debug)]
pub struct SimulatedAnalog {
    rng: StdRng,
    level: f32,
    adc_max: f32,
    dropout_rate: f64,
}

impl SimulatedAnalog {
    /// Start at mid-scale of a `adc_max` ADC.
    pub fn new(adc_max: i32) -> Self {
        Self {
            rng: StdRng::from_os_rng(),
            level: adc_max as f32 / 2.0,
            adc_max: adc_max as f32,
            dropout_rate: 0.02,
        }
    }

    /// Deterministic sequence for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Probability that a read returns NaN.
    pub fn with_dropout_rate(mut self, rate: f64) -> Self {
        self.dropout_rate = rate.clamp(0.0, 1.0);
        self
    }
}

impl AnalogInput for SimulatedAnalog {
    type Error = core::convert::Infallible;

    fn read(&mut self) -> Result<f32, Self::Error> {
        if self.rng.random_bool(self.dropout_rate) {
            return Ok(f32::NAN);
        }
        let step: f32 = self.rng.random_range(-8.0..=8.0);
        self.level = (self.level + step).clamp(0.0, self.adc_max);
        Ok(self.level.round())
    }
}

/// Network link that is always up; the host OS owns connectivity.
#[derive(Debug, Default)]
pub struct HostNetwork;

impl NetworkLink for HostNetwork {
    fn is_associated(&self) -> bool {
        true
    }
}

/// An LED that logs level changes.
#[derive(Debug)]
pub struct LogLed {
    name: &'static str,
    high: Option<bool>,
}

impl LogLed {
    /// A named LED with unknown initial level.
    pub fn new(name: &'static str) -> Self {
        Self { name, high: None }
    }

    fn set(&mut self, high: bool) {
        if self.high != Some(high) {
            info!("{} led pin {}", self.name, if high { "high" } else { "low" });
            self.high = Some(high);
        }
    }
}

impl DigitalOutput for LogLed {
    type Error = core::convert::Infallible;

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.set(true);
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.set(false);
        Ok(())
    }
}
