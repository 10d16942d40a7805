//! Trait definitions for hardware abstraction and networking.
//!
//! This module defines the core abstractions that allow the sensor node to:
//! - Run on different hardware (ESP32, desktop mock)
//! - Use different broker clients and HTTP front ends
//!
//! # Submodules
//!
//! - `hardware`: Analog input, digital outputs, clock, network link, entropy
//! - `network`: MQTT client and diagnostic responder traits
//!
//! # Hardware Abstraction
//!
//! The key hardware traits are:
//!
//! - [`AnalogInput`]: Raw ADC reads for the sensor
//! - [`DigitalOutput`]: Indicator LEDs (wrapped by [`Indicator`])
//! - [`Clock`]: Monotonic time source
//! - [`NetworkLink`]: Association state of the underlying WiFi stack

pub mod hardware;
pub mod network;

pub use hardware::*;
pub use network::*;
