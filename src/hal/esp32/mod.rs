//! ESP32-C3 SuperMini hardware abstraction layer for the sensor node.
//!
//! # Hardware Configuration
//!
//! - **MCU**: ESP32-C3 SuperMini (RISC-V 160MHz, 4MB Flash, dual OTA slots)
//! - **Sensor**: any 0 to 3.3 V analog source on ADC1
//! - **Indicators**: onboard blue LED plus one external LED, both active-low
//!
//! # Pin Assignments
//!
//! See the [`pins`] module for GPIO assignments matching the SuperMini layout.

mod analog;
mod chip;
mod clock;
mod led;

pub use analog::{Esp32Analog, ADC_MAX};
pub use chip::{chip_id, Esp32Entropy};
pub use clock::Esp32Clock;
pub use led::Esp32Led;

#[cfg(feature = "wifi")]
mod wifi;
#[cfg(feature = "wifi")]
pub use wifi::Esp32Wifi;

#[cfg(feature = "esp32-http")]
mod http;
#[cfg(feature = "esp32-http")]
pub use http::Esp32HttpServer;

#[cfg(feature = "esp32-mqtt")]
mod mqtt;
#[cfg(feature = "esp32-mqtt")]
pub use mqtt::{Esp32Mqtt, Esp32MqttError};

/// Pin assignments for SuperMini ESP32-C3.
pub mod pins {
    /// Sensor input (ADC1 channel 0)
    pub const SENSOR_ADC: i32 = 0;

    /// Activity LED: lit during calibration and while publishing (active low)
    pub const ACTIVITY_LED: i32 = 2;

    /// Status LED: lit while WiFi is associated (onboard blue LED, active low)
    pub const STATUS_LED: i32 = 8;
}
