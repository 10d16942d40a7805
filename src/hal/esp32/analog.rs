//! Sensor input on an ESP32 ADC1 channel.
//!
//! The sensor output is wired to GPIO0 (ADC1 channel 0 on the C3). Reads
//! use 11 dB attenuation for the full 0 to 3.3 V range and are reported as
//! raw 12-bit counts.

use esp_idf_hal::adc::attenuation::DB_11;
use esp_idf_hal::adc::oneshot::config::AdcChannelConfig;
use esp_idf_hal::adc::oneshot::{AdcChannelDriver, AdcDriver};
use esp_idf_hal::adc::ADC1;
use esp_idf_hal::gpio::Gpio0;
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_hal::sys::EspError;

use crate::traits::AnalogInput;

/// Full-scale raw value of the 12-bit ADC.
pub const ADC_MAX: i32 = 4095;

/// Analog sensor on GPIO0.
///
/// # Example
///
/// ```ignore
/// use esp_idf_hal::adc::oneshot::AdcDriver;
/// use sensor_node::hal::esp32::Esp32Analog;
/// use sensor_node::traits::AnalogInput;
///
/// let adc = AdcDriver::new(peripherals.adc1)?;
/// let mut sensor = Esp32Analog::new(&adc, peripherals.pins.gpio0)?;
/// let raw = sensor.read()?;
/// ```
pub struct Esp32Analog<'d> {
    channel: AdcChannelDriver<'d, Gpio0, &'d AdcDriver<'d, ADC1>>,
}

impl<'d> Esp32Analog<'d> {
    /// Configure GPIO0 as an ADC1 input.
    ///
    /// # Errors
    ///
    /// Returns an error if ADC channel initialization fails.
    pub fn new(
        adc: &'d AdcDriver<'d, ADC1>,
        pin: impl Peripheral<P = Gpio0> + 'd,
    ) -> Result<Self, EspError> {
        let config = AdcChannelConfig {
            attenuation: DB_11,
            ..Default::default()
        };
        let channel = AdcChannelDriver::new(adc, pin, &config)?;
        Ok(Self { channel })
    }
}

impl AnalogInput for Esp32Analog<'_> {
    type Error = EspError;

    fn read(&mut self) -> Result<f32, EspError> {
        let raw = self.channel.read()?;
        Ok(f32::from(raw))
    }
}
