//! Indicator LEDs on plain GPIO outputs.

use esp_idf_hal::gpio::{AnyOutputPin, Output, PinDriver};
use esp_idf_hal::sys::EspError;

use crate::traits::DigitalOutput;

/// A GPIO driving an indicator LED.
///
/// Both indicators share this type so the control loop needs one pin
/// parameter; wrap it in [`crate::traits::Indicator`] to fold in polarity.
pub struct Esp32Led<'d> {
    pin: PinDriver<'d, AnyOutputPin, Output>,
}

impl<'d> Esp32Led<'d> {
    /// Take ownership of `pin` as a push-pull output.
    ///
    /// # Errors
    ///
    /// Returns an error if the GPIO cannot be configured.
    pub fn new(pin: AnyOutputPin) -> Result<Self, EspError> {
        Ok(Self {
            pin: PinDriver::output(pin)?,
        })
    }
}

impl DigitalOutput for Esp32Led<'_> {
    type Error = EspError;

    fn set_high(&mut self) -> Result<(), EspError> {
        self.pin.set_high()
    }

    fn set_low(&mut self) -> Result<(), EspError> {
        self.pin.set_low()
    }
}
