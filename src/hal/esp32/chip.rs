//! Chip identity and hardware entropy.

use esp_idf_sys::{esp, EspError};

use crate::traits::Entropy;

/// 24-bit chip id: the low three bytes of the factory base MAC.
///
/// # Errors
///
/// Returns an error if the eFuse MAC cannot be read.
pub fn chip_id() -> Result<u32, EspError> {
    let mut mac = [0u8; 6];
    // Safe: the buffer is the six bytes the call writes
    esp!(unsafe { esp_idf_sys::esp_efuse_mac_get_default(mac.as_mut_ptr()) })?;
    Ok(u32::from_be_bytes([0, mac[3], mac[4], mac[5]]))
}

/// Entropy from the hardware RNG.
///
/// Only truly random while the radio is on, which it is whenever a broker
/// client id is needed.
#[derive(Debug, Default)]
pub struct Esp32Entropy;

impl Entropy for Esp32Entropy {
    fn next_u16(&mut self) -> u16 {
        // Safe: esp_random has no preconditions
        (unsafe { esp_idf_sys::esp_random() } & 0xffff) as u16
    }
}
