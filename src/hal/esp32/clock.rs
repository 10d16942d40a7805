//! ESP32 clock implementation using the ESP-IDF timer.

use crate::traits::Clock;

/// Milliseconds since boot, from `esp_timer_get_time()`.
///
/// The high-resolution timer starts at zero on reset, so the calibration
/// window measured against this clock begins at boot.
///
/// # Example
///
/// ```ignore
/// use sensor_node::hal::esp32::Esp32Clock;
/// use sensor_node::traits::Clock;
///
/// let clock = Esp32Clock::new();
/// let start = clock.now_ms();
/// // ... sample ...
/// let elapsed = clock.now_ms() - start;
/// ```
pub struct Esp32Clock;

impl Esp32Clock {
    /// Creates a new ESP32 clock instance.
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Default for Esp32Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for Esp32Clock {
    #[inline]
    fn now_ms(&self) -> u64 {
        // Safe: plain read of the monotonic timer, no side effects
        let micros = unsafe { esp_idf_hal::sys::esp_timer_get_time() };
        (micros / 1000) as u64
    }
}
