//! Shared configuration system for desktop and ESP32.
//!
//! Uses `heapless::String` for `no_std` compatibility while remaining
//! ergonomic to use on desktop with `std`. Every value is fixed when the
//! firmware is built; nothing here is reconfigurable at runtime.
//!
//! # Example
//!
//! ```rust
//! use sensor_node::config::{Config, MqttConfig, SensorConfig};
//!
//! // Use defaults
//! let config = Config::default();
//! assert_eq!(config.sensor.sample_interval_ms, 15_000);
//!
//! // Or customize
//! let config = Config::default()
//!     .with_mqtt(MqttConfig::default().with_host("192.168.1.100"))
//!     .with_sensor(SensorConfig::default().with_adc_max(4095));
//! ```

use heapless::String as HString;

/// Maximum length for short config strings (hostnames, client IDs)
pub const MAX_SHORT_STRING: usize = 64;

/// Maximum length for longer config strings (topic prefixes, paths)
pub const MAX_LONG_STRING: usize = 128;

/// Type alias for short config strings
pub type ShortString = HString<MAX_SHORT_STRING>;

/// Type alias for longer config strings
pub type LongString = HString<MAX_LONG_STRING>;

// ============================================================================
// Helper for creating heapless strings
// ============================================================================

/// Copy as much of `s` as fits into `out`, stopping on a char boundary.
fn push_truncated<const N: usize>(out: &mut HString<N>, s: &str) {
    let valid_end = s
        .char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .take_while(|end| *end <= N)
        .last()
        .unwrap_or(0);
    let _ = out.push_str(&s[..valid_end]);
}

/// Create a ShortString from a &str, truncating if too long
pub fn short_string(s: &str) -> ShortString {
    let mut hs = ShortString::new();
    push_truncated(&mut hs, s);
    hs
}

/// Create a LongString from a &str, truncating if too long
pub fn long_string(s: &str) -> LongString {
    let mut hs = LongString::new();
    push_truncated(&mut hs, s);
    hs
}

// ============================================================================
// Main Config
// ============================================================================

/// Complete application configuration
#[derive(Clone, Debug, Default)]
pub struct Config {
    /// WiFi connection configuration
    pub wifi: WifiConfig,
    /// MQTT client configuration
    pub mqtt: MqttConfig,
    /// Diagnostic web server configuration
    pub web: WebConfig,
    /// Sampling and calibration configuration
    pub sensor: SensorConfig,
    /// Device identification
    pub device: DeviceConfig,
}

impl Config {
    /// Set WiFi configuration
    pub fn with_wifi(mut self, wifi: WifiConfig) -> Self {
        self.wifi = wifi;
        self
    }

    /// Set MQTT configuration
    pub fn with_mqtt(mut self, mqtt: MqttConfig) -> Self {
        self.mqtt = mqtt;
        self
    }

    /// Set web configuration
    pub fn with_web(mut self, web: WebConfig) -> Self {
        self.web = web;
        self
    }

    /// Set sensor configuration
    pub fn with_sensor(mut self, sensor: SensorConfig) -> Self {
        self.sensor = sensor;
        self
    }

    /// Set device configuration
    pub fn with_device(mut self, device: DeviceConfig) -> Self {
        self.device = device;
        self
    }
}

// ============================================================================
// MQTT Config
// ============================================================================

/// MQTT client configuration
#[derive(Clone, Debug)]
pub struct MqttConfig {
    /// Broker hostname or IP
    pub host: ShortString,
    /// Broker port
    pub port: u16,
    /// Base topic; readings go to `<base_topic>/<device id>`
    pub base_topic: LongString,
    /// Prefix for the randomized per-connection client id
    pub client_id_prefix: ShortString,
    /// Keep-alive interval in seconds
    pub keep_alive_secs: u16,
    /// Upper bound on a single connection handshake in milliseconds
    pub connect_timeout_ms: u32,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: short_string("iot.eclipse.org"),
            port: 1883,
            base_topic: long_string("Wxec0cXgwgC9KwBK/sensors"),
            client_id_prefix: short_string("sensor-node"),
            keep_alive_secs: 15,
            connect_timeout_ms: 5_000,
        }
    }
}

impl MqttConfig {
    /// Set the broker host
    pub fn with_host(mut self, host: &str) -> Self {
        self.host = short_string(host);
        self
    }

    /// Set the broker port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the base topic
    pub fn with_base_topic(mut self, topic: &str) -> Self {
        self.base_topic = long_string(topic);
        self
    }

    /// Set the client id prefix
    pub fn with_client_id_prefix(mut self, prefix: &str) -> Self {
        self.client_id_prefix = short_string(prefix);
        self
    }

    /// Set the handshake timeout
    pub fn with_connect_timeout_ms(mut self, ms: u32) -> Self {
        self.connect_timeout_ms = ms;
        self
    }

    /// Broker URL in the form `mqtt://host:port`
    pub fn broker_url(&self) -> LongString {
        use core::fmt::Write;

        let mut url = LongString::new();
        let _ = write!(url, "mqtt://{}:{}", self.host, self.port);
        url
    }
}

// ============================================================================
// Web Config
// ============================================================================

/// Diagnostic web server configuration
#[derive(Clone, Debug)]
pub struct WebConfig {
    /// Port to listen on
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self { port: 80 }
    }
}

impl WebConfig {
    /// Set the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

// ============================================================================
// Sensor Config
// ============================================================================

/// Sampling cadence and calibration window
#[derive(Clone, Debug)]
pub struct SensorConfig {
    /// Minimum time between two samples in milliseconds
    pub sample_interval_ms: u64,
    /// Length of the boot-time calibration window in milliseconds
    pub calibration_window_ms: u64,
    /// Full-scale ADC reading, used as the initial calibration low bound
    pub adc_max: i32,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: 15_000,
            calibration_window_ms: 5_000,
            adc_max: 1023,
        }
    }
}

impl SensorConfig {
    /// Set the sampling interval
    pub fn with_sample_interval_ms(mut self, ms: u64) -> Self {
        self.sample_interval_ms = ms;
        self
    }

    /// Set the calibration window
    pub fn with_calibration_window_ms(mut self, ms: u64) -> Self {
        self.calibration_window_ms = ms;
        self
    }

    /// Set the ADC full-scale value
    pub fn with_adc_max(mut self, max: i32) -> Self {
        self.adc_max = max;
        self
    }
}

// ============================================================================
// WiFi Config
// ============================================================================

/// WiFi connection configuration
#[derive(Clone, Debug)]
pub struct WifiConfig {
    /// WiFi network SSID
    pub ssid: ShortString,
    /// WiFi password
    pub password: ShortString,
}

impl Default for WifiConfig {
    fn default() -> Self {
        Self {
            ssid: ShortString::new(),
            password: ShortString::new(),
        }
    }
}

impl WifiConfig {
    /// Set the SSID
    pub fn with_ssid(mut self, ssid: &str) -> Self {
        self.ssid = short_string(ssid);
        self
    }

    /// Set the password
    pub fn with_password(mut self, password: &str) -> Self {
        self.password = short_string(password);
        self
    }
}

// ============================================================================
// Device Config
// ============================================================================

/// Device identification configuration
#[derive(Clone, Debug)]
pub struct DeviceConfig {
    /// Application identifier, served on `/id` and used as the network hostname
    pub app_id: ShortString,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            app_id: short_string("336141"),
        }
    }
}

impl DeviceConfig {
    /// Set the application identifier
    pub fn with_app_id(mut self, id: &str) -> Self {
        self.app_id = short_string(id);
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.web.port, 80);
        assert_eq!(config.sensor.sample_interval_ms, 15_000);
        assert_eq!(config.sensor.calibration_window_ms, 5_000);
        assert_eq!(config.sensor.adc_max, 1023);
        assert_eq!(config.device.app_id.as_str(), "336141");
    }

    #[test]
    fn mqtt_config_default() {
        let mqtt = MqttConfig::default();
        assert_eq!(mqtt.host.as_str(), "iot.eclipse.org");
        assert_eq!(mqtt.base_topic.as_str(), "Wxec0cXgwgC9KwBK/sensors");
        assert_eq!(mqtt.client_id_prefix.as_str(), "sensor-node");
        assert_eq!(mqtt.connect_timeout_ms, 5_000);
    }

    #[test]
    fn mqtt_broker_url() {
        let mqtt = MqttConfig::default()
            .with_host("broker.local")
            .with_port(8883);
        assert_eq!(mqtt.broker_url().as_str(), "mqtt://broker.local:8883");
    }

    #[test]
    fn builder_pattern() {
        let config = Config::default()
            .with_mqtt(
                MqttConfig::default()
                    .with_base_topic("plant/sensors")
                    .with_client_id_prefix("greenhouse")
                    .with_connect_timeout_ms(2_000),
            )
            .with_web(WebConfig::default().with_port(8080))
            .with_sensor(
                SensorConfig::default()
                    .with_sample_interval_ms(1_000)
                    .with_calibration_window_ms(250)
                    .with_adc_max(4095),
            )
            .with_device(DeviceConfig::default().with_app_id("abc123"));

        assert_eq!(config.mqtt.base_topic.as_str(), "plant/sensors");
        assert_eq!(config.mqtt.client_id_prefix.as_str(), "greenhouse");
        assert_eq!(config.mqtt.connect_timeout_ms, 2_000);
        assert_eq!(config.web.port, 8080);
        assert_eq!(config.sensor.sample_interval_ms, 1_000);
        assert_eq!(config.sensor.calibration_window_ms, 250);
        assert_eq!(config.sensor.adc_max, 4095);
        assert_eq!(config.device.app_id.as_str(), "abc123");
    }

    #[test]
    fn wifi_config_builder() {
        let wifi = WifiConfig::default()
            .with_ssid("TestNetwork")
            .with_password("secret123");

        assert_eq!(wifi.ssid.as_str(), "TestNetwork");
        assert_eq!(wifi.password.as_str(), "secret123");
    }

    #[test]
    fn short_string_truncation() {
        let long_input = "a".repeat(100);
        let s = short_string(&long_input);
        assert_eq!(s.len(), MAX_SHORT_STRING);
    }

    #[test]
    fn long_string_truncation() {
        let long_input = "b".repeat(200);
        let s = long_string(&long_input);
        assert_eq!(s.len(), MAX_LONG_STRING);
    }

    #[test]
    fn string_helpers_utf8_boundary() {
        // 3-byte chars: 21 fit in 64 bytes, the 22nd would straddle the end
        let input = "€".repeat(30);
        let s = short_string(&input);
        assert_eq!(s.len(), 63);
        assert!(core::str::from_utf8(s.as_bytes()).is_ok());
    }
}
