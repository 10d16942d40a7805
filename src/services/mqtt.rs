//! Broker client for desktop builds, on `rumqttc`.
//!
//! Mirrors the ESP32 client: each [`MqttClient::connect`] builds a new
//! `rumqttc` client with the requested id, a background thread drives its
//! event loop, and the caller waits up to the connect timeout for CONNACK.
//! The thread keeps keep-alive pings flowing between publishes and clears
//! the link flag when the session ends.
//!
//! # Example
//!
//! ```ignore
//! use sensor_node::config::MqttConfig;
//! use sensor_node::services::RumqttClient;
//! use sensor_node::traits::{ConnectOutcome, MqttClient};
//!
//! let mut mqtt = RumqttClient::from_config(&MqttConfig::default().with_host("localhost"));
//! if mqtt.connect("sensor-node-1f2e") == ConnectOutcome::Connected {
//!     mqtt.publish("sensors/a1b2", b"{}", false)?;
//! }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, warn};
use rumqttc::{Client, ClientError, Connection, ConnectReturnCode, Event, MqttOptions, Packet, QoS};

use crate::config::MqttConfig;
use crate::traits::{ConnectOutcome, MqttClient};

// ============================================================================
// Configuration
// ============================================================================

/// Runtime broker configuration for `rumqttc`.
///
/// Uses `String` for runtime compatibility with `rumqttc`. Convert from the
/// shared [`MqttConfig`] with [`MqttRuntimeConfig::from_config`].
#[derive(Debug, Clone)]
pub struct MqttRuntimeConfig {
    /// Broker hostname
    pub host: String,
    /// Broker port
    pub port: u16,
    /// Keep-alive interval in seconds
    pub keep_alive_secs: u16,
    /// How long to wait for CONNACK
    pub connect_timeout_ms: u64,
}

impl Default for MqttRuntimeConfig {
    fn default() -> Self {
        Self::from_config(&MqttConfig::default())
    }
}

impl MqttRuntimeConfig {
    /// Create a new config with the given broker address
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Create from shared MqttConfig
    pub fn from_config(config: &MqttConfig) -> Self {
        Self {
            host: config.host.as_str().to_string(),
            port: config.port,
            keep_alive_secs: config.keep_alive_secs,
            connect_timeout_ms: u64::from(config.connect_timeout_ms),
        }
    }

    /// Set the CONNACK timeout
    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.connect_timeout_ms = ms;
        self
    }

    fn options(&self, client_id: &str) -> MqttOptions {
        let mut options = MqttOptions::new(client_id, &self.host, self.port);
        options.set_keep_alive(Duration::from_secs(u64::from(self.keep_alive_secs.max(5))));
        options.set_clean_session(true);
        options
    }
}

// ============================================================================
// Client
// ============================================================================

/// MQTT-related errors
#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    /// No session has been established.
    #[error("MQTT client not connected")]
    NotConnected,
    /// The request could not be handed to the event loop.
    #[error("MQTT publish error: {0}")]
    Publish(#[from] ClientError),
}

struct Session {
    client: Client,
    link_up: Arc<AtomicBool>,
}

/// Desktop broker client.
pub struct RumqttClient {
    config: MqttRuntimeConfig,
    session: Option<Session>,
}

impl RumqttClient {
    /// Prepare a client. No I/O happens until `connect`.
    pub fn new(config: MqttRuntimeConfig) -> Self {
        Self {
            config,
            session: None,
        }
    }

    /// Create from shared MqttConfig
    pub fn from_config(config: &MqttConfig) -> Self {
        Self::new(MqttRuntimeConfig::from_config(config))
    }

    /// The runtime configuration.
    pub fn config(&self) -> &MqttRuntimeConfig {
        &self.config
    }
}

impl MqttClient for RumqttClient {
    type Error = MqttError;

    fn connect(&mut self, client_id: &str) -> ConnectOutcome {
        // dropping the old client ends its event thread
        self.session = None;

        let (client, connection) = Client::new(self.config.options(client_id), 10);
        let link_up = Arc::new(AtomicBool::new(false));
        let (connack_tx, connack_rx) = mpsc::channel();

        let link = Arc::clone(&link_up);
        let spawned = thread::Builder::new()
            .name("mqtt-events".into())
            .spawn(move || pump_events(connection, &link, connack_tx));
        if let Err(e) = spawned {
            return ConnectOutcome::Failed(e.to_string());
        }

        match connack_rx.recv_timeout(Duration::from_millis(self.config.connect_timeout_ms)) {
            Ok(Ok(())) => {
                self.session = Some(Session { client, link_up });
                ConnectOutcome::Connected
            }
            Ok(Err(reason)) => ConnectOutcome::Failed(reason),
            Err(RecvTimeoutError::Timeout) => ConnectOutcome::TimedOut,
            Err(RecvTimeoutError::Disconnected) => {
                ConnectOutcome::Failed("event loop closed before CONNACK".into())
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.link_up.load(Ordering::Acquire))
    }

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), MqttError> {
        let session = self.session.as_mut().ok_or(MqttError::NotConnected)?;
        session
            .client
            .try_publish(topic, QoS::AtMostOnce, retain, payload.to_vec())?;
        Ok(())
    }
}

fn pump_events(mut connection: Connection, link_up: &AtomicBool, connack: Sender<Result<(), String>>) {
    for notification in connection.iter() {
        match notification {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                if ack.code == ConnectReturnCode::Success {
                    link_up.store(true, Ordering::Release);
                    let _ = connack.send(Ok(()));
                } else {
                    let _ = connack.send(Err(format!("rc={:?}", ack.code)));
                    break;
                }
            }
            Ok(Event::Incoming(Packet::Disconnect)) => break,
            Ok(event) => debug!("MQTT event: {:?}", event),
            Err(e) => {
                if link_up.load(Ordering::Acquire) {
                    warn!("MQTT session ended: {}", e);
                }
                let _ = connack.send(Err(e.to_string()));
                break;
            }
        }
    }
    link_up.store(false, Ordering::Release);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mqtt_config_from_config() {
        let shared = MqttConfig::default().with_host("broker.local").with_port(1884);
        let config = MqttRuntimeConfig::from_config(&shared);
        assert_eq!(config.host, "broker.local");
        assert_eq!(config.port, 1884);
        assert_eq!(config.keep_alive_secs, 15);
        assert_eq!(config.connect_timeout_ms, 5000);
    }

    #[test]
    fn test_mqtt_config_new() {
        let config = MqttRuntimeConfig::new("mqtt.example.com", 8883).connect_timeout_ms(250);
        assert_eq!(config.host, "mqtt.example.com");
        assert_eq!(config.port, 8883);
        assert_eq!(config.connect_timeout_ms, 250);
    }

    #[test]
    fn test_publish_before_connect_fails() {
        let mut client = RumqttClient::new(MqttRuntimeConfig::default());
        assert!(!client.is_connected());
        assert!(matches!(
            client.publish("t", b"x", false),
            Err(MqttError::NotConnected)
        ));
    }

    #[test]
    fn test_connect_to_closed_port_fails_fast() {
        // nothing listens on port 1 on a test host
        let mut client =
            RumqttClient::new(MqttRuntimeConfig::new("127.0.0.1", 1).connect_timeout_ms(2_000));
        let outcome = client.connect("sensor-node-test");
        assert!(!outcome.is_connected());
        assert!(!client.is_connected());
    }

    #[test]
    fn test_mqtt_error_display() {
        assert_eq!(MqttError::NotConnected.to_string(), "MQTT client not connected");
    }
}
