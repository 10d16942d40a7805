//! MQTT client for ESP32.
//!
//! Wraps the esp-idf MQTT client behind the blocking [`MqttClient`] trait.
//! Every `connect` builds a fresh client with the requested id, starts a
//! thread draining its event connection, and waits up to the configured
//! timeout for the broker's CONNACK.
//!
//! # Example
//!
//! ```ignore
//! use sensor_node::hal::esp32::Esp32Mqtt;
//! use sensor_node::config::MqttConfig;
//! use sensor_node::traits::{ConnectOutcome, MqttClient};
//!
//! let mut mqtt = Esp32Mqtt::new(&MqttConfig::default());
//! if mqtt.connect("sensor-node-1f2e") == ConnectOutcome::Connected {
//!     mqtt.publish("Wxec0cXgwgC9KwBK/sensors/a1b2", b"{}", false)?;
//! }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use esp_idf_svc::mqtt::client::{
    EspMqttClient, EspMqttConnection, EventPayload, MqttClientConfiguration, QoS,
};
use esp_idf_svc::sys::EspError;
use log::{debug, warn};

use crate::config::{LongString, MqttConfig};
use crate::traits::{ConnectOutcome, MqttClient};

/// Error type for ESP32 MQTT operations.
#[derive(Debug, thiserror::Error)]
pub enum Esp32MqttError {
    /// No session has been established.
    #[error("MQTT client not connected")]
    NotConnected,
    /// The client refused to enqueue the message.
    #[error("MQTT publish error: {0}")]
    Publish(#[from] EspError),
}

struct Session {
    client: EspMqttClient<'static>,
    link_up: Arc<AtomicBool>,
}

/// Broker client for the sensor node.
pub struct Esp32Mqtt {
    broker_url: LongString,
    keep_alive: Duration,
    connect_timeout: Duration,
    session: Option<Session>,
}

impl Esp32Mqtt {
    /// Prepare a client for the configured broker. No I/O happens here.
    pub fn new(config: &MqttConfig) -> Self {
        Self {
            broker_url: config.broker_url(),
            keep_alive: Duration::from_secs(u64::from(config.keep_alive_secs)),
            connect_timeout: Duration::from_millis(u64::from(config.connect_timeout_ms)),
            session: None,
        }
    }

    fn start_session(&self, client_id: &str) -> Result<(Session, Receiver<()>), String> {
        let conf = MqttClientConfiguration {
            client_id: Some(client_id),
            keep_alive_interval: Some(self.keep_alive),
            network_timeout: self.connect_timeout,
            ..Default::default()
        };

        let (client, mut connection) =
            EspMqttClient::new(self.broker_url.as_str(), &conf).map_err(|e| format!("{:?}", e))?;

        let link_up = Arc::new(AtomicBool::new(false));
        let (connack_tx, connack_rx) = channel();
        let link = Arc::clone(&link_up);
        thread::Builder::new()
            .name("mqtt-events".into())
            .stack_size(6 * 1024)
            .spawn(move || pump_events(&mut connection, &link, connack_tx))
            .map_err(|e| e.to_string())?;

        Ok((Session { client, link_up }, connack_rx))
    }
}

impl MqttClient for Esp32Mqtt {
    type Error = Esp32MqttError;

    fn connect(&mut self, client_id: &str) -> ConnectOutcome {
        // dropping the old client ends its event thread
        self.session = None;

        let (session, connack) = match self.start_session(client_id) {
            Ok(started) => started,
            Err(reason) => return ConnectOutcome::Failed(reason),
        };

        match connack.recv_timeout(self.connect_timeout) {
            Ok(()) => {
                self.session = Some(session);
                ConnectOutcome::Connected
            }
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

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), Self::Error> {
        let session = self.session.as_mut().ok_or(Esp32MqttError::NotConnected)?;
        session
            .client
            .publish(topic, QoS::AtMostOnce, retain, payload)?;
        Ok(())
    }
}

fn pump_events(connection: &mut EspMqttConnection, link_up: &AtomicBool, connack: Sender<()>) {
    // next() fails once the owning client has been dropped
    while let Ok(event) = connection.next() {
        match event.payload() {
            EventPayload::Connected(_) => {
                link_up.store(true, Ordering::Release);
                let _ = connack.send(());
            }
            EventPayload::Disconnected => {
                link_up.store(false, Ordering::Release);
            }
            EventPayload::Error(e) => warn!("MQTT event error: {:?}", e),
            other => debug!("MQTT event: {:?}", other),
        }
    }
    link_up.store(false, Ordering::Release);
}
