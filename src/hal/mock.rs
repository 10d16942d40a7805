//! Mock implementations for testing without hardware.
//!
//! This module provides test doubles for all hardware and network traits,
//! enabling development and testing on desktop without a board or broker.
//!
//! # Available Mocks
//!
//! | Mock | Trait | Purpose |
//! |------|-------|---------|
//! | [`MockAnalog`] | [`AnalogInput`] | Queued readings with a fallback value |
//! | [`MockPin`] | [`DigitalOutput`] | Tracks pin level history |
//! | [`MockClock`] | [`Clock`] | Controllable time source |
//! | [`MockNetwork`] | [`NetworkLink`] | Switchable association state |
//! | [`MockEntropy`] | [`Entropy`] | Scripted random values |
//! | [`MockMqtt`] | [`MqttClient`] | Scripted handshakes, captured publishes |
//! | [`MockDiagnostics`] | [`DiagnosticResponder`] | Counts service calls |
//!
//! # Example
//!
//! ```rust
//! use sensor_node::hal::{MockEntropy, MockMqtt};
//! use sensor_node::{ConnectionManager, ConnectOutcome};
//!
//! let mut mqtt = MockMqtt::new();
//! mqtt.queue_outcome(ConnectOutcome::TimedOut);
//!
//! let mut conn = ConnectionManager::new(mqtt, MockEntropy::from_values(&[0xab]), "node");
//! assert!(!conn.ensure_connected());
//! assert!(conn.ensure_connected());
//! assert_eq!(conn.client().connect_calls, ["node-ab", "node-ab"]);
//! ```

use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::Cell;

use crate::traits::{
    AnalogInput, Clock, ConnectOutcome, DiagnosticResponder, DigitalOutput, Entropy, MqttClient,
    NetworkLink,
};

// ============================================================================
// Hardware Mocks
// ============================================================================

/// Mock analog input.
///
/// Reads come from a FIFO queue; once it is empty every read returns the
/// fallback value (NaN unless set).
///
/// # Example
///
/// ```rust
/// use sensor_node::hal::MockAnalog;
/// use sensor_node::traits::AnalogInput;
///
/// let mut adc = MockAnalog::new();
/// adc.queue(100.0);
/// adc.set_fallback(5.0);
///
/// assert_eq!(adc.read().unwrap(), 100.0);
/// assert_eq!(adc.read().unwrap(), 5.0);
/// assert_eq!(adc.read_count, 2);
/// ```
#[derive(Debug)]
pub struct MockAnalog {
    queue: VecDeque<Result<f32, ()>>,
    fallback: f32,
    /// Number of times `read` was called.
    pub read_count: usize,
}

impl MockAnalog {
    /// Creates an input with nothing queued and a NaN fallback.
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            fallback: f32::NAN,
            read_count: 0,
        }
    }

    /// Queue a successful read.
    pub fn queue(&mut self, value: f32) {
        self.queue.push_back(Ok(value));
    }

    /// Queue a read that returns the not-a-number sentinel.
    pub fn queue_invalid(&mut self) {
        self.queue.push_back(Ok(f32::NAN));
    }

    /// Queue a read that fails outright.
    pub fn queue_error(&mut self) {
        self.queue.push_back(Err(()));
    }

    /// Value returned once the queue is drained.
    pub fn set_fallback(&mut self, value: f32) {
        self.fallback = value;
    }
}

impl Default for MockAnalog {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalogInput for MockAnalog {
    type Error = ();

    fn read(&mut self) -> Result<f32, ()> {
        self.read_count += 1;
        self.queue.pop_front().unwrap_or(Ok(self.fallback))
    }
}

/// Mock GPIO output.
///
/// `high` holds the current level; `history` records every write.
#[derive(Debug, Default)]
pub struct MockPin {
    /// Current pin level.
    pub high: bool,
    /// Every level written, oldest first.
    pub history: Vec<bool>,
}

impl MockPin {
    /// Creates a pin that starts low with no history.
    pub fn new() -> Self {
        Self::default()
    }
}

impl DigitalOutput for MockPin {
    type Error = ();

    fn set_high(&mut self) -> Result<(), ()> {
        self.high = true;
        self.history.push(true);
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), ()> {
        self.high = false;
        self.history.push(false);
        Ok(())
    }
}

/// Mock clock for testing.
///
/// Provides a controllable time source for testing time-dependent behavior.
/// With [`MockClock::with_auto_advance`] every `now_ms` call moves time
/// forward, which lets blocking loops such as calibration terminate.
///
/// # Example
///
/// ```rust
/// use sensor_node::hal::MockClock;
/// use sensor_node::traits::Clock;
///
/// let mut clock = MockClock::new();
/// assert_eq!(clock.now_ms(), 0);
///
/// clock.set(1000);
/// assert_eq!(clock.now_ms(), 1000);
///
/// clock.advance(500);
/// assert_eq!(clock.now_ms(), 1500);
///
/// let ticking = MockClock::new().with_auto_advance(10);
/// assert_eq!(ticking.now_ms(), 0);
/// assert_eq!(ticking.now_ms(), 10);
/// ```
#[derive(Debug)]
pub struct MockClock {
    current_ms: Cell<u64>,
    step_ms: u64,
}

impl MockClock {
    /// Creates a new mock clock starting at 0ms.
    pub fn new() -> Self {
        Self {
            current_ms: Cell::new(0),
            step_ms: 0,
        }
    }

    /// Advance by `step_ms` after every read.
    pub fn with_auto_advance(mut self, step_ms: u64) -> Self {
        self.step_ms = step_ms;
        self
    }

    /// Sets the current time in milliseconds.
    pub fn set(&mut self, ms: u64) {
        self.current_ms.set(ms);
    }

    /// Advances the clock by the given duration.
    pub fn advance(&mut self, ms: u64) {
        self.current_ms.set(self.current_ms.get() + ms);
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        let now = self.current_ms.get();
        self.current_ms.set(now + self.step_ms);
        now
    }
}

/// Mock network link with a settable association flag.
#[derive(Debug)]
pub struct MockNetwork {
    /// Whether the station is associated.
    pub associated: bool,
}

impl MockNetwork {
    /// An associated link.
    pub fn up() -> Self {
        Self { associated: true }
    }

    /// A link that has not associated.
    pub fn down() -> Self {
        Self { associated: false }
    }
}

impl NetworkLink for MockNetwork {
    fn is_associated(&self) -> bool {
        self.associated
    }
}

/// Scripted entropy source.
///
/// Cycles through the given values; [`MockEntropy::new`] counts up from 1.
#[derive(Debug)]
pub struct MockEntropy {
    values: Vec<u16>,
    next: usize,
}

impl MockEntropy {
    /// Counts 1, 2, 3, ...
    pub fn new() -> Self {
        Self {
            values: Vec::new(),
            next: 0,
        }
    }

    /// Returns `values` in order, wrapping around at the end.
    pub fn from_values(values: &[u16]) -> Self {
        Self {
            values: values.to_vec(),
            next: 0,
        }
    }
}

impl Default for MockEntropy {
    fn default() -> Self {
        Self::new()
    }
}

impl Entropy for MockEntropy {
    fn next_u16(&mut self) -> u16 {
        let i = self.next;
        self.next = self.next.wrapping_add(1);
        if self.values.is_empty() {
            (i as u16).wrapping_add(1)
        } else {
            self.values[i % self.values.len()]
        }
    }
}

// ============================================================================
// Network Mocks
// ============================================================================

/// Mock MQTT client for testing.
///
/// Handshakes consume queued outcomes in order and succeed once the queue
/// is empty. Every client id and publish is recorded.
#[derive(Debug, Default)]
pub struct MockMqtt {
    /// Messages that have been published (topic, payload, retain).
    pub published: Vec<(String, Vec<u8>, bool)>,
    /// Client ids passed to `connect`, oldest first.
    pub connect_calls: Vec<String>,
    /// Whether the client is connected.
    pub connected: bool,
    /// When true, `publish` fails without recording anything.
    pub fail_publish: bool,
    outcomes: VecDeque<ConnectOutcome>,
}

impl MockMqtt {
    /// Creates a disconnected client whose handshakes succeed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the result of the next unscripted handshake.
    pub fn queue_outcome(&mut self, outcome: ConnectOutcome) {
        self.outcomes.push_back(outcome);
    }

    /// Simulate the broker going away underneath an open session.
    pub fn drop_link(&mut self) {
        self.connected = false;
    }

    /// Get published messages for a topic
    pub fn published_to(&self, topic: &str) -> Vec<&(String, Vec<u8>, bool)> {
        self.published
            .iter()
            .filter(|(t, _, _)| t == topic)
            .collect()
    }
}

impl MqttClient for MockMqtt {
    type Error = ();

    fn connect(&mut self, client_id: &str) -> ConnectOutcome {
        self.connect_calls.push(client_id.into());
        let outcome = self.outcomes.pop_front().unwrap_or(ConnectOutcome::Connected);
        self.connected = outcome.is_connected();
        outcome
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), ()> {
        if self.fail_publish || !self.connected {
            return Err(());
        }
        self.published
            .push((topic.into(), payload.to_vec(), retain));
        Ok(())
    }
}

/// Mock diagnostic responder.
#[derive(Debug, Default)]
pub struct MockDiagnostics {
    /// Number of times `service` was called.
    pub service_count: usize,
    /// When true, `service` returns an error (after counting).
    pub fail: bool,
}

impl MockDiagnostics {
    /// Creates a responder that always succeeds.
    pub fn new() -> Self {
        Self::default()
    }
}

impl DiagnosticResponder for MockDiagnostics {
    type Error = ();

    fn service(&mut self) -> Result<(), ()> {
        self.service_count += 1;
        if self.fail {
            Err(())
        } else {
            Ok(())
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_analog_drains_queue_then_falls_back() {
        let mut adc = MockAnalog::new();
        adc.queue(1.0);
        adc.queue_error();
        adc.queue_invalid();

        assert_eq!(adc.read(), Ok(1.0));
        assert_eq!(adc.read(), Err(()));
        assert!(adc.read().unwrap().is_nan());
        assert!(adc.read().unwrap().is_nan());
        assert_eq!(adc.read_count, 4);
    }

    #[test]
    fn mock_pin_records_history() {
        let mut pin = MockPin::new();
        pin.set_high().unwrap();
        pin.set_low().unwrap();
        assert!(!pin.high);
        assert_eq!(pin.history, [true, false]);
    }

    #[test]
    fn mock_clock_set_and_advance() {
        let mut clock = MockClock::new();
        clock.set(1000);
        clock.advance(250);
        assert_eq!(clock.now_ms(), 1250);
        assert_eq!(clock.now_ms(), 1250);
    }

    #[test]
    fn mock_clock_auto_advance() {
        let clock = MockClock::new().with_auto_advance(5);
        assert_eq!(clock.now_ms(), 0);
        assert_eq!(clock.now_ms(), 5);
        assert_eq!(clock.now_ms(), 10);
    }

    #[test]
    fn mock_entropy_cycles() {
        let mut e = MockEntropy::from_values(&[7, 9]);
        assert_eq!([e.next_u16(), e.next_u16(), e.next_u16()], [7, 9, 7]);

        let mut counting = MockEntropy::new();
        assert_eq!([counting.next_u16(), counting.next_u16()], [1, 2]);
    }

    #[test]
    fn mock_mqtt_scripted_outcomes() {
        let mut mqtt = MockMqtt::new();
        mqtt.queue_outcome(ConnectOutcome::Failed("refused".into()));

        assert_eq!(mqtt.connect("a"), ConnectOutcome::Failed("refused".into()));
        assert!(!mqtt.is_connected());
        assert_eq!(mqtt.connect("b"), ConnectOutcome::Connected);
        assert!(mqtt.is_connected());
        assert_eq!(mqtt.connect_calls, ["a", "b"]);
    }

    #[test]
    fn mock_mqtt_publish_requires_connection() {
        let mut mqtt = MockMqtt::new();
        assert!(mqtt.publish("t", b"x", false).is_err());

        mqtt.connect("id");
        mqtt.publish("t", b"x", false).unwrap();
        mqtt.fail_publish = true;
        assert!(mqtt.publish("t", b"y", false).is_err());
        assert_eq!(mqtt.published_to("t").len(), 1);
    }

    #[test]
    fn mock_diagnostics_counts_and_fails() {
        let mut diag = MockDiagnostics::new();
        diag.service().unwrap();
        diag.fail = true;
        assert!(diag.service().is_err());
        assert_eq!(diag.service_count, 2);
    }
}
