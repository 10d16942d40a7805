//! Broker connection state machine.
//!
//! The manager only ever connects on demand: the control loop calls
//! [`ConnectionManager::ensure_connected`] when it has a reading to send,
//! and each call makes at most one handshake attempt. There is no retry or
//! backoff here; a failure is reported to the caller, which drops the
//! reading and tries again next time there is something to send.

use core::fmt::Write;

use log::{info, warn};

use crate::config::ShortString;
use crate::traits::{ConnectOutcome, Entropy, MqttClient};

/// Connection state as seen by the control loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// No broker session.
    #[default]
    Disconnected,
    /// A session was established and has not been reported lost.
    Connected,
}

/// Owns the broker client and decides when to (re)connect.
#[derive(Debug)]
pub struct ConnectionManager<M, R> {
    client: M,
    entropy: R,
    client_id_prefix: ShortString,
    state: ConnectionState,
    attempts: u32,
}

impl<M, R> ConnectionManager<M, R>
where
    M: MqttClient,
    R: Entropy,
{
    /// Create a disconnected manager.
    pub fn new(client: M, entropy: R, client_id_prefix: &str) -> Self {
        Self {
            client,
            entropy,
            client_id_prefix: crate::config::short_string(client_id_prefix),
            state: ConnectionState::Disconnected,
            attempts: 0,
        }
    }

    /// Make sure a broker session exists.
    ///
    /// Connected: returns true without touching the network (beyond the
    /// client's local link flag). Disconnected: performs exactly one
    /// handshake with a fresh randomized client id.
    pub fn ensure_connected(&mut self) -> bool {
        if self.state == ConnectionState::Connected {
            if self.client.is_connected() {
                return true;
            }
            warn!("broker session lost");
            self.state = ConnectionState::Disconnected;
        }

        let client_id = self.next_client_id();
        self.attempts = self.attempts.saturating_add(1);
        info!("attempting MQTT connection as {}", client_id);

        match self.client.connect(&client_id) {
            ConnectOutcome::Connected => {
                info!("connected to MQTT broker");
                self.state = ConnectionState::Connected;
                true
            }
            ConnectOutcome::Failed(reason) => {
                warn!("MQTT connection failed: {}", reason);
                false
            }
            ConnectOutcome::TimedOut => {
                warn!("MQTT connection timed out");
                false
            }
        }
    }

    /// Record that the session is gone (e.g. a publish failed).
    ///
    /// The next [`Self::ensure_connected`] will reconnect.
    pub fn mark_lost(&mut self) {
        self.state = ConnectionState::Disconnected;
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Total handshake attempts made so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Get a reference to the broker client.
    pub fn client(&self) -> &M {
        &self.client
    }

    /// Get a mutable reference to the broker client.
    pub fn client_mut(&mut self) -> &mut M {
        &mut self.client
    }

    /// `<prefix>-<random hex>`, fresh for every attempt.
    fn next_client_id(&mut self) -> ShortString {
        let mut id = ShortString::new();
        let suffix = self.entropy.next_u16();
        // suffix is dropped if the prefix already fills the buffer
        let _ = id.push_str(self.client_id_prefix.as_str());
        let _ = write!(id, "-{:x}", suffix);
        id
    }
}
