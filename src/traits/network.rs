//! Network abstraction traits for the broker client and diagnostics.
//!
//! # Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`MqttClient`] | Broker handshake and best-effort publish |
//! | [`DiagnosticResponder`] | Per-tick servicing of the diagnostic/update endpoint |
//!
//! # HTTP API
//!
//! The diagnostic endpoint is deliberately tiny:
//!
//! ```text
//! GET  /id      - Application identifier (text/plain)
//! POST /update  - Firmware image upload (platform dependent)
//! ```

use alloc::string::String;
use alloc::vec::Vec;

// ============================================================================
// MQTT Client Trait (Sync-First Design)
// ============================================================================

/// Result of a single broker handshake attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// The broker accepted the connection.
    Connected,
    /// The broker or transport rejected the connection.
    Failed(String),
    /// No answer within the client's handshake timeout.
    TimedOut,
}

impl ConnectOutcome {
    /// Returns true for [`ConnectOutcome::Connected`].
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectOutcome::Connected)
    }
}

/// MQTT client trait for the publish side of the node.
///
/// This trait uses a **sync-first design** that works on both ESP32 (blocking
/// I/O) and desktop. `connect` performs one handshake and blocks for at most
/// the client's own timeout; it never retries.
///
/// # Implementation Notes
///
/// - `connect` replaces any previous session
/// - `is_connected` must be a local query, never network I/O
/// - `publish` is fire-and-forget (QoS 0)
///
/// # Example
///
/// ```rust,ignore
/// use sensor_node::traits::{ConnectOutcome, MqttClient};
///
/// fn send<M: MqttClient>(client: &mut M, payload: &str) {
///     if client.connect("sensor-node-1f2e") == ConnectOutcome::Connected {
///         client.publish("sensors/a1b2", payload.as_bytes(), false).unwrap();
///     }
/// }
/// ```
pub trait MqttClient {
    /// Error type for MQTT operations.
    type Error: core::fmt::Debug;

    /// Attempt one handshake using the given client id.
    fn connect(&mut self, client_id: &str) -> ConnectOutcome;

    /// Check if the current session is still up.
    fn is_connected(&self) -> bool;

    /// Publish a message to a topic.
    ///
    /// # Arguments
    /// - `topic`: MQTT topic path
    /// - `payload`: Message bytes
    /// - `retain`: If true, broker keeps message for new subscribers
    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), Self::Error>;
}

// ============================================================================
// Diagnostic Responder
// ============================================================================

/// The always-on diagnostic endpoint, serviced once per tick.
///
/// Callback-driven servers (esp-idf httpd, axum) answer requests on their
/// own; `service` is where the loop picks up whatever they leave for it,
/// such as a staged firmware image that needs a restart.
pub trait DiagnosticResponder {
    /// Error type for servicing failures.
    type Error: core::fmt::Debug;

    /// Handle any pending diagnostic or firmware-update work.
    fn service(&mut self) -> Result<(), Self::Error>;
}

// ============================================================================
// HTTP Types
// ============================================================================

/// HTTP request methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpMethod {
    /// HTTP GET request.
    Get,
    /// HTTP POST request.
    Post,
    /// Anything else.
    Other,
}

impl HttpMethod {
    /// Parse a method name (case-sensitive, as on the wire).
    pub fn from_name(name: &str) -> Self {
        match name {
            "GET" => HttpMethod::Get,
            "POST" => HttpMethod::Post,
            _ => HttpMethod::Other,
        }
    }
}

/// An HTTP request received by a diagnostic front end.
#[derive(Debug)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Request path (e.g., "/id").
    pub path: String,
}

impl HttpRequest {
    /// Creates a request for `path`.
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
        }
    }
}

/// An HTTP response to send to the client.
#[derive(Debug, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code (e.g., 200, 404, 500).
    pub status: u16,
    /// Content-Type header value.
    pub content_type: &'static str,
    /// Response body as bytes.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a 200 OK response with plain text content.
    pub fn ok_text(body: &str) -> Self {
        Self::text(200, body)
    }

    /// Creates a plain text response with the given status code.
    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "text/plain",
            body: body.as_bytes().to_vec(),
        }
    }

    /// Creates a 404 Not Found response.
    pub fn not_found() -> Self {
        Self::text(404, "not found")
    }

    /// Returns the body as a UTF-8 string, if valid.
    pub fn body_str(&self) -> Option<&str> {
        core::str::from_utf8(&self.body).ok()
    }
}
