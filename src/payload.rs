//! Fixed-schema JSON payload encoding.
//!
//! Every published message has the same shape:
//!
//! ```text
//! {"type":"float","value":"512.0","device":{"id":"a1b2"},"apiVersion":"3.0.0"}
//! ```
//!
//! Serialization goes through `serde-json-core` into a bounded
//! `heapless::String`, so encoding never allocates and fails cleanly when
//! the inputs would not fit.

use serde::Serialize;

use crate::identity::DeviceIdentity;
use crate::sampler::Reading;

/// Upper bound on an encoded payload in bytes.
pub const PAYLOAD_CAPACITY: usize = 96;

/// Schema version embedded in every payload.
pub const API_VERSION: &str = "3.0.0";

/// An encoded payload.
pub type Payload = heapless::String<PAYLOAD_CAPACITY>;

/// Payload encoding errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// The encoded message would exceed [`PAYLOAD_CAPACITY`].
    #[error("payload exceeds {} bytes", PAYLOAD_CAPACITY)]
    BufferFull,
}

#[derive(Serialize)]
struct Message<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    value: &'a str,
    device: Device<'a>,
    #[serde(rename = "apiVersion")]
    api_version: &'static str,
}

#[derive(Serialize)]
struct Device<'a> {
    id: &'a str,
}

/// Encode a reading for `identity`.
///
/// Pure function; the only failure is exceeding the buffer bound.
pub fn encode(reading: &Reading, identity: &DeviceIdentity) -> Result<Payload, EncodeError> {
    let message = Message {
        kind: "float",
        value: reading.formatted(),
        device: Device {
            id: identity.as_str(),
        },
        api_version: API_VERSION,
    };
    serde_json_core::to_string::<_, PAYLOAD_CAPACITY>(&message).map_err(|_| EncodeError::BufferFull)
}
