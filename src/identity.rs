//! Device identity and per-device topic.
//!
//! Both are derived once at boot and never change afterwards.

use core::fmt::{self, Write};

use heapless::String as HString;

use crate::config::{long_string, ShortString, MAX_LONG_STRING};

/// Longest identity: a `u32` in hex.
pub const MAX_IDENTITY_LEN: usize = 8;

/// Room for the longest base topic, the separator and the longest identity.
pub const TOPIC_CAPACITY: usize = MAX_LONG_STRING + 1 + MAX_IDENTITY_LEN;

/// Hardware-derived identity of this node.
///
/// Rendered as lowercase hex without padding, so chip id `0x00a1b2`
/// becomes `"a1b2"`. Seeds the MQTT client id and is embedded in every
/// payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceIdentity(ShortString);

impl DeviceIdentity {
    /// Derive the identity from the hardware chip id.
    pub fn from_chip_id(chip_id: u32) -> Self {
        let mut id = ShortString::new();
        // at most MAX_IDENTITY_LEN chars
        let _ = write!(id, "{:x}", chip_id);
        Self(id)
    }

    /// Returns the identity as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Destination topic for this node's readings: `<base>/<device id>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Topic(HString<TOPIC_CAPACITY>);

impl Topic {
    /// Build the per-device topic under `base`.
    ///
    /// A trailing `/` on `base` is not doubled. `base` is cut to
    /// [`MAX_LONG_STRING`] bytes, the same bound as a configured base topic,
    /// so the device id suffix is always present.
    pub fn for_device(base: &str, identity: &DeviceIdentity) -> Self {
        let base = long_string(base);
        let base = base.strip_suffix('/').unwrap_or(&base);
        let mut topic = HString::new();
        // cannot overflow: TOPIC_CAPACITY covers all three parts
        let _ = topic.push_str(base);
        let _ = topic.push('/');
        let _ = topic.push_str(identity.as_str());
        Self(topic)
    }

    /// Returns the topic as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
