//! Desktop network services.
//!
//! This module provides the host-side counterparts of the ESP32 adapters:
//! - `mqtt` feature: broker client on `rumqttc`
//! - `web` feature: Axum-based diagnostic endpoint
//! - `desktop` feature: simulated sensor, clock and network for the
//!   desktop binary
//!
//! Everything here implements the same traits as `hal::esp32`, so the
//! desktop binary drives the unmodified [`crate::ControlLoop`].

#[cfg(feature = "web")]
pub mod web;

#[cfg(feature = "mqtt")]
pub mod mqtt;

#[cfg(feature = "desktop")]
pub mod host;

// Re-exports
#[cfg(feature = "web")]
pub use web::*;

#[cfg(feature = "mqtt")]
pub use mqtt::*;

#[cfg(feature = "desktop")]
pub use host::*;
