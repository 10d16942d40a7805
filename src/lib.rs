//! # sensor-node
//!
//! Firmware core for a single analog sensor node. The node calibrates the
//! sensor range at boot, samples on a fixed cadence, and publishes each new
//! reading as JSON to a per-device MQTT topic while answering diagnostic
//! requests.
//!
//! ## Features
//!
//! - **Hardware abstraction**: Traits for analog input, indicator LEDs, clock and network link
//! - **Change-triggered publishing**: A reading is published once, right after it is sampled
//! - **Lazy reconnects**: The broker connection is only repaired when there is something to send
//! - **Drop, don't queue**: Readings that cannot be sent are discarded
//!
//! ## Architecture
//!
//! The crate is structured to allow testing on desktop without hardware:
//!
//! - `traits` - Hardware and network abstractions
//! - `sampler` / `calibration` - Sensor access on a fixed cadence and boot-time range tracking
//! - `payload` - Fixed-schema JSON encoding
//! - `connection` - Broker connection state machine
//! - `control` - The single-threaded loop that ties everything together
//! - `hal` - Concrete implementations (mock for testing, esp32 for hardware)
//!
//! ## Example
//!
//! ```rust
//! use sensor_node::{
//!     ConnectionManager, ControlLoop, DeviceIdentity, Indicator, RuntimeContext, SensorSampler,
//!     hal::{MockAnalog, MockClock, MockDiagnostics, MockEntropy, MockMqtt, MockNetwork, MockPin},
//! };
//!
//! let identity = DeviceIdentity::from_chip_id(0xa1b2);
//! let ctx = RuntimeContext::new(identity, "sensors");
//! let mut analog = MockAnalog::new();
//! analog.queue(512.0);
//!
//! let mut node = ControlLoop::new(
//!     ctx,
//!     MockClock::new(),
//!     SensorSampler::new(analog, 15_000),
//!     (Indicator::active_low(MockPin::new()), Indicator::active_low(MockPin::new())),
//!     MockNetwork::up(),
//!     ConnectionManager::new(MockMqtt::new(), MockEntropy::new(), "sensor-node"),
//!     MockDiagnostics::new(),
//! );
//!
//! node.clock_mut().advance(15_000);
//! node.tick(); // samples 512
//! node.tick(); // publishes it
//! assert_eq!(node.context().stats.published, 1);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

extern crate alloc;

/// Boot-time calibration window and the range it records.
pub mod calibration;
/// Broker connection state machine.
pub mod connection;
/// The control loop and its runtime context.
pub mod control;
/// Diagnostic request handling shared by every HTTP front end.
pub mod diagnostics;
/// Hardware abstraction layer with mock implementations for testing.
pub mod hal;
/// Device identity and per-device topic.
pub mod identity;
/// Fixed-schema JSON payload encoding.
pub mod payload;
/// Interval-gated sensor sampling.
pub mod sampler;
/// Core traits for hardware and network abstraction.
pub mod traits;

/// Shared configuration system for desktop and ESP32.
pub mod config;

/// Desktop network services (feature-gated).
#[cfg(any(feature = "web", feature = "mqtt"))]
pub mod services;

// Re-exports for convenience
pub use calibration::{
    run_calibration, CalibrationRange, CalibrationState, Calibrator, BOOT_MS,
};
pub use connection::{ConnectionManager, ConnectionState};
pub use control::{
    calibrate_with_indicator, ControlLoop, LoopStats, PublishOutcome, RuntimeContext,
    SampleStatus, TickReport,
};
pub use diagnostics::{respond, DiagnosticsError, APP_ID_PATH, FIRMWARE_UPDATE_PATH};
pub use identity::{DeviceIdentity, Topic};
pub use payload::{encode, EncodeError, Payload, PAYLOAD_CAPACITY};
pub use sampler::{Reading, SampleOutcome, SensorSampler};
pub use traits::{
    // Hardware
    AnalogInput,
    Clock,
    // Network
    ConnectOutcome,
    DiagnosticResponder,
    DigitalOutput,
    Entropy,
    HttpMethod,
    HttpRequest,
    HttpResponse,
    Indicator,
    MqttClient,
    NetworkLink,
};

// Config re-exports
pub use config::{Config, DeviceConfig, MqttConfig, SensorConfig, WebConfig, WifiConfig};
