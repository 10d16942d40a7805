//! Desktop sensor node.
//!
//! Runs the same control loop as the hardware build against a simulated
//! sensor, a real MQTT broker and an Axum diagnostic server. Useful for
//! checking broker-side consumers without flashing a board.
//!
//! # Usage
//!
//! ```sh
//! RUST_LOG=info MQTT_HOST=localhost cargo run --bin desktop_main --features desktop
//! curl http://localhost:8080/id
//! ```
//!
//! # Environment
//!
//! | Variable             | Default            |
//! |----------------------|--------------------|
//! | `MQTT_HOST`          | `iot.eclipse.org`  |
//! | `MQTT_PORT`          | `1883`             |
//! | `MQTT_BASE_TOPIC`    | `Wxec0cXgwgC9KwBK/sensors` |
//! | `WEB_PORT`           | `8080`             |
//! | `SAMPLE_INTERVAL_MS` | `15000`            |
//! | `CALIBRATION_MS`     | `5000`             |
//! | `CHIP_ID`            | random, hex        |
//! | `SENSOR_SEED`        | OS entropy         |

use std::str::FromStr;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use log::{info, warn};
use sensor_node::services::{
    HostNetwork, LogLed, RandEntropy, RumqttClient, SimulatedAnalog, SystemClock, WebDiagnostics,
};
use sensor_node::{
    calibrate_with_indicator, Config, ConnectionManager, ControlLoop, DeviceIdentity, Indicator,
    MqttConfig, RuntimeContext, SensorConfig, SensorSampler, WebConfig,
};

/// Pause between control loop ticks
const LOOP_INTERVAL_MS: u64 = 10;

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|value| value.parse().ok())
}

fn load_config() -> Config {
    let mut mqtt = MqttConfig::default();
    if let Ok(host) = std::env::var("MQTT_HOST") {
        mqtt = mqtt.with_host(&host);
    }
    if let Some(port) = env_parse("MQTT_PORT") {
        mqtt = mqtt.with_port(port);
    }
    if let Ok(topic) = std::env::var("MQTT_BASE_TOPIC") {
        mqtt = mqtt.with_base_topic(&topic);
    }

    let mut sensor = SensorConfig::default();
    if let Some(ms) = env_parse("SAMPLE_INTERVAL_MS") {
        sensor = sensor.with_sample_interval_ms(ms);
    }
    if let Some(ms) = env_parse("CALIBRATION_MS") {
        sensor = sensor.with_calibration_window_ms(ms);
    }

    Config::default()
        .with_mqtt(mqtt)
        .with_web(WebConfig::default().with_port(env_parse("WEB_PORT").unwrap_or(8080)))
        .with_sensor(sensor)
}

fn chip_id() -> anyhow::Result<u32> {
    match std::env::var("CHIP_ID") {
        Ok(hex) => u32::from_str_radix(hex.trim_start_matches("0x"), 16)
            .with_context(|| format!("CHIP_ID `{hex}` is not hex")),
        Err(_) => Ok(rand::random::<u32>() & 0x00ff_ffff),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = load_config();
    let identity = DeviceIdentity::from_chip_id(chip_id()?);
    let ctx = RuntimeContext::new(identity, config.mqtt.base_topic.as_str());
    info!("device id {}, publishing to {}", ctx.identity, ctx.topic);

    let clock = SystemClock::new();
    let mut analog = SimulatedAnalog::new(config.sensor.adc_max);
    if let Some(seed) = env_parse("SENSOR_SEED") {
        analog = analog.with_seed(seed);
    }
    let status = Indicator::active_low(LogLed::new("status"));
    let mut activity = Indicator::active_low(LogLed::new("activity"));

    let range = calibrate_with_indicator(
        &mut analog,
        &clock,
        &mut activity,
        config.sensor.calibration_window_ms,
        config.sensor.adc_max,
    );
    match range {
        Some(range) => info!(
            "calibration: low {} high {} ({} samples)",
            range.low(),
            range.high(),
            range.observations()
        ),
        None => warn!("calibration recorded no valid samples"),
    }

    let diagnostics = WebDiagnostics::start(&config.web, config.device.app_id.as_str())
        .context("failed to start diagnostic server")?;

    let connection = ConnectionManager::new(
        RumqttClient::from_config(&config.mqtt),
        RandEntropy,
        config.mqtt.client_id_prefix.as_str(),
    );

    let mut node = ControlLoop::new(
        ctx,
        clock,
        SensorSampler::new(analog, config.sensor.sample_interval_ms),
        (status, activity),
        HostNetwork,
        connection,
        diagnostics,
    );
    node.record_calibration(range);

    info!("broker {}, starting control loop", config.mqtt.broker_url());

    loop {
        node.tick();
        thread::sleep(Duration::from_millis(LOOP_INTERVAL_MS));
    }
}
