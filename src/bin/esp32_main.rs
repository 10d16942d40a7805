//! ESP32-C3 analog sensor node.
//!
//! Main entry point for the hardware build. At boot it:
//! - Derives the device identity from the factory MAC
//! - Calibrates the sensor range with the activity LED lit
//! - Joins WiFi, advertising the application id as hostname
//! - Serves `/id` and `/update` over HTTP
//!
//! and then runs the control loop, which samples every 15 s and publishes
//! each new reading to `<base topic>/<device id>`.
//!
//! # Hardware Setup
//!
//! | Signal       | GPIO | Notes                 |
//! |--------------|------|-----------------------|
//! | Sensor       | 0    | ADC1, 11 dB           |
//! | Activity LED | 2    | active-low            |
//! | Status LED   | 8    | active-low, on-board  |
//!
//! # Build
//!
//! ```bash
//! WIFI_SSID=resin-hotspot WIFI_PASSWORD=resin-hotspot MQTT_HOST=iot.eclipse.org \
//!     cargo build --release --bin esp32_main --features esp32-net
//! espflash flash --monitor target/riscv32imc-esp-espidf/release/esp32_main
//! ```

use esp_idf_hal::adc::oneshot::AdcDriver;
use esp_idf_hal::gpio::OutputPin;
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::log::EspLogger;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{info, warn};
use sensor_node::hal::esp32::{
    chip_id, pins, Esp32Analog, Esp32Clock, Esp32Entropy, Esp32HttpServer, Esp32Led, Esp32Mqtt,
    Esp32Wifi, ADC_MAX,
};
use sensor_node::{
    calibrate_with_indicator, Config, ConnectionManager, ControlLoop, DeviceIdentity, Indicator,
    MqttConfig, RuntimeContext, SensorConfig, SensorSampler, WifiConfig,
};
use std::thread;
use std::time::Duration;

/// Pause between control loop ticks
const LOOP_INTERVAL_MS: u64 = 10;

fn main() -> anyhow::Result<()> {
    // Initialize ESP-IDF
    esp_idf_svc::sys::link_patches();
    EspLogger::initialize_default();

    info!("sensor-node v{}", env!("CARGO_PKG_VERSION"));

    // =========================================================================
    // Configuration (baked in at build time)
    // =========================================================================
    let mut mqtt = MqttConfig::default();
    if let Some(host) = option_env!("MQTT_HOST") {
        mqtt = mqtt.with_host(host);
    }
    let config = Config::default()
        .with_wifi(
            WifiConfig::default()
                .with_ssid(option_env!("WIFI_SSID").unwrap_or("resin-hotspot"))
                .with_password(option_env!("WIFI_PASSWORD").unwrap_or("resin-hotspot")),
        )
        .with_mqtt(mqtt)
        .with_sensor(SensorConfig::default().with_adc_max(ADC_MAX));

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    // =========================================================================
    // Identity
    // =========================================================================
    let identity = DeviceIdentity::from_chip_id(chip_id()?);
    let ctx = RuntimeContext::new(identity, config.mqtt.base_topic.as_str());
    info!("device id {}, publishing to {}", ctx.identity, ctx.topic);

    // =========================================================================
    // Sensor and indicators
    // =========================================================================
    let clock = Esp32Clock::new();
    let adc = AdcDriver::new(peripherals.adc1)?;
    let mut analog = Esp32Analog::new(&adc, peripherals.pins.gpio0)?;

    let status = Indicator::active_low(Esp32Led::new(peripherals.pins.gpio8.downgrade_output())?);
    let mut activity =
        Indicator::active_low(Esp32Led::new(peripherals.pins.gpio2.downgrade_output())?);
    info!(
        "sensor on GPIO{}, status LED GPIO{}, activity LED GPIO{}",
        pins::SENSOR_ADC,
        pins::STATUS_LED,
        pins::ACTIVITY_LED
    );

    // =========================================================================
    // Calibration (window counted from boot, before any network service)
    // =========================================================================
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

    // =========================================================================
    // Network stack
    // =========================================================================
    let app_id = config.device.app_id.as_str();
    let wifi = Esp32Wifi::new(peripherals.modem, sysloop, Some(nvs), &config.wifi, app_id)?;
    let http = Esp32HttpServer::new(&config.web, app_id)?;
    info!("HTTP diagnostics on port {}", config.web.port);

    let connection = ConnectionManager::new(
        Esp32Mqtt::new(&config.mqtt),
        Esp32Entropy,
        config.mqtt.client_id_prefix.as_str(),
    );

    let mut node = ControlLoop::new(
        ctx,
        clock,
        SensorSampler::new(analog, config.sensor.sample_interval_ms),
        (status, activity),
        wifi,
        connection,
        http,
    );
    node.record_calibration(range);

    if let Err(e) = node.network_mut().associate() {
        // the station keeps retrying; the status LED shows when it succeeds
        warn!("wifi association failed: {:?}", e);
    }

    info!("broker {}, starting control loop", config.mqtt.broker_url());

    // =========================================================================
    // Main Control Loop
    // =========================================================================
    loop {
        node.tick();
        thread::sleep(Duration::from_millis(LOOP_INTERVAL_MS));
    }
}
