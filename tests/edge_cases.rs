//! Edge case and boundary condition tests for the sensor node

use sensor_node::hal::{
    MockAnalog, MockClock, MockDiagnostics, MockEntropy, MockMqtt, MockNetwork, MockPin,
};
use sensor_node::{
    encode, run_calibration, AnalogInput, ConnectionManager, ControlLoop, DeviceIdentity,
    EncodeError, Indicator, PublishOutcome, Reading, RuntimeContext, SensorSampler, Topic,
    PAYLOAD_CAPACITY,
};

type Node =
    ControlLoop<MockClock, MockAnalog, MockPin, MockNetwork, MockMqtt, MockEntropy, MockDiagnostics>;

fn node_with(analog: MockAnalog, clock: MockClock, network: MockNetwork) -> Node {
    ControlLoop::new(
        RuntimeContext::new(DeviceIdentity::from_chip_id(0xa1b2), "sensors"),
        clock,
        SensorSampler::new(analog, 15_000),
        (
            Indicator::active_low(MockPin::new()),
            Indicator::active_low(MockPin::new()),
        ),
        network,
        ConnectionManager::new(MockMqtt::new(), MockEntropy::new(), "sensor-node"),
        MockDiagnostics::new(),
    )
}

// ============================================================================
// Calibration
// ============================================================================

#[test]
fn calibration_with_constant_sensor_collapses_range() {
    let mut analog = MockAnalog::new();
    analog.set_fallback(300.0);
    let clock = MockClock::new().with_auto_advance(1);

    let range = run_calibration(&mut analog, &clock, 5_000, 1023).unwrap();

    assert_eq!(range.low(), 300);
    assert_eq!(range.high(), 300);
    assert!(range.observations() > 0);
}

#[test]
fn calibration_without_valid_samples_yields_no_range() {
    let mut analog = MockAnalog::new();
    let clock = MockClock::new().with_auto_advance(10);

    let range = run_calibration(&mut analog, &clock, 5_000, 1023);

    assert_eq!(range, None);
    assert!(analog.read_count > 0);
}

#[test]
fn calibrated_range_is_never_inverted() {
    // deterministic pseudo-random sequences, some entirely invalid
    let mut seed: u32 = 0xdead_beef;
    for len in 0..40 {
        let mut analog = MockAnalog::new();
        for _ in 0..len {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            if seed & 3 == 0 {
                analog.queue_invalid();
            } else {
                analog.queue((seed >> 22) as f32);
            }
        }
        let clock = MockClock::new().with_auto_advance(100);

        if let Some(range) = run_calibration(&mut analog, &clock, 5_000, 1023) {
            assert!(range.low() <= range.high());
        }
    }
}

#[test]
fn calibration_skips_read_errors() {
    let mut analog = MockAnalog::new();
    analog.queue_error();
    analog.queue(12.0);
    analog.queue_invalid();
    analog.queue(900.0);
    let clock = MockClock::new().with_auto_advance(100);

    let range = run_calibration(&mut analog, &clock, 1_000, 1023).unwrap();

    assert_eq!((range.low(), range.high()), (12, 900));
    assert_eq!(range.observations(), 2);
}

#[test]
fn zero_length_calibration_window_records_nothing() {
    let mut analog = MockAnalog::new();
    analog.set_fallback(1.0);
    let clock = MockClock::new();

    assert_eq!(run_calibration(&mut analog, &clock, 0, 1023), None);
    assert_eq!(analog.read_count, 0);
}

#[test]
fn calibration_window_counts_from_boot() {
    let mut analog = MockAnalog::new();
    analog.set_fallback(250.0);
    let mut clock = MockClock::new().with_auto_advance(100);
    // setup before calibration took 2 s
    clock.set(2_000);
    let mut node = node_with(analog, clock, MockNetwork::up());

    let range = node.calibrate(5_000, 1023);

    assert_eq!(range.map(|r| r.low()), Some(250));
    let ended = node.sampler().last_sample_ms();
    assert!(ended <= 5_100, "calibration ended at {} ms since boot", ended);
}

#[test]
fn calibration_lights_activity_and_delays_first_sample() {
    let mut analog = MockAnalog::new();
    analog.set_fallback(77.0);
    let mut node = node_with(analog, MockClock::new().with_auto_advance(1), MockNetwork::up());

    let range = node.calibrate(5_000, 1023);

    assert!(range.is_some());
    assert_eq!(node.context().calibration, range);
    assert!(!node.activity_indicator().is_on());
    // active-low: lit while calibrating, dark afterwards
    assert_eq!(node.activity_indicator().pin().history, [false, true]);

    let anchor = node.sampler().last_sample_ms();
    assert!(anchor >= 5_000);
    assert!(!node.sampler().is_due(anchor + 14_999));
    assert!(node.sampler().is_due(anchor + 15_000));
}

// ============================================================================
// Values and payloads
// ============================================================================

#[test]
fn non_finite_values_are_not_readings() {
    assert!(Reading::from_raw(f32::NAN).is_none());
    assert!(Reading::from_raw(f32::INFINITY).is_none());
    assert!(Reading::from_raw(f32::NEG_INFINITY).is_none());
}

#[test]
fn readings_use_one_decimal() {
    assert_eq!(Reading::from_raw(0.0).unwrap().formatted(), "0.0");
    assert_eq!(Reading::from_raw(-5.0).unwrap().formatted(), "-5.0");
    assert_eq!(Reading::from_raw(1023.0).unwrap().formatted(), "1023.0");
    assert_eq!(Reading::from_raw(4095.0).unwrap().formatted(), "4095.0");
}

#[test]
fn widest_identity_fits_payload() {
    let identity = DeviceIdentity::from_chip_id(0xff_ffff);
    let payload = encode(&Reading::from_raw(4095.0).unwrap(), &identity).unwrap();
    assert!(payload.len() <= PAYLOAD_CAPACITY);
    assert!(payload.contains(r#""id":"ffffff""#));
}

#[test]
fn oversized_value_is_rejected_by_encoder() {
    let reading = Reading::from_raw(f32::MAX).unwrap();
    assert_eq!(
        encode(&reading, &DeviceIdentity::from_chip_id(0xa1b2)),
        Err(EncodeError::BufferFull)
    );
}

#[test]
fn oversized_value_is_dropped_not_published() {
    let mut analog = MockAnalog::new();
    analog.queue(1.0e30);
    let mut node = node_with(analog, MockClock::new(), MockNetwork::up());

    node.clock_mut().set(15_000);
    node.tick();
    assert_eq!(node.tick().publish, Some(PublishOutcome::DroppedEncode));

    assert!(node.connection().client().published.is_empty());
    assert_eq!(node.context().stats.dropped_failed, 1);
    assert!(!node.context().has_pending());
}

#[test]
fn identity_and_topic_formatting() {
    assert_eq!(DeviceIdentity::from_chip_id(0).as_str(), "0");
    assert_eq!(DeviceIdentity::from_chip_id(0x00_0a1b).as_str(), "a1b");
    let id = DeviceIdentity::from_chip_id(0xa1b2);
    assert_eq!(Topic::for_device("base/", &id).as_str(), "base/a1b2");
    assert_eq!(Topic::for_device("base", &id).as_str(), "base/a1b2");
}

#[test]
fn oversized_base_topic_still_addresses_device() {
    let id = DeviceIdentity::from_chip_id(0xa1b2);
    let base = "sensors/".repeat(25);
    let ctx = RuntimeContext::new(id, &base);
    assert!(ctx.topic.as_str().ends_with("/a1b2"));
    assert!(ctx.topic.as_str().starts_with("sensors/sensors/"));
    assert!(!ctx.topic.as_str().contains("//"));
}

// ============================================================================
// Network association
// ============================================================================

#[test]
fn association_loss_only_changes_status_indicator() {
    let mut analog = MockAnalog::new();
    analog.set_fallback(42.0);
    let mut node = node_with(analog, MockClock::new(), MockNetwork::down());

    node.clock_mut().set(15_000);
    let report = node.tick();
    assert!(!report.associated);
    assert!(!node.status_indicator().is_on());
    assert!(node.status_indicator().pin().high, "active-low LED is dark when high");

    // the reading still goes out once the broker is reachable
    assert_eq!(node.tick().publish, Some(PublishOutcome::Published));

    node.network_mut().associated = true;
    assert!(node.tick().associated);
    assert!(node.status_indicator().is_on());
    assert!(!node.status_indicator().pin().high);
}

#[test]
fn sampler_reads_are_independent_of_ticks() {
    let mut analog = MockAnalog::new();
    analog.set_fallback(5.0);
    let mut sampler = SensorSampler::new(analog, 15_000);

    assert!(sampler.poll(0).is_none());
    assert!(sampler.poll(15_000).is_some());
    assert!(sampler.poll(15_000).is_none());
    assert!(sampler.poll(29_999).is_none());
    assert!(sampler.poll(30_000).is_some());
    assert_eq!(sampler.input_mut().read().unwrap(), 5.0);
}
