//! The control loop and its runtime context.
//!
//! [`ControlLoop`] owns every collaborator and runs one cooperative tick at
//! a time:
//!
//! 1. reflect network association on the status indicator
//! 2. publish the pending reading, if any (connecting on demand)
//! 3. sample the sensor if the interval has elapsed
//! 4. service the diagnostic responder
//!
//! A reading that cannot be sent is dropped, never queued, so the loop
//! cannot back up behind a dead broker.

use log::{debug, info, warn};

use crate::calibration::{run_calibration, CalibrationRange};
use crate::connection::ConnectionManager;
use crate::identity::{DeviceIdentity, Topic};
use crate::payload::encode;
use crate::sampler::{Reading, SampleOutcome, SensorSampler};
use crate::traits::{
    AnalogInput, Clock, DiagnosticResponder, DigitalOutput, Entropy, Indicator, MqttClient,
    NetworkLink,
};

/// Counters accumulated over the lifetime of the loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Ticks executed.
    pub ticks: u64,
    /// Valid samples stored as pending.
    pub samples_taken: u32,
    /// Sample attempts that produced no usable value.
    pub samples_rejected: u32,
    /// Readings handed to the broker.
    pub published: u32,
    /// Readings dropped because no broker session could be established.
    pub dropped_disconnected: u32,
    /// Readings dropped because encoding or publishing failed.
    pub dropped_failed: u32,
    /// Broker handshakes attempted.
    pub connection_attempts: u32,
}

/// All runtime state of the node.
///
/// Identity and topic are fixed at boot; everything else is volatile and
/// lost on reset.
#[derive(Debug)]
pub struct RuntimeContext {
    /// This node's identity.
    pub identity: DeviceIdentity,
    /// Where readings are published.
    pub topic: Topic,
    /// The last valid reading not yet published or dropped.
    pub pending: Option<Reading>,
    /// Range recorded by boot-time calibration, once it has run.
    pub calibration: Option<CalibrationRange>,
    /// Lifetime counters.
    pub stats: LoopStats,
}

impl RuntimeContext {
    /// Build the context for `identity`, publishing under `base_topic`.
    pub fn new(identity: DeviceIdentity, base_topic: &str) -> Self {
        let topic = Topic::for_device(base_topic, &identity);
        Self {
            identity,
            topic,
            pending: None,
            calibration: None,
            stats: LoopStats::default(),
        }
    }

    /// True while a reading is waiting to be published.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// What happened to the pending reading during a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Handed to the broker client.
    Published,
    /// Dropped: no broker session.
    DroppedDisconnected,
    /// Dropped: the payload did not fit its buffer.
    DroppedEncode,
    /// Dropped: the client rejected the publish.
    DroppedPublish,
}

/// What happened when the sampler ran during a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleStatus {
    /// A valid reading is now pending.
    Stored,
    /// The read was invalid; nothing is pending from it.
    Rejected,
}

/// Observable summary of one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickReport {
    /// Network association at the start of the tick.
    pub associated: bool,
    /// Set when a pending reading was handled.
    pub publish: Option<PublishOutcome>,
    /// Set when the sampler ran.
    pub sample: Option<SampleStatus>,
    /// Whether the diagnostic responder serviced cleanly.
    pub diagnostics_ok: bool,
}

/// The single-threaded scheduler tying the node together.
pub struct ControlLoop<C, A, O, N, M, R, D> {
    ctx: RuntimeContext,
    clock: C,
    sampler: SensorSampler<A>,
    status: Indicator<O>,
    activity: Indicator<O>,
    network: N,
    connection: ConnectionManager<M, R>,
    diagnostics: D,
}

impl<C, A, O, N, M, R, D> ControlLoop<C, A, O, N, M, R, D>
where
    C: Clock,
    A: AnalogInput,
    O: DigitalOutput,
    N: NetworkLink,
    M: MqttClient,
    R: Entropy,
    D: DiagnosticResponder,
{
    /// Assemble the loop. `indicators` is `(status, activity)`.
    pub fn new(
        ctx: RuntimeContext,
        clock: C,
        sampler: SensorSampler<A>,
        indicators: (Indicator<O>, Indicator<O>),
        network: N,
        connection: ConnectionManager<M, R>,
        diagnostics: D,
    ) -> Self {
        let (status, activity) = indicators;
        Self {
            ctx,
            clock,
            sampler,
            status,
            activity,
            network,
            connection,
            diagnostics,
        }
    }

    /// Run the boot-time calibration window.
    ///
    /// Blocks until `window_ms` after boot with the activity indicator lit,
    /// then records the result via [`Self::record_calibration`].
    pub fn calibrate(&mut self, window_ms: u64, adc_max: i32) -> Option<CalibrationRange> {
        let range = calibrate_with_indicator(
            self.sampler.input_mut(),
            &self.clock,
            &mut self.activity,
            window_ms,
            adc_max,
        );
        self.record_calibration(range);
        range
    }

    /// Store a calibration result taken before the loop was assembled.
    ///
    /// Re-anchors the sampling interval so the first regular sample is due
    /// one interval from now.
    pub fn record_calibration(&mut self, range: Option<CalibrationRange>) {
        self.ctx.calibration = range;
        self.sampler.restart(self.clock.now_ms());
    }

    /// Execute one tick.
    pub fn tick(&mut self) -> TickReport {
        self.ctx.stats.ticks = self.ctx.stats.ticks.wrapping_add(1);

        let associated = self.network.is_associated();
        set_indicator(&mut self.status, associated);

        let publish = self.ctx.pending.take().map(|reading| self.publish(reading));

        let now = self.clock.now_ms();
        let sample = self.sampler.poll(now).map(|outcome| match outcome {
            SampleOutcome::Valid(reading) => {
                self.ctx.stats.samples_taken = self.ctx.stats.samples_taken.saturating_add(1);
                self.ctx.pending = Some(reading);
                SampleStatus::Stored
            }
            SampleOutcome::Invalid => {
                self.ctx.stats.samples_rejected = self.ctx.stats.samples_rejected.saturating_add(1);
                SampleStatus::Rejected
            }
        });

        let diagnostics_ok = match self.diagnostics.service() {
            Ok(()) => true,
            Err(e) => {
                warn!("diagnostic service failed: {:?}", e);
                false
            }
        };

        let report = TickReport {
            associated,
            publish,
            sample,
            diagnostics_ok,
        };
        debug!("tick {}: {:?}", self.ctx.stats.ticks, report);
        report
    }

    /// Publish `reading` or drop it. Either way it is gone afterwards.
    fn publish(&mut self, reading: Reading) -> PublishOutcome {
        let connected = self.connection.ensure_connected();
        self.ctx.stats.connection_attempts = self.connection.attempts();

        if !connected {
            warn!("dropping reading {}: no broker connection", reading.formatted());
            self.ctx.stats.dropped_disconnected = self.ctx.stats.dropped_disconnected.saturating_add(1);
            return PublishOutcome::DroppedDisconnected;
        }

        let payload = match encode(&reading, &self.ctx.identity) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("dropping reading {}: {}", reading.formatted(), e);
                self.ctx.stats.dropped_failed = self.ctx.stats.dropped_failed.saturating_add(1);
                return PublishOutcome::DroppedEncode;
            }
        };

        set_indicator(&mut self.activity, true);
        let result = self
            .connection
            .client_mut()
            .publish(self.ctx.topic.as_str(), payload.as_bytes(), false);
        set_indicator(&mut self.activity, false);

        match result {
            Ok(()) => {
                info!("published {} to {}", payload, self.ctx.topic);
                self.ctx.stats.published = self.ctx.stats.published.saturating_add(1);
                PublishOutcome::Published
            }
            Err(e) => {
                warn!("dropping reading {}: publish failed: {:?}", reading.formatted(), e);
                self.connection.mark_lost();
                self.ctx.stats.dropped_failed = self.ctx.stats.dropped_failed.saturating_add(1);
                PublishOutcome::DroppedPublish
            }
        }
    }

    /// The runtime context.
    pub fn context(&self) -> &RuntimeContext {
        &self.ctx
    }

    /// The clock, e.g. to advance a mock between ticks.
    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    /// The sampler.
    pub fn sampler(&self) -> &SensorSampler<A> {
        &self.sampler
    }

    /// Mutable access to the sampler, e.g. to queue mock readings.
    pub fn sampler_mut(&mut self) -> &mut SensorSampler<A> {
        &mut self.sampler
    }

    /// The status (association) indicator.
    pub fn status_indicator(&self) -> &Indicator<O> {
        &self.status
    }

    /// The activity (calibration/publish) indicator.
    pub fn activity_indicator(&self) -> &Indicator<O> {
        &self.activity
    }

    /// The network link.
    pub fn network_mut(&mut self) -> &mut N {
        &mut self.network
    }

    /// The connection manager.
    pub fn connection(&self) -> &ConnectionManager<M, R> {
        &self.connection
    }

    /// Mutable access to the connection manager.
    pub fn connection_mut(&mut self) -> &mut ConnectionManager<M, R> {
        &mut self.connection
    }

    /// The diagnostic responder.
    pub fn diagnostics(&self) -> &D {
        &self.diagnostics
    }

    /// Mutable access to the diagnostic responder.
    pub fn diagnostics_mut(&mut self) -> &mut D {
        &mut self.diagnostics
    }
}

/// Boot-time calibration with `indicator` lit for the duration.
///
/// Usable before a [`ControlLoop`] exists, so a node can calibrate ahead
/// of bringing up its network services.
pub fn calibrate_with_indicator<A, C, P>(
    input: &mut A,
    clock: &C,
    indicator: &mut Indicator<P>,
    window_ms: u64,
    adc_max: i32,
) -> Option<CalibrationRange>
where
    A: AnalogInput,
    C: Clock,
    P: DigitalOutput,
{
    set_indicator(indicator, true);
    let range = run_calibration(input, clock, window_ms, adc_max);
    set_indicator(indicator, false);
    range
}

/// LED failures are cosmetic and never interrupt the loop.
fn set_indicator<P: DigitalOutput>(indicator: &mut Indicator<P>, on: bool) {
    if let Err(e) = indicator.set(on) {
        debug!("indicator write failed: {:?}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{
        MockAnalog, MockClock, MockDiagnostics, MockEntropy, MockMqtt, MockNetwork, MockPin,
    };
    use crate::traits::ConnectOutcome;

    type TestLoop =
        ControlLoop<MockClock, MockAnalog, MockPin, MockNetwork, MockMqtt, MockEntropy, MockDiagnostics>;

    fn node(analog: MockAnalog, mqtt: MockMqtt) -> TestLoop {
        ControlLoop::new(
            RuntimeContext::new(DeviceIdentity::from_chip_id(0xa1b2), "base"),
            MockClock::new(),
            SensorSampler::new(analog, 15_000),
            (
                Indicator::active_low(MockPin::new()),
                Indicator::active_low(MockPin::new()),
            ),
            MockNetwork::up(),
            ConnectionManager::new(mqtt, MockEntropy::new(), "sensor-node"),
            MockDiagnostics::new(),
        )
    }

    #[test]
    fn context_builds_topic() {
        let ctx = RuntimeContext::new(DeviceIdentity::from_chip_id(0xa1b2), "base");
        assert_eq!(ctx.topic.as_str(), "base/a1b2");
        assert!(!ctx.has_pending());
    }

    #[test]
    fn first_tick_does_not_connect() {
        let mut n = node(MockAnalog::new(), MockMqtt::new());
        let report = n.tick();
        assert_eq!(report.publish, None);
        assert_eq!(report.sample, None);
        assert!(n.connection().client().connect_calls.is_empty());
    }

    #[test]
    fn sample_then_publish_on_next_tick() {
        let mut analog = MockAnalog::new();
        analog.queue(512.0);
        let mut n = node(analog, MockMqtt::new());

        n.clock_mut().advance(15_000);
        assert_eq!(n.tick().sample, Some(SampleStatus::Stored));
        assert!(n.context().has_pending());

        assert_eq!(n.tick().publish, Some(PublishOutcome::Published));
        assert!(!n.context().has_pending());

        let published = &n.connection().client().published;
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, "base/a1b2");
        assert_eq!(
            published[0].1,
            br#"{"type":"float","value":"512.0","device":{"id":"a1b2"},"apiVersion":"3.0.0"}"#
        );
        assert!(!published[0].2);
    }

    #[test]
    fn status_indicator_follows_association() {
        let mut n = node(MockAnalog::new(), MockMqtt::new());
        n.tick();
        assert!(n.status_indicator().is_on());
        assert!(!n.status_indicator().pin().high);

        n.network_mut().associated = false;
        assert!(!n.tick().associated);
        assert!(!n.status_indicator().is_on());
        assert!(n.status_indicator().pin().high);
    }

    #[test]
    fn activity_indicator_pulses_around_publish() {
        let mut analog = MockAnalog::new();
        analog.queue(1.0);
        let mut n = node(analog, MockMqtt::new());
        n.clock_mut().advance(15_000);
        n.tick();
        n.tick();

        // active-low: on = low, off = high
        assert_eq!(n.activity_indicator().pin().history, [false, true]);
        assert!(!n.activity_indicator().is_on());
    }

    #[test]
    fn connect_failure_drops_reading() {
        let mut analog = MockAnalog::new();
        analog.queue(3.0);
        let mut mqtt = MockMqtt::new();
        mqtt.queue_outcome(ConnectOutcome::Failed("refused".into()));
        let mut n = node(analog, mqtt);

        n.clock_mut().advance(15_000);
        n.tick();
        let report = n.tick();

        assert_eq!(report.publish, Some(PublishOutcome::DroppedDisconnected));
        assert!(!n.context().has_pending());
        assert_eq!(n.context().stats.dropped_disconnected, 1);
        assert_eq!(n.context().stats.connection_attempts, 1);
        // no retry on the next tick with nothing pending
        n.tick();
        assert_eq!(n.connection().client().connect_calls.len(), 1);
    }

    #[test]
    fn publish_failure_drops_reading_and_forces_reconnect() {
        let mut analog = MockAnalog::new();
        analog.set_fallback(7.0);
        let mut n = node(analog, MockMqtt::new());
        n.connection_mut().client_mut().fail_publish = true;

        n.clock_mut().advance(15_000);
        n.tick();
        assert_eq!(n.tick().publish, Some(PublishOutcome::DroppedPublish));
        assert_eq!(n.context().stats.dropped_failed, 1);

        n.connection_mut().client_mut().fail_publish = false;
        n.clock_mut().advance(15_000);
        n.tick();
        assert_eq!(n.tick().publish, Some(PublishOutcome::Published));
        assert_eq!(n.connection().client().connect_calls.len(), 2);
    }

    #[test]
    fn diagnostics_failure_is_reported_not_fatal() {
        let mut n = node(MockAnalog::new(), MockMqtt::new());
        n.diagnostics_mut().fail = true;
        assert!(!n.tick().diagnostics_ok);
        n.diagnostics_mut().fail = false;
        assert!(n.tick().diagnostics_ok);
        assert_eq!(n.diagnostics().service_count, 2);
    }

    #[test]
    fn calibrate_records_range_and_reanchors_sampler() {
        let mut analog = MockAnalog::new();
        analog.queue(300.0);
        analog.queue(700.0);
        analog.set_fallback(500.0);
        let mut n = ControlLoop::new(
            RuntimeContext::new(DeviceIdentity::from_chip_id(1), "base"),
            MockClock::new().with_auto_advance(250),
            SensorSampler::new(analog, 15_000),
            (
                Indicator::active_low(MockPin::new()),
                Indicator::active_low(MockPin::new()),
            ),
            MockNetwork::up(),
            ConnectionManager::new(MockMqtt::new(), MockEntropy::new(), "sensor-node"),
            MockDiagnostics::new(),
        );

        let range = n.calibrate(5_000, 1023).unwrap();
        assert_eq!((range.low(), range.high()), (300, 700));
        assert_eq!(n.context().calibration, Some(range));
        assert!(n.sampler().last_sample_ms() >= 5_000);
        assert!(!n.activity_indicator().is_on());
        assert_eq!(n.activity_indicator().pin().history, [false, true]);
    }

    #[test]
    fn calibration_without_valid_values_records_nothing() {
        let mut n = node(MockAnalog::new(), MockMqtt::new());
        *n.clock_mut() = MockClock::new().with_auto_advance(500);

        assert_eq!(n.calibrate(5_000, 1023), None);
        assert_eq!(n.context().calibration, None);
        assert!(n.sampler().last_sample_ms() >= 5_000);
    }

    #[test]
    fn calibration_ahead_of_loop_is_recorded_later() {
        let mut analog = MockAnalog::new();
        analog.set_fallback(640.0);
        let clock = MockClock::new().with_auto_advance(100);
        let mut activity = Indicator::active_low(MockPin::new());

        let range = calibrate_with_indicator(&mut analog, &clock, &mut activity, 5_000, 1023);
        assert_eq!(range.map(|r| (r.low(), r.high())), Some((640, 640)));
        assert_eq!(activity.pin().history, [false, true]);

        let mut n = node(analog, MockMqtt::new());
        n.clock_mut().set(6_000);
        n.record_calibration(range);

        assert_eq!(n.context().calibration, range);
        assert!(!n.sampler().is_due(20_999));
        assert!(n.sampler().is_due(21_000));
    }
}
