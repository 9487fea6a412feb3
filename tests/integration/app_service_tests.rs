//! Integration tests for the sample → classify → actuate → publish pass.
//!
//! These run on the host (x86_64) and drive [`AppService::run_pass`] with
//! mock hardware and an in-memory broker, asserting on what actually
//! went over the wire.

use aiotnode::app::events::AppEvent;
use aiotnode::app::service::{AppService, TickResult};
use aiotnode::config::{ClassifierModel, DeviceConfig};
use aiotnode::error::{LinkError, PublishError, SensorError};
use aiotnode::link::codec::{Presence, TelemetryRecord, decode_status, decode_telemetry};
use aiotnode::link::{LinkEvent, MessagingLink};

use crate::mock_hw::{ActuatorCall, MockBroker, MockHardware, RecordingDisplay, RecordingSink};

const TELEMETRY: &str = "esp32/data";
const CONTROL: &str = "esp32/control";
const STATUS: &str = "esp32/status";

fn two_feature_config() -> DeviceConfig {
    DeviceConfig {
        model: ClassifierModel::two_feature(),
        ..DeviceConfig::default()
    }
}

struct Rig<'a> {
    app: AppService<'a>,
    hw: MockHardware,
    link: MessagingLink<MockBroker>,
    screen: RecordingDisplay,
    sink: RecordingSink,
}

impl<'a> Rig<'a> {
    fn new(config: &'a DeviceConfig, broker: MockBroker, temperature: f32, humidity: f32) -> Self {
        let mut rig = Self {
            app: AppService::new(config, 0),
            hw: MockHardware::new(temperature, humidity),
            link: MessagingLink::new(broker, config),
            screen: RecordingDisplay::new(),
            sink: RecordingSink::new(),
        };
        rig.app.start(&mut rig.hw, &mut rig.screen);
        rig
    }

    fn pass(&mut self, now_ms: u64) -> aiotnode::app::service::PassOutcome {
        self.app.run_pass(
            now_ms,
            &mut self.hw,
            &mut self.link,
            &mut self.screen,
            &mut self.sink,
        )
    }

    fn telemetry(&self) -> Vec<TelemetryRecord> {
        self.link
            .transport()
            .on_topic(TELEMETRY)
            .map(|p| decode_telemetry(&p.payload).unwrap())
            .collect()
    }
}

// ── Happy path ────────────────────────────────────────────────

#[test]
fn reading_at_model_mean_publishes_expected_record() {
    let config = two_feature_config();
    let mut rig = Rig::new(&config, MockBroker::new(), 25.0, 50.0);

    let out = rig.pass(0);
    assert_eq!(out.link_event, Some(LinkEvent::Connected));
    assert_eq!(out.tick, TickResult::NotDue);

    let out = rig.pass(3_000);
    assert_eq!(out.tick, TickResult::Published);

    let records = rig.telemetry();
    assert_eq!(records.len(), 1);
    let r = &records[0];
    assert_eq!(r.device_id.as_str(), "esp32-aiot-demo");
    assert_eq!(r.timestamp, 3_000);
    assert_eq!(r.temperature, 25.0);
    assert_eq!(r.humidity, 50.0);
    assert_eq!(r.features.as_slice(), &[25.0, 50.0]);
    assert!((r.probability - 0.4052).abs() < 1e-3, "p = {}", r.probability);
    assert_eq!(r.class, 0);
    assert!(!r.actuator);
    assert_eq!(r.label.as_str(), "NORMAL");

    assert_eq!(rig.screen.top(), "T:25.0C H:50%");
    assert_eq!(rig.screen.bottom(), "P:0.41 NORMAL");
    assert_eq!(rig.hw.last_call(), Some(ActuatorCall::Set(false)));
    assert_eq!(rig.app.counters().published, 1);
}

#[test]
fn connect_announces_retained_online_under_offline_will() {
    let config = two_feature_config();
    let mut rig = Rig::new(&config, MockBroker::new(), 25.0, 50.0);
    rig.pass(0);

    let broker = rig.link.transport();
    assert_eq!(broker.connects.len(), 1);
    let c = &broker.connects[0];
    assert_eq!(c.client_id, "esp32-aiot-demo");
    assert_eq!(c.host, "broker.mqtt.cool");
    assert_eq!(c.port, 1883);
    assert_eq!(c.will_topic, STATUS);
    assert!(c.will_retain);
    assert_eq!(decode_status(&c.will_payload).unwrap().status, Presence::Offline);

    assert_eq!(broker.subscriptions, vec![CONTROL.to_owned()]);
    let online: Vec<_> = broker.on_topic(STATUS).collect();
    assert_eq!(online.len(), 1);
    assert!(online[0].retain);
    assert_eq!(decode_status(&online[0].payload).unwrap().status, Presence::Online);
}

#[test]
fn humid_reading_turns_actuator_on_with_alert_label() {
    let config = two_feature_config();
    let mut rig = Rig::new(&config, MockBroker::new(), 20.0, 90.0);
    rig.pass(0);
    rig.pass(3_000);

    let r = &rig.telemetry()[0];
    assert!(r.probability > 0.9);
    assert_eq!(r.class, 1);
    assert!(r.actuator);
    assert_eq!(r.label.as_str(), "ALERT");
    assert_eq!(rig.hw.last_call(), Some(ActuatorCall::Set(true)));
}

// ── Remote commands and the hold window ───────────────────────

#[test]
fn command_received_in_same_pass_is_reflected_in_publish() {
    let config = two_feature_config();
    let mut rig = Rig::new(&config, MockBroker::new(), 25.0, 50.0);
    rig.pass(0);

    rig.link.transport_mut().push_frame(CONTROL, b"ON");
    let out = rig.pass(3_000);
    assert_eq!(out.frames, 1);
    assert_eq!(out.tick, TickResult::Published);

    let r = &rig.telemetry()[0];
    // Local class is still negative; the hold keeps the remote state.
    assert_eq!(r.class, 0);
    assert!(r.actuator);
    assert_eq!(r.label.as_str(), "ON");
    assert_eq!(rig.screen.bottom(), "CMD:ON");

    let held = rig.sink.count(|e| matches!(e, AppEvent::Telemetry(t) if !t.applied));
    assert_eq!(held, 1);
}

#[test]
fn zero_hold_command_still_wins_its_own_pass() {
    let config = DeviceConfig {
        remote_hold_ms: 0,
        ..two_feature_config()
    };
    let mut rig = Rig::new(&config, MockBroker::new(), 25.0, 50.0);
    rig.pass(0);

    rig.link
        .transport_mut()
        .push_frame(CONTROL, br#"{"command":"ON"}"#);
    let out = rig.pass(3_000);
    assert_eq!(out.frames, 1);
    assert_eq!(out.tick, TickResult::Published);

    let r = rig.telemetry().pop().unwrap();
    assert!(r.actuator);
    assert_eq!(r.label.as_str(), "ON");
    assert_eq!(rig.hw.last_call(), Some(ActuatorCall::Set(true)));

    // No hold: the next tick is local again.
    rig.pass(6_000);
    let r = rig.telemetry().pop().unwrap();
    assert!(!r.actuator);
    assert_eq!(r.label.as_str(), "NORMAL");
    assert_eq!(rig.hw.last_call(), Some(ActuatorCall::Set(false)));
}

#[test]
fn local_inference_resumes_after_hold_expires() {
    let config = two_feature_config();
    let mut rig = Rig::new(&config, MockBroker::new(), 25.0, 50.0);
    rig.pass(0);
    rig.link.transport_mut().push_frame(CONTROL, b"ON");
    rig.pass(1_000); // hold until 11 000

    for now in [3_000, 6_000, 9_000] {
        rig.pass(now);
        assert!(rig.telemetry().last().unwrap().actuator, "held at {now}");
    }

    rig.pass(12_000);
    let last = rig.telemetry().pop().unwrap();
    assert!(!last.actuator);
    assert_eq!(last.label.as_str(), "NORMAL");
    assert_eq!(rig.hw.last_call(), Some(ActuatorCall::Set(false)));
}

// ── Failure paths ─────────────────────────────────────────────

#[test]
fn sensor_failure_skips_publish_and_waits_a_full_period() {
    let config = two_feature_config();
    let mut rig = Rig::new(&config, MockBroker::new(), 25.0, 50.0);
    rig.hw.fail_with(SensorError::Timeout);
    rig.pass(0);

    let out = rig.pass(3_000);
    assert_eq!(out.tick, TickResult::SensorFault(SensorError::Timeout));
    assert!(rig.telemetry().is_empty());
    assert_eq!(rig.screen.bottom(), "SENSOR ERROR");
    assert_eq!(
        rig.sink.count(|e| *e == AppEvent::SensorFault(SensorError::Timeout)),
        1
    );
    assert_eq!(rig.app.next_tick_in(3_000), 3_000);
    assert_eq!(rig.pass(3_100).tick, TickResult::NotDue);

    let c = rig.app.counters();
    assert_eq!((c.ticks, c.sensor_faults, c.inferences), (1, 1, 0));

    rig.hw.set_reading(25.0, 50.0);
    assert_eq!(rig.pass(6_000).tick, TickResult::Published);
    assert_eq!(rig.telemetry().len(), 1);
}

#[test]
fn out_of_range_reading_is_a_sensor_fault() {
    let config = two_feature_config();
    let mut rig = Rig::new(&config, MockBroker::new(), 25.0, 150.0);
    rig.pass(0);
    assert_eq!(
        rig.pass(3_000).tick,
        TickResult::SensorFault(SensorError::InvalidReading)
    );
    assert!(rig.telemetry().is_empty());
}

#[test]
fn offline_ticks_still_actuate_and_publishing_resumes_after_connect() {
    let config = two_feature_config();
    let broker = MockBroker::failing(&[LinkError::Refused, LinkError::Timeout]);
    let mut rig = Rig::new(&config, broker, 20.0, 90.0);

    assert_eq!(
        rig.pass(0).link_event,
        Some(LinkEvent::ConnectFailed {
            error: LinkError::Refused,
            retry_in_ms: 2_000
        })
    );
    assert_eq!(rig.pass(1_000).link_event, None);
    assert_eq!(
        rig.pass(2_000).link_event,
        Some(LinkEvent::ConnectFailed {
            error: LinkError::Timeout,
            retry_in_ms: 4_000
        })
    );

    let out = rig.pass(3_000);
    assert_eq!(out.tick, TickResult::PublishFailed(PublishError::NotConnected));
    assert_eq!(rig.hw.last_call(), Some(ActuatorCall::Set(true)));

    let out = rig.pass(6_000);
    assert_eq!(out.link_event, Some(LinkEvent::Connected));
    assert_eq!(out.tick, TickResult::Published);
    assert_eq!(rig.telemetry().len(), 1);
}

#[test]
fn full_queue_fails_one_tick_only() {
    let config = two_feature_config();
    let mut rig = Rig::new(&config, MockBroker::new(), 25.0, 50.0);
    rig.pass(0);

    rig.link.transport_mut().publish_error = Some(PublishError::QueueFull);
    assert_eq!(
        rig.pass(3_000).tick,
        TickResult::PublishFailed(PublishError::QueueFull)
    );
    assert_eq!(
        rig.sink.count(|e| *e == AppEvent::PublishFailed(PublishError::QueueFull)),
        1
    );
    assert_eq!(rig.pass(6_000).tick, TickResult::Published);

    let c = rig.app.counters();
    assert_eq!((c.published, c.publish_failures), (1, 1));
}

#[test]
fn lost_session_reconnects_in_the_same_pass() {
    let config = two_feature_config();
    let mut rig = Rig::new(&config, MockBroker::new(), 25.0, 50.0);
    rig.pass(0);

    rig.link.transport_mut().drop_session = true;
    let out = rig.pass(500);
    assert_eq!(out.frames, 0);
    assert!(!rig.link.is_connected());
    assert_eq!(
        rig.sink
            .count(|e| *e == AppEvent::Link(LinkEvent::ConnectionLost)),
        1
    );

    // Reconnect is allowed immediately on the next pass.
    assert_eq!(rig.pass(550).link_event, Some(LinkEvent::Connected));
    assert_eq!(rig.link.transport().connects.len(), 2);
}

// ── Diagnostics ───────────────────────────────────────────────

#[test]
fn stats_snapshot_every_n_ticks() {
    let config = DeviceConfig {
        stats_interval_ticks: 2,
        ..two_feature_config()
    };
    let mut rig = Rig::new(&config, MockBroker::new(), 25.0, 50.0);
    for now in [0, 3_000, 6_000, 9_000] {
        rig.pass(now);
    }
    let stats: Vec<_> = rig
        .sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::Stats(c) => Some(c.ticks),
            _ => None,
        })
        .collect();
    assert_eq!(stats, vec![2]);
}
