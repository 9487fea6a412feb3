//! Integration tests for inbound control frames and the decision gate.

use aiotnode::app::commands::{CommandSource, Directive, IgnoreReason};
use aiotnode::app::events::AppEvent;
use aiotnode::app::service::AppService;
use aiotnode::config::{ClassifierModel, DeviceConfig};
use aiotnode::error::ParseError;
use aiotnode::link::MessagingLink;
use aiotnode::link::codec::decode_telemetry;
use aiotnode::sensors::flame::FLAME_CHANNEL;

use crate::mock_hw::{ActuatorCall, MockBroker, MockHardware, RecordingDisplay, RecordingSink};

struct Bench<'a> {
    app: AppService<'a>,
    hw: MockHardware,
    screen: RecordingDisplay,
    sink: RecordingSink,
}

impl<'a> Bench<'a> {
    fn new(config: &'a DeviceConfig) -> Self {
        let mut bench = Self {
            app: AppService::new(config, 0),
            hw: MockHardware::new(25.0, 50.0),
            screen: RecordingDisplay::new(),
            sink: RecordingSink::new(),
        };
        bench.app.start(&mut bench.hw, &mut bench.screen);
        bench
    }

    fn frame(&mut self, raw: &[u8]) -> Option<Directive> {
        self.app
            .handle_frame(raw, 100, &mut self.hw, &mut self.screen, &mut self.sink)
    }
}

// ── Command resolution through the service ────────────────────

#[test]
fn legacy_tokens_drive_actuator() {
    let config = DeviceConfig::default();
    let mut b = Bench::new(&config);

    assert_eq!(
        b.frame(b"  on \n"),
        Some(Directive::Actuate {
            on: true,
            source: CommandSource::Legacy
        })
    );
    assert_eq!(b.hw.last_call(), Some(ActuatorCall::Set(true)));
    assert_eq!(b.screen.bottom(), "CMD:ON");

    b.frame(b"OFF");
    assert_eq!(b.hw.last_call(), Some(ActuatorCall::Set(false)));
    assert_eq!(b.screen.bottom(), "CMD:OFF");
    assert_eq!(b.app.counters().remote_commands, 2);
}

#[test]
fn command_for_another_device_is_dropped() {
    let config = DeviceConfig::default();
    let mut b = Bench::new(&config);
    let calls_before = b.hw.calls.len();

    let d = b.frame(br#"{"device_id":"esp32-other","command":"ON"}"#);
    assert_eq!(d, Some(Directive::Ignore(IgnoreReason::ForeignDevice)));
    assert_eq!(b.hw.calls.len(), calls_before);
    assert_eq!(b.app.counters().ignored_commands, 1);
    assert_eq!(
        b.sink
            .count(|e| *e == AppEvent::CommandIgnored(IgnoreReason::ForeignDevice)),
        1
    );
}

#[test]
fn command_for_this_device_is_applied() {
    let config = DeviceConfig::default();
    let mut b = Bench::new(&config);
    b.frame(br#"{"device_id":"esp32-aiot-demo","command":"on"}"#);
    assert!(b.app.actuator_state().on);
    assert_eq!(b.app.actuator_state().label.as_str(), "ON");
}

#[test]
fn command_outranks_prediction() {
    let config = DeviceConfig::default();
    let mut b = Bench::new(&config);
    let d = b.frame(br#"{"command":"OFF","prediction":1}"#);
    assert_eq!(
        d,
        Some(Directive::Actuate {
            on: false,
            source: CommandSource::Command
        })
    );
}

#[test]
fn unknown_command_falls_through_to_prediction_and_is_reported() {
    let config = DeviceConfig::default();
    let mut b = Bench::new(&config);
    let d = b.frame(br#"{"command":"BLINK","prediction":0.8}"#);
    assert_eq!(
        d,
        Some(Directive::Actuate {
            on: true,
            source: CommandSource::Prediction
        })
    );
    assert_eq!(b.sink.count(|e| *e == AppEvent::UnknownCommand), 1);
    assert_eq!(
        b.sink.count(|e| matches!(
            e,
            AppEvent::CommandApplied {
                on: true,
                source: CommandSource::Prediction
            }
        )),
        1
    );
}

#[test]
fn unknown_command_alone_is_ignored() {
    let config = DeviceConfig::default();
    let mut b = Bench::new(&config);
    let d = b.frame(br#"{"command":"BLINK"}"#);
    assert_eq!(d, Some(Directive::Ignore(IgnoreReason::UnknownCommand)));
    assert_eq!(b.sink.count(|e| *e == AppEvent::UnknownCommand), 0);
    assert!(!b.app.actuator_state().on);
}

#[test]
fn prediction_below_half_turns_off() {
    let config = DeviceConfig::default();
    let mut b = Bench::new(&config);
    b.frame(b"ON");
    b.frame(br#"{"prediction":0.2}"#);
    assert!(!b.app.actuator_state().on);
}

#[test]
fn probability_is_display_only() {
    let config = DeviceConfig::default();
    let mut b = Bench::new(&config);
    let calls_before = b.hw.calls.len();

    assert_eq!(
        b.frame(br#"{"probability":0.73}"#),
        Some(Directive::ShowProbability(0.73_f64 as f32))
    );
    assert_eq!(b.screen.bottom(), "P:0.73 (remote)");
    assert_eq!(b.hw.calls.len(), calls_before);

    assert_eq!(
        b.frame(br#"{"probability":1.7}"#),
        Some(Directive::Ignore(IgnoreReason::InvalidProbability))
    );
    assert_eq!(b.screen.bottom(), "P:0.73 (remote)");
}

#[test]
fn empty_object_has_nothing_to_do() {
    let config = DeviceConfig::default();
    let mut b = Bench::new(&config);
    assert_eq!(
        b.frame(br#"{"note":"hello"}"#),
        Some(Directive::Ignore(IgnoreReason::NoActionableField))
    );
}

#[test]
fn garbage_frames_are_counted_and_reported() {
    let config = DeviceConfig::default();
    let mut b = Bench::new(&config);
    assert_eq!(b.frame(&[0xFF, 0xFE]), None);
    assert_eq!(b.frame(b"TOGGLE"), None);
    assert_eq!(b.frame(b"   "), None);

    let c = b.app.counters();
    assert_eq!((c.frames, c.parse_errors), (3, 3));
    assert_eq!(
        b.sink.events,
        vec![
            AppEvent::ParseFailed(ParseError::NotUtf8),
            AppEvent::ParseFailed(ParseError::Unrecognized),
            AppEvent::ParseFailed(ParseError::Empty),
        ]
    );
}

#[test]
fn json_array_frame_does_not_actuate() {
    let config = DeviceConfig::default();
    let mut b = Bench::new(&config);
    let calls_before = b.hw.calls.len();

    assert_eq!(b.frame(br#"["esp32-aiot-demo","ON"]"#), None);
    assert_eq!(b.hw.calls.len(), calls_before);
    assert!(!b.app.actuator_state().on);
    assert_eq!(
        b.sink.events,
        vec![AppEvent::ParseFailed(ParseError::Unrecognized)]
    );
}

// ── Flame gate ────────────────────────────────────────────────

#[test]
fn flame_gate_requires_detector_for_alert() {
    let config = DeviceConfig {
        model: ClassifierModel::two_feature(),
        ..DeviceConfig::default()
    }
    .with_flame_gate();

    let mut app = AppService::new(&config, 0);
    let mut hw = MockHardware::new(20.0, 90.0);
    let mut link = MessagingLink::new(MockBroker::new(), &config);
    let mut screen = RecordingDisplay::new();
    let mut sink = RecordingSink::new();

    app.run_pass(0, &mut hw, &mut link, &mut screen, &mut sink);
    app.run_pass(3_000, &mut hw, &mut link, &mut screen, &mut sink);
    assert!(app.last_result().unwrap().probability > 0.6);
    assert_eq!(hw.last_call(), Some(ActuatorCall::Set(false)));

    hw.aux.set(FLAME_CHANNEL, 1.0);
    app.run_pass(6_000, &mut hw, &mut link, &mut screen, &mut sink);
    assert_eq!(hw.last_call(), Some(ActuatorCall::Set(true)));

    let records: Vec<_> = link
        .transport()
        .on_topic("esp32/data")
        .map(|p| decode_telemetry(&p.payload).unwrap())
        .collect();
    assert_eq!(records.len(), 2);
    assert_eq!((records[0].class, records[0].label.as_str()), (0, "NORMAL"));
    assert_eq!((records[1].class, records[1].label.as_str()), (1, "ALERT"));

    let masks: Vec<u8> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::Telemetry(t) => Some(t.gate_mask),
            _ => None,
        })
        .collect();
    assert_eq!(masks, vec![0b0, 0b1]);
}
