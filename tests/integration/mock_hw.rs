//! Mock adapters for integration tests.
//!
//! Records every actuator call, display frame, emitted event, and broker
//! operation so tests can assert on the full history without touching
//! GPIO or a network.

use std::collections::VecDeque;

use aiotnode::app::display::DisplayLines;
use aiotnode::app::events::AppEvent;
use aiotnode::app::ports::{ActuatorPort, DisplayPort, EventSink, SensorPort};
use aiotnode::error::{LinkError, PublishError, SensorError};
use aiotnode::link::transport::{BrokerTransport, InboundFrame, SessionOptions};
use aiotnode::sensors::{AuxReadings, SensorReading};

// ── Actuator call record ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorCall {
    Set(bool),
}

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    pub reading: Result<SensorReading, SensorError>,
    pub aux: AuxReadings,
    pub calls: Vec<ActuatorCall>,
    on: bool,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new(temperature: f32, humidity: f32) -> Self {
        Self {
            reading: SensorReading::checked(temperature, humidity),
            aux: AuxReadings::default(),
            calls: Vec::new(),
            on: false,
        }
    }

    pub fn set_reading(&mut self, temperature: f32, humidity: f32) {
        self.reading = SensorReading::checked(temperature, humidity);
    }

    pub fn fail_with(&mut self, e: SensorError) {
        self.reading = Err(e);
    }

    pub fn last_call(&self) -> Option<ActuatorCall> {
        self.calls.last().copied()
    }
}

impl SensorPort for MockHardware {
    fn sample(&mut self) -> Result<SensorReading, SensorError> {
        self.reading
    }

    fn auxiliary(&mut self) -> AuxReadings {
        self.aux
    }
}

impl ActuatorPort for MockHardware {
    fn set_actuator(&mut self, on: bool) {
        self.on = on;
        self.calls.push(ActuatorCall::Set(on));
    }

    fn is_actuator_on(&self) -> bool {
        self.on
    }
}

// ── MockBroker ────────────────────────────────────────────────

/// One `connect` call as the transport saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRecord {
    pub client_id: String,
    pub host: String,
    pub port: u16,
    pub will_topic: String,
    pub will_payload: Vec<u8>,
    pub will_retain: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub topic: String,
    pub payload: Vec<u8>,
    pub retain: bool,
}

#[allow(dead_code)]
impl Published {
    pub fn text(&self) -> &str {
        std::str::from_utf8(&self.payload).unwrap()
    }
}

/// Scriptable in-memory broker session.
#[derive(Default)]
pub struct MockBroker {
    /// Outcomes for successive connects; empty = succeed.
    pub connect_results: VecDeque<Result<(), LinkError>>,
    pub connects: Vec<ConnectRecord>,
    pub subscriptions: Vec<String>,
    pub published: Vec<Published>,
    /// Frames waiting to be received.
    pub inbound: VecDeque<InboundFrame>,
    /// Next `try_recv` reports the session as lost.
    pub drop_session: bool,
    /// Next publish fails with this error.
    pub publish_error: Option<PublishError>,
    pub disconnects: u32,
    open: bool,
}

#[allow(dead_code)]
impl MockBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(results: &[LinkError]) -> Self {
        Self {
            connect_results: results.iter().map(|e| Err(*e)).collect(),
            ..Self::default()
        }
    }

    pub fn push_frame(&mut self, topic: &str, payload: &[u8]) {
        self.inbound
            .push_back(InboundFrame::new(topic, payload).unwrap());
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn on_topic<'a>(&'a self, topic: &'a str) -> impl Iterator<Item = &'a Published> + 'a {
        self.published.iter().filter(move |p| p.topic == topic)
    }
}

impl BrokerTransport for MockBroker {
    fn connect(&mut self, opts: &SessionOptions<'_>) -> Result<(), LinkError> {
        self.connects.push(ConnectRecord {
            client_id: opts.client_id.to_owned(),
            host: opts.host.to_owned(),
            port: opts.port,
            will_topic: opts.will.topic.to_owned(),
            will_payload: opts.will.payload.to_vec(),
            will_retain: opts.will.retain,
        });
        let result = self.connect_results.pop_front().unwrap_or(Ok(()));
        self.open = result.is_ok();
        result
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), LinkError> {
        if !self.open {
            return Err(LinkError::NotConnected);
        }
        self.subscriptions.push(topic.to_owned());
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), PublishError> {
        if !self.open {
            return Err(PublishError::NotConnected);
        }
        if let Some(e) = self.publish_error.take() {
            return Err(e);
        }
        self.published.push(Published {
            topic: topic.to_owned(),
            payload: payload.to_vec(),
            retain,
        });
        Ok(())
    }

    fn try_recv(&mut self) -> Result<Option<InboundFrame>, LinkError> {
        if !self.open {
            return Err(LinkError::NotConnected);
        }
        if self.drop_session {
            self.drop_session = false;
            self.open = false;
            return Err(LinkError::ConnectionLost);
        }
        Ok(self.inbound.pop_front())
    }

    fn disconnect(&mut self) {
        self.open = false;
        self.disconnects += 1;
    }
}

// ── Recording display ─────────────────────────────────────────

#[derive(Default)]
pub struct RecordingDisplay {
    pub frames: Vec<DisplayLines>,
}

#[allow(dead_code)]
impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bottom(&self) -> &str {
        self.frames.last().map_or("", |f| f.bottom.as_str())
    }

    pub fn top(&self) -> &str {
        self.frames.last().map_or("", |f| f.top.as_str())
    }
}

impl DisplayPort for RecordingDisplay {
    fn show(&mut self, lines: &DisplayLines) {
        self.frames.push(lines.clone());
    }
}

// ── Recording event sink ──────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
