//! MQTT transport adapter (device builds).
//!
//! Implements [`BrokerTransport`] on the ESP-IDF MQTT client.  The IDF
//! client delivers events on its own connection object, which blocks, so
//! a small pump thread copies them into a bounded channel that
//! [`try_recv`](BrokerTransport::try_recv) drains without waiting:
//!
//! ```text
//!   esp-mqtt task ─▶ EspMqttConnection::next() ─▶ pump thread
//!                                                   │ try_send (≤ EVENT_QUEUE)
//!   MessagingLink::poll ─▶ try_recv ◀── Receiver ◀──┘
//! ```
//!
//! Publishes use `enqueue`, which hands the message to the IDF outbox and
//! returns immediately.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TryRecvError, TrySendError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use esp_idf_svc::mqtt::client::{
    EspMqttClient, EspMqttConnection, EventPayload, LwtConfiguration, MqttClientConfiguration,
    QoS,
};
use log::{debug, info, warn};

use crate::error::{LinkError, PublishError};
use crate::link::transport::{BrokerTransport, InboundFrame, SessionOptions};

/// Events buffered between the pump thread and the main loop.
const EVENT_QUEUE: usize = 16;
const PUMP_STACK_BYTES: usize = 6 * 1024;

enum Signal {
    Up,
    Down,
    Frame(InboundFrame),
}

struct Session {
    client: EspMqttClient<'static>,
    events: Receiver<Signal>,
    pump: JoinHandle<()>,
}

impl Session {
    /// Destroying the client ends the connection, which stops the pump.
    fn close(self) {
        let Session {
            client,
            events,
            pump,
        } = self;
        drop(client);
        drop(events);
        let _ = pump.join();
    }
}

/// ESP-IDF MQTT client transport.  One session at a time.
pub struct EspMqttTransport {
    session: Option<Session>,
}

impl EspMqttTransport {
    pub fn new() -> Self {
        Self { session: None }
    }
}

impl Default for EspMqttTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn pump_events(mut connection: EspMqttConnection, tx: SyncSender<Signal>) {
    while let Ok(event) = connection.next() {
        let signal = match event.payload() {
            EventPayload::Connected(_) => Signal::Up,
            EventPayload::Disconnected => Signal::Down,
            EventPayload::Received {
                topic: Some(topic),
                data,
                ..
            } => match InboundFrame::new(topic, data) {
                Some(frame) => Signal::Frame(frame),
                None => {
                    warn!("MQTT(esp): dropped {}-byte frame on {topic} (too large)", data.len());
                    continue;
                }
            },
            EventPayload::Error(e) => {
                warn!("MQTT(esp): {e:?}");
                continue;
            }
            _ => continue,
        };
        match tx.try_send(signal) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => warn!("MQTT(esp): event queue full, event dropped"),
            Err(TrySendError::Disconnected(_)) => break,
        }
    }
    debug!("MQTT(esp): event pump stopped");
}

impl BrokerTransport for EspMqttTransport {
    fn connect(&mut self, opts: &SessionOptions<'_>) -> Result<(), LinkError> {
        self.disconnect();

        let url = format!("mqtt://{}:{}", opts.host, opts.port);
        let conf = MqttClientConfiguration {
            client_id: Some(opts.client_id),
            keep_alive_interval: Some(Duration::from_secs(u64::from(opts.keep_alive_secs.max(5)))),
            lwt: Some(LwtConfiguration {
                topic: opts.will.topic,
                payload: opts.will.payload,
                qos: QoS::AtLeastOnce,
                retain: opts.will.retain,
            }),
            ..Default::default()
        };
        let (client, connection) = EspMqttClient::new(&url, &conf).map_err(|e| {
            warn!("MQTT(esp): client init for {url} failed: {e}");
            LinkError::Io
        })?;

        let (tx, events) = mpsc::sync_channel(EVENT_QUEUE);
        let pump = std::thread::Builder::new()
            .name("mqtt-events".into())
            .stack_size(PUMP_STACK_BYTES)
            .spawn(move || pump_events(connection, tx))
            .map_err(|_| LinkError::Io)?;
        let session = Session {
            client,
            events,
            pump,
        };

        let deadline = Instant::now() + Duration::from_millis(u64::from(opts.connect_timeout_ms));
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match session.events.recv_timeout(remaining) {
                Ok(Signal::Up) => {
                    info!("MQTT(esp): session open on {url}");
                    self.session = Some(session);
                    return Ok(());
                }
                Ok(Signal::Frame(_)) => {}
                Ok(Signal::Down) => {
                    warn!("MQTT(esp): {url} closed the connection during connect");
                    session.close();
                    return Err(LinkError::Io);
                }
                Err(RecvTimeoutError::Timeout) => {
                    session.close();
                    return Err(LinkError::Timeout);
                }
                Err(RecvTimeoutError::Disconnected) => {
                    session.close();
                    return Err(LinkError::Io);
                }
            }
        }
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), LinkError> {
        let session = self.session.as_mut().ok_or(LinkError::NotConnected)?;
        session
            .client
            .subscribe(topic, QoS::AtLeastOnce)
            .map(|_| ())
            .map_err(|e| {
                warn!("MQTT(esp): subscribe {topic} failed: {e}");
                LinkError::Io
            })
    }

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), PublishError> {
        let session = self.session.as_mut().ok_or(PublishError::NotConnected)?;
        let qos = if retain {
            QoS::AtLeastOnce
        } else {
            QoS::AtMostOnce
        };
        session
            .client
            .enqueue(topic, qos, retain, payload)
            .map(|_| ())
            .map_err(|e| {
                debug!("MQTT(esp): publish {topic} rejected: {e}");
                PublishError::QueueFull
            })
    }

    fn try_recv(&mut self) -> Result<Option<InboundFrame>, LinkError> {
        let Some(session) = self.session.as_mut() else {
            return Err(LinkError::NotConnected);
        };
        for _ in 0..EVENT_QUEUE {
            match session.events.try_recv() {
                Ok(Signal::Frame(frame)) => return Ok(Some(frame)),
                Ok(Signal::Up) => {}
                Ok(Signal::Down) | Err(TryRecvError::Disconnected) => {
                    warn!("MQTT(esp): session lost");
                    self.disconnect();
                    return Err(LinkError::ConnectionLost);
                }
                Err(TryRecvError::Empty) => return Ok(None),
            }
        }
        Ok(None)
    }

    fn disconnect(&mut self) {
        if let Some(session) = self.session.take() {
            session.close();
            debug!("MQTT(esp): session closed");
        }
    }
}
