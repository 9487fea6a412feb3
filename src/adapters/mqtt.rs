//! MQTT transport adapter (host builds).
//!
//! Implements [`BrokerTransport`] on top of the rumqttc synchronous client.
//! rumqttc drives its network I/O only while the [`Connection`] is being
//! polled, so every call that needs the network polls it for a bounded
//! slice:
//!
//! ```text
//!   connect()   ── recv_timeout(remaining) … until ConnAck / deadline
//!   try_recv()  ── recv_timeout(POLL_SLICE) × ≤ MAX_EVENTS_PER_RECV
//!   publish()   ── try_publish (request queue only, never waits)
//! ```
//!
//! The session is dropped on any connection error; reconnecting is the
//! link's decision, not rumqttc's built-in retry.

use std::time::{Duration, Instant};

use log::{debug, info, warn};
use rumqttc::{
    Client, Connection, ConnectionError, Event, LastWill, MqttOptions, Packet, QoS,
    RecvTimeoutError,
};

use crate::error::{LinkError, PublishError};
use crate::link::transport::{BrokerTransport, InboundFrame, SessionOptions};

/// Capacity of rumqttc's outgoing request channel.
const REQUEST_CAPACITY: usize = 16;
/// How long one receive poll may drive the event loop.
const POLL_SLICE: Duration = Duration::from_millis(2);
/// Events examined per `try_recv` before reporting "nothing pending".
const MAX_EVENTS_PER_RECV: usize = 16;

struct Session {
    client: Client,
    connection: Connection,
}

/// rumqttc-backed transport.  One session at a time.
pub struct MqttTransport {
    session: Option<Session>,
}

impl MqttTransport {
    pub fn new() -> Self {
        Self { session: None }
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    fn options(opts: &SessionOptions<'_>) -> MqttOptions {
        let mut mqtt = MqttOptions::new(opts.client_id, opts.host, opts.port);
        mqtt.set_keep_alive(Duration::from_secs(u64::from(opts.keep_alive_secs.max(5))));
        mqtt.set_clean_session(true);
        mqtt.set_last_will(LastWill::new(
            opts.will.topic,
            opts.will.payload.to_vec(),
            QoS::AtLeastOnce,
            opts.will.retain,
        ));
        mqtt
    }
}

impl Default for MqttTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn map_connect_error(e: &ConnectionError) -> LinkError {
    match e {
        ConnectionError::ConnectionRefused(_) => LinkError::Refused,
        _ => LinkError::Io,
    }
}

impl BrokerTransport for MqttTransport {
    fn connect(&mut self, opts: &SessionOptions<'_>) -> Result<(), LinkError> {
        self.disconnect();

        let (client, mut connection) = Client::new(Self::options(opts), REQUEST_CAPACITY);
        let deadline = Instant::now() + Duration::from_millis(u64::from(opts.connect_timeout_ms));

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(LinkError::Timeout);
            }
            match connection.recv_timeout(remaining) {
                Ok(Ok(Event::Incoming(Packet::ConnAck(ack)))) => {
                    info!("MQTT: session open on {}:{} ({:?})", opts.host, opts.port, ack.code);
                    self.session = Some(Session { client, connection });
                    return Ok(());
                }
                Ok(Ok(_)) => continue,
                Ok(Err(e)) => {
                    warn!("MQTT: connect to {}:{} failed: {e}", opts.host, opts.port);
                    return Err(map_connect_error(&e));
                }
                Err(RecvTimeoutError::Timeout) => return Err(LinkError::Timeout),
                Err(RecvTimeoutError::Disconnected) => return Err(LinkError::Io),
            }
        }
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), LinkError> {
        let session = self.session.as_mut().ok_or(LinkError::NotConnected)?;
        session
            .client
            .try_subscribe(topic, QoS::AtLeastOnce)
            .map_err(|e| {
                warn!("MQTT: subscribe {topic} failed: {e}");
                LinkError::Io
            })
    }

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), PublishError> {
        let session = self.session.as_mut().ok_or(PublishError::NotConnected)?;
        // Retained presence goes out at-least-once; telemetry is fire-and-forget.
        let qos = if retain {
            QoS::AtLeastOnce
        } else {
            QoS::AtMostOnce
        };
        session
            .client
            .try_publish(topic, qos, retain, payload.to_vec())
            .map_err(|e| {
                debug!("MQTT: publish {topic} rejected: {e}");
                PublishError::QueueFull
            })
    }

    fn try_recv(&mut self) -> Result<Option<InboundFrame>, LinkError> {
        let Some(session) = self.session.as_mut() else {
            return Err(LinkError::NotConnected);
        };

        for _ in 0..MAX_EVENTS_PER_RECV {
            match session.connection.recv_timeout(POLL_SLICE) {
                Ok(Ok(Event::Incoming(Packet::Publish(p)))) => {
                    match InboundFrame::new(&p.topic, &p.payload) {
                        Some(frame) => return Ok(Some(frame)),
                        None => warn!(
                            "MQTT: dropped {}-byte frame on {} (too large)",
                            p.payload.len(),
                            p.topic
                        ),
                    }
                }
                Ok(Ok(Event::Incoming(Packet::Disconnect))) => {
                    warn!("MQTT: broker closed the session");
                    self.session = None;
                    return Err(LinkError::ConnectionLost);
                }
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    warn!("MQTT: connection error: {e}");
                    self.session = None;
                    return Err(LinkError::ConnectionLost);
                }
                Err(RecvTimeoutError::Timeout) => return Ok(None),
                Err(RecvTimeoutError::Disconnected) => {
                    self.session = None;
                    return Err(LinkError::ConnectionLost);
                }
            }
        }
        Ok(None)
    }

    fn disconnect(&mut self) {
        if let Some(mut session) = self.session.take() {
            let _ = session.client.try_disconnect();
            // Flush the DISCONNECT (and any queued retained status) briefly.
            for _ in 0..MAX_EVENTS_PER_RECV {
                match session.connection.recv_timeout(POLL_SLICE) {
                    Ok(Ok(_)) => {}
                    _ => break,
                }
            }
            debug!("MQTT: session closed");
        }
    }
}
