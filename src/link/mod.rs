//! Messaging link: broker session state machine.
//!
//! ```text
//!             ┌──────────────── backoff elapsed ────────────────┐
//!             ▼                                                 │
//!      ┌──────────────┐  service()  ┌────────────┐  fail  ┌─────┴────────┐
//!      │ Disconnected │────────────▶│ Connecting │───────▶│ Disconnected │
//!      └──────────────┘             └─────┬──────┘        │ (retry at T) │
//!             ▲                           │ ok            └──────────────┘
//!             │ loss (poll)               ▼
//!             │                    ┌────────────┐
//!             └────────────────────│ Connected  │  subscribe control,
//!                                  └────────────┘  retained "online"
//! ```
//!
//! The link never sleeps.  [`MessagingLink::service`] is called every pass
//! and starts a connect attempt only when the backoff deadline has passed;
//! the attempt itself is the only blocking call (bounded by
//! `connect_timeout_ms`).  [`MessagingLink::poll`] hands over at most
//! [`MAX_FRAMES_PER_POLL`] frames that are already waiting.

pub mod backoff;
pub mod codec;
pub mod transport;

use heapless::String;
use log::{debug, info, warn};

use crate::config::{DeviceConfig, DeviceId, Topics};
use crate::error::{LinkError, PublishError};

use self::backoff::Backoff;
use self::codec::{Presence, StatusMessage, encode_into};
use self::transport::{BrokerTransport, InboundFrame, SessionOptions, Will};

/// Upper bound on inbound frames dispatched per pass.
pub const MAX_FRAMES_PER_POLL: usize = 8;

/// Scratch space for status / will payloads.
const STATUS_BUF_CAP: usize = 96;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Session changes surfaced to the event sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    Connected,
    ConnectFailed { error: LinkError, retry_in_ms: u32 },
    ConnectionLost,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    pub connect_attempts: u32,
    pub connects: u32,
    pub losses: u32,
    pub published: u32,
    pub rejected: u32,
    pub inbound: u32,
}

pub struct MessagingLink<T> {
    transport: T,
    state: ConnectionState,
    backoff: Backoff,
    client_id: DeviceId,
    host: String<64>,
    port: u16,
    keep_alive_secs: u16,
    connect_timeout_ms: u32,
    topics: Topics,
    max_payload: usize,
    stats: LinkStats,
}

impl<T: BrokerTransport> MessagingLink<T> {
    pub fn new(transport: T, config: &DeviceConfig) -> Self {
        Self {
            transport,
            state: ConnectionState::Disconnected,
            backoff: Backoff::new(config.backoff),
            client_id: config.device_id.clone(),
            host: config.broker_host.clone(),
            port: config.broker_port,
            keep_alive_secs: config.keep_alive_secs,
            connect_timeout_ms: config.connect_timeout_ms,
            topics: config.topics.clone(),
            max_payload: config.max_payload_bytes,
            stats: LinkStats::default(),
        }
    }

    // ── State machine ─────────────────────────────────────────

    /// Attempt a connect if disconnected and the backoff allows it.
    pub fn service(&mut self, now_ms: u64) -> Option<LinkEvent> {
        if self.state != ConnectionState::Disconnected || !self.backoff.ready(now_ms) {
            return None;
        }

        self.state = ConnectionState::Connecting;
        self.stats.connect_attempts = self.stats.connect_attempts.saturating_add(1);
        info!(
            "Link: connecting to {}:{} as '{}' (attempt {})",
            self.host,
            self.port,
            self.client_id,
            self.backoff.failures() + 1
        );

        let mut will_buf = [0u8; STATUS_BUF_CAP];
        let will_len = encode_into(&self.status(Presence::Offline), &mut will_buf).unwrap_or(0);
        let opts = SessionOptions {
            client_id: &self.client_id,
            host: &self.host,
            port: self.port,
            keep_alive_secs: self.keep_alive_secs,
            connect_timeout_ms: self.connect_timeout_ms,
            will: Will {
                topic: &self.topics.status,
                payload: &will_buf[..will_len],
                retain: true,
            },
        };

        let result = self
            .transport
            .connect(&opts)
            .and_then(|()| self.transport.subscribe(&self.topics.control));

        match result {
            Ok(()) => {
                self.state = ConnectionState::Connected;
                self.backoff.reset();
                self.stats.connects = self.stats.connects.saturating_add(1);
                info!("Link: connected, subscribed to '{}'", self.topics.control);
                self.announce(Presence::Online);
                Some(LinkEvent::Connected)
            }
            Err(error) => {
                self.transport.disconnect();
                self.state = ConnectionState::Disconnected;
                let retry_in_ms = self.backoff.on_failure(now_ms);
                warn!("Link: connect failed ({error}), retry in {retry_in_ms} ms");
                Some(LinkEvent::ConnectFailed { error, retry_in_ms })
            }
        }
    }

    /// Dispatch frames already waiting on the control topic.
    ///
    /// Returns the number of frames handed to `on_frame`, or
    /// `Err(ConnectionLost)` after dropping to `Disconnected`.
    pub fn poll(
        &mut self,
        now_ms: u64,
        mut on_frame: impl FnMut(&InboundFrame),
    ) -> Result<usize, LinkError> {
        if self.state != ConnectionState::Connected {
            return Ok(0);
        }
        let mut handled = 0;
        for _ in 0..MAX_FRAMES_PER_POLL {
            match self.transport.try_recv() {
                Ok(Some(frame)) => {
                    self.stats.inbound = self.stats.inbound.saturating_add(1);
                    if frame.topic.as_str() == self.topics.control.as_str() {
                        on_frame(&frame);
                        handled += 1;
                    } else {
                        debug!("Link: ignoring frame on '{}'", frame.topic);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("Link: session lost ({e})");
                    self.mark_lost(now_ms);
                    return Err(LinkError::ConnectionLost);
                }
            }
        }
        Ok(handled)
    }

    // ── Publishing ────────────────────────────────────────────

    /// Non-blocking publish to an arbitrary topic.
    pub fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), PublishError> {
        self.admit(payload.len())?;
        let result = self.transport.publish(topic, payload, retain);
        self.account(result)
    }

    /// Non-blocking publish to the telemetry topic.
    pub fn publish_telemetry(&mut self, payload: &[u8]) -> Result<(), PublishError> {
        self.admit(payload.len())?;
        let result = self
            .transport
            .publish(&self.topics.telemetry, payload, false);
        self.account(result)
    }

    /// Publish the retained `offline` status and close the session.
    pub fn shutdown(&mut self) {
        if self.state == ConnectionState::Connected {
            self.announce(Presence::Offline);
            self.transport.disconnect();
            info!("Link: disconnected");
        }
        self.state = ConnectionState::Disconnected;
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    /// Earliest time the next connect attempt may start.
    pub fn next_attempt_ms(&self) -> u64 {
        self.backoff.next_attempt_ms()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    // ── Internal ──────────────────────────────────────────────

    fn status(&self, status: Presence) -> StatusMessage<'_> {
        StatusMessage {
            device_id: &self.client_id,
            status,
        }
    }

    fn announce(&mut self, presence: Presence) {
        let mut buf = [0u8; STATUS_BUF_CAP];
        let Ok(len) = encode_into(&self.status(presence), &mut buf) else {
            warn!("Link: status payload does not fit");
            return;
        };
        if let Err(e) = self.transport.publish(&self.topics.status, &buf[..len], true) {
            warn!("Link: status publish failed ({e})");
        }
    }

    fn admit(&mut self, len: usize) -> Result<(), PublishError> {
        let verdict = if self.state != ConnectionState::Connected {
            Err(PublishError::NotConnected)
        } else if len > self.max_payload {
            Err(PublishError::PayloadTooLarge {
                len,
                max: self.max_payload,
            })
        } else {
            Ok(())
        };
        if verdict.is_err() {
            self.stats.rejected = self.stats.rejected.saturating_add(1);
        }
        verdict
    }

    fn account(&mut self, result: Result<(), PublishError>) -> Result<(), PublishError> {
        match result {
            Ok(()) => self.stats.published = self.stats.published.saturating_add(1),
            Err(_) => self.stats.rejected = self.stats.rejected.saturating_add(1),
        }
        result
    }

    fn mark_lost(&mut self, now_ms: u64) {
        self.transport.disconnect();
        self.state = ConnectionState::Disconnected;
        self.stats.losses = self.stats.losses.saturating_add(1);
        self.backoff.retry_now(now_ms);
    }
}
