//! Broker transport abstraction.
//!
//! The [`MessagingLink`](super::MessagingLink) is generic over
//! [`BrokerTransport`], so the connection state machine, backoff, and
//! inbound dispatch are identical whether frames travel over rumqttc, the
//! ESP-IDF MQTT client, an HTTP inference endpoint, or an in-memory test
//! double.
//!
//! Contract: only [`connect`](BrokerTransport::connect) may block, and only
//! for `connect_timeout_ms`.  Everything else returns immediately, except
//! the HTTP transport's telemetry publish, which waits for its reply under
//! the same bound.

use heapless::{String, Vec};

use crate::error::{LinkError, PublishError};

/// Largest inbound control frame accepted; longer frames are dropped.
pub const MAX_INBOUND_FRAME: usize = 256;

/// Last-will message registered with the broker at connect time.
#[derive(Debug, Clone, Copy)]
pub struct Will<'a> {
    pub topic: &'a str,
    pub payload: &'a [u8],
    pub retain: bool,
}

/// Everything a transport needs to open one session.
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions<'a> {
    pub client_id: &'a str,
    pub host: &'a str,
    pub port: u16,
    pub keep_alive_secs: u16,
    pub connect_timeout_ms: u32,
    pub will: Will<'a>,
}

/// One inbound message copied out of the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundFrame {
    pub topic: String<64>,
    pub payload: Vec<u8, MAX_INBOUND_FRAME>,
}

impl InboundFrame {
    /// Returns `None` when the topic or payload exceeds the fixed buffers.
    pub fn new(topic: &str, payload: &[u8]) -> Option<Self> {
        let mut t = String::new();
        t.push_str(topic).ok()?;
        let p = Vec::from_slice(payload).ok()?;
        Some(Self {
            topic: t,
            payload: p,
        })
    }
}

/// Framed publish/subscribe transport.
pub trait BrokerTransport {
    /// Open a session with the given will.  Blocks at most
    /// `opts.connect_timeout_ms`.
    fn connect(&mut self, opts: &SessionOptions<'_>) -> Result<(), LinkError>;

    /// Subscribe to `topic` on the current session.
    fn subscribe(&mut self, topic: &str) -> Result<(), LinkError>;

    /// Enqueue a publish without waiting for the broker.
    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), PublishError>;

    /// Next inbound frame if one is already available.
    /// `Ok(None)` = nothing pending; `Err(ConnectionLost)` = session gone.
    fn try_recv(&mut self) -> Result<Option<InboundFrame>, LinkError>;

    /// Close the session (best effort).
    fn disconnect(&mut self);
}

/// A transport with no broker behind it: every connect fails.
/// Useful when the node runs offline (local inference only).
pub struct NullTransport;

impl BrokerTransport for NullTransport {
    fn connect(&mut self, _opts: &SessionOptions<'_>) -> Result<(), LinkError> {
        Err(LinkError::Refused)
    }

    fn subscribe(&mut self, _topic: &str) -> Result<(), LinkError> {
        Err(LinkError::NotConnected)
    }

    fn publish(&mut self, _topic: &str, _payload: &[u8], _retain: bool) -> Result<(), PublishError> {
        Err(PublishError::NotConnected)
    }

    fn try_recv(&mut self) -> Result<Option<InboundFrame>, LinkError> {
        Ok(None)
    }

    fn disconnect(&mut self) {}
}
