//! HTTP inference transport adapter (host builds).
//!
//! Alternative to MQTT for deployments with a REST inference server
//! instead of a broker.  Telemetry is POSTed as JSON to a fixed endpoint
//! and the reply body (`{"prediction":1,"probability":0.91,...}`) is
//! queued as a control frame, so it reaches the same control path as a
//! broker message on the next poll:
//!
//! ```text
//!   publish(telemetry) ── POST endpoint ──▶ 2xx body ──▶ reply queue
//!   try_recv()         ◀───────────────────────────────── pop (control topic)
//! ```
//!
//! HTTP has no session, so `connect` only builds the client.  Status
//! (presence) publishes have no HTTP counterpart and are accepted without
//! a request.  Unlike the broker transports, a telemetry publish waits
//! for the reply, bounded by the connect timeout.  A failed POST marks
//! the transport lost; the link reconnects on its next pass.

use std::collections::VecDeque;
use std::time::Duration;

use log::{debug, info, warn};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;

use crate::config::Topics;
use crate::error::{LinkError, PublishError};
use crate::link::transport::{BrokerTransport, InboundFrame, SessionOptions};

/// Replies waiting for the next poll.
const MAX_PENDING_REPLIES: usize = 4;

pub struct HttpTransport {
    endpoint: String,
    telemetry_topic: String,
    control_topic: String,
    client: Option<Client>,
    replies: VecDeque<InboundFrame>,
    lost: bool,
}

impl HttpTransport {
    pub fn new(endpoint: &str, topics: &Topics) -> Self {
        Self {
            endpoint: endpoint.to_owned(),
            telemetry_topic: topics.telemetry.as_str().to_owned(),
            control_topic: topics.control.as_str().to_owned(),
            client: None,
            replies: VecDeque::with_capacity(MAX_PENDING_REPLIES),
            lost: false,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn pending_replies(&self) -> usize {
        self.replies.len()
    }

    fn queue_reply(&mut self, body: &[u8]) {
        if body.iter().all(u8::is_ascii_whitespace) {
            return;
        }
        let Some(frame) = InboundFrame::new(&self.control_topic, body) else {
            warn!("HTTP: dropped {}-byte reply (too large)", body.len());
            return;
        };
        if self.replies.len() >= MAX_PENDING_REPLIES {
            warn!("HTTP: reply queue full, dropping oldest");
            self.replies.pop_front();
        }
        self.replies.push_back(frame);
    }
}

impl BrokerTransport for HttpTransport {
    fn connect(&mut self, opts: &SessionOptions<'_>) -> Result<(), LinkError> {
        self.disconnect();
        let client = Client::builder()
            .timeout(Duration::from_millis(u64::from(opts.connect_timeout_ms)))
            .build()
            .map_err(|e| {
                warn!("HTTP: client setup failed: {e}");
                LinkError::Io
            })?;
        info!("HTTP: posting telemetry to {}", self.endpoint);
        self.client = Some(client);
        Ok(())
    }

    fn subscribe(&mut self, _topic: &str) -> Result<(), LinkError> {
        if self.client.is_none() {
            return Err(LinkError::NotConnected);
        }
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8], _retain: bool) -> Result<(), PublishError> {
        let client = self.client.as_ref().ok_or(PublishError::NotConnected)?;
        if topic != self.telemetry_topic {
            debug!("HTTP: no request for '{topic}'");
            return Ok(());
        }

        let response = client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(payload.to_vec())
            .send();

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                warn!("HTTP: POST {} failed: {e}", self.endpoint);
                self.lost = true;
                return Err(PublishError::Io);
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!("HTTP: server answered {status}; reply ignored");
            return Ok(());
        }
        match response.bytes() {
            Ok(body) => {
                debug!("HTTP: {status}, {} byte reply", body.len());
                self.queue_reply(&body);
                Ok(())
            }
            Err(e) => {
                warn!("HTTP: reading reply failed: {e}");
                self.lost = true;
                Err(PublishError::Io)
            }
        }
    }

    fn try_recv(&mut self) -> Result<Option<InboundFrame>, LinkError> {
        if self.client.is_none() {
            return Err(LinkError::NotConnected);
        }
        if let Some(frame) = self.replies.pop_front() {
            return Ok(Some(frame));
        }
        if self.lost {
            self.disconnect();
            return Err(LinkError::ConnectionLost);
        }
        Ok(None)
    }

    fn disconnect(&mut self) {
        self.client = None;
        self.replies.clear();
        self.lost = false;
    }
}
