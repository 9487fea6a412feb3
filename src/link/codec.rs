//! JSON payloads carried over the link.
//!
//! ```text
//!  telemetry  {"device_id","timestamp","temperature","humidity","features":[…],
//!              "probability","class","actuator","label"}
//!  status     {"device_id","status":"online"|"offline"}   (retained)
//! ```
//!
//! Encoding writes straight into a caller-owned fixed buffer.  A payload
//! that does not fit is rejected with its full length, never truncated.

use std::io;

use serde::{Deserialize, Serialize};

use crate::config::{DeviceId, FeatureArray, Label};
use crate::error::{ParseError, PublishError};

/// One telemetry record (one per successful tick).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub device_id: DeviceId,
    /// Milliseconds since boot.
    pub timestamp: u64,
    pub temperature: f32,
    pub humidity: f32,
    /// Raw feature vector (N values).
    pub features: FeatureArray,
    #[serde(default)]
    pub probability: f32,
    #[serde(default)]
    pub class: u8,
    #[serde(default)]
    pub actuator: bool,
    #[serde(default)]
    pub label: Label,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    Online,
    Offline,
}

/// Retained presence message; `offline` doubles as the last will.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage<'a> {
    pub device_id: &'a str,
    pub status: Presence,
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// `io::Write` over a fixed slice that keeps counting past the end, so an
/// oversize payload reports its real length.
struct BoundedWriter<'b> {
    buf: &'b mut [u8],
    len: usize,
}

impl io::Write for BoundedWriter<'_> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let start = self.len.min(self.buf.len());
        let room = self.buf.len() - start;
        let n = data.len().min(room);
        self.buf[start..start + n].copy_from_slice(&data[..n]);
        self.len += data.len();
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Serialise `value` as JSON into `buf`.  Returns the encoded length.
pub fn encode_into<T: Serialize>(value: &T, buf: &mut [u8]) -> Result<usize, PublishError> {
    let max = buf.len();
    let mut w = BoundedWriter { buf, len: 0 };
    // BoundedWriter never errors; non-finite floats are written as null.
    serde_json::to_writer(&mut w, value).map_err(|_| PublishError::PayloadTooLarge { len: 0, max })?;
    if w.len > max {
        return Err(PublishError::PayloadTooLarge { len: w.len, max });
    }
    Ok(w.len)
}

pub fn decode_telemetry(bytes: &[u8]) -> Result<TelemetryRecord, ParseError> {
    serde_json::from_slice(bytes).map_err(|_| ParseError::Unrecognized)
}

pub fn decode_status(bytes: &[u8]) -> Result<StatusMessage<'_>, ParseError> {
    serde_json::from_slice(bytes).map_err(|_| ParseError::Unrecognized)
}
