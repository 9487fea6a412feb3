//! Unified error types for the node.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! scheduler's error handling uniform.  All variants are `Copy` so they can
//! be passed through the pass outcome and event sink without allocation.
//!
//! None of these conditions is fatal: the scheduler logs them, bumps a
//! counter, and carries on with the next pass.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The sensor could not produce a usable reading this tick.
    Sensor(SensorError),
    /// An inbound control frame could not be parsed.
    Parse(ParseError),
    /// The messaging link failed to connect or lost the broker.
    Link(LinkError),
    /// An outbound publish was rejected.
    Publish(PublishError),
    /// Configuration is invalid.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Parse(e) => write!(f, "parse: {e}"),
            Self::Link(e) => write!(f, "link: {e}"),
            Self::Publish(e) => write!(f, "publish: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// Value was NaN, infinite, or outside the physically plausible range.
    InvalidReading,
    /// The sensor did not answer within its protocol timing window.
    Timeout,
    /// The frame arrived but its checksum did not match.
    Checksum,
    /// The underlying pin or bus reported an error.
    Bus,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidReading => write!(f, "invalid reading"),
            Self::Timeout => write!(f, "sensor timeout"),
            Self::Checksum => write!(f, "checksum mismatch"),
            Self::Bus => write!(f, "bus error"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Control-frame parse errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// Frame was empty (or only whitespace).
    Empty,
    /// Frame was not valid UTF-8.
    NotUtf8,
    /// Frame was neither a JSON object nor a legacy ON/OFF token.
    Unrecognized,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty frame"),
            Self::NotUtf8 => write!(f, "frame is not UTF-8"),
            Self::Unrecognized => write!(f, "neither JSON nor ON/OFF token"),
        }
    }
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

// ---------------------------------------------------------------------------
// Link errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// The broker could not be reached within the connect timeout.
    Timeout,
    /// The broker answered but refused the session.
    Refused,
    /// Transport-level I/O failure.
    Io,
    /// An established connection dropped.
    ConnectionLost,
    /// Operation requires a connected session.
    NotConnected,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "connect timed out"),
            Self::Refused => write!(f, "broker refused connection"),
            Self::Io => write!(f, "transport I/O error"),
            Self::ConnectionLost => write!(f, "connection lost"),
            Self::NotConnected => write!(f, "not connected"),
        }
    }
}

impl From<LinkError> for Error {
    fn from(e: LinkError) -> Self {
        Self::Link(e)
    }
}

// ---------------------------------------------------------------------------
// Publish errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishError {
    /// Payload exceeds the bounded outbound buffer.
    PayloadTooLarge { len: usize, max: usize },
    /// Not connected; nothing was enqueued.
    NotConnected,
    /// The transport's outbound queue is full.
    QueueFull,
    /// The request left but the transport failed (HTTP POST error).
    Io,
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PayloadTooLarge { len, max } => {
                write!(f, "payload too large ({len} > {max} bytes)")
            }
            Self::NotConnected => write!(f, "not connected"),
            Self::QueueFull => write!(f, "outbound queue full"),
            Self::Io => write!(f, "transport I/O error"),
        }
    }
}

impl From<PublishError> for Error {
    fn from(e: PublishError) -> Self {
        Self::Publish(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// MEAN/STD/WEIGHTS lengths disagree, or N is zero or above capacity.
    ModelShape,
    /// A model coefficient is NaN or infinite.
    NonFinite,
    /// A scalar field is outside its allowed range.
    /// The `&'static str` names the field.
    OutOfRange(&'static str),
    /// A string field does not fit its fixed-capacity buffer.
    TooLong(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModelShape => write!(f, "model arrays have inconsistent length"),
            Self::NonFinite => write!(f, "model contains non-finite coefficient"),
            Self::OutOfRange(field) => write!(f, "{field} out of range"),
            Self::TooLong(field) => write!(f, "{field} too long"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
