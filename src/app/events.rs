//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them (log to serial, record in tests, …).

use crate::diagnostics::RuntimeCounters;
use crate::error::{ParseError, PublishError, SensorError};
use crate::link::LinkEvent;

use super::commands::{CommandSource, IgnoreReason};

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// One completed tick (telemetry may or may not have been published).
    Telemetry(TelemetrySummary),

    /// The sensor produced no usable reading; the tick was skipped.
    SensorFault(SensorError),

    /// The broker session changed.
    Link(LinkEvent),

    /// A remote command drove the actuator.
    CommandApplied { on: bool, source: CommandSource },

    /// A remote probability was shown on the display.
    RemoteProbability(f32),

    /// A well-formed control frame had nothing to apply.
    CommandIgnored(IgnoreReason),

    /// A control frame carried a `command` that is neither ON nor OFF.
    UnknownCommand,

    /// A control frame could not be parsed at all.
    ParseFailed(ParseError),

    /// Telemetry could not be encoded or enqueued.
    PublishFailed(PublishError),

    /// Periodic counter snapshot.
    Stats(RuntimeCounters),
}

/// What one tick produced, for logging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetrySummary {
    pub timestamp: u64,
    pub temperature: f32,
    pub humidity: f32,
    pub probability: f32,
    pub class: u8,
    /// Bit *i* set when gate condition *i* held.
    pub gate_mask: u8,
    pub actuator_on: bool,
    /// `false` while a remote hold kept the actuator unchanged.
    pub applied: bool,
    pub published: bool,
}
