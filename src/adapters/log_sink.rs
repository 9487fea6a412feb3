//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the `log` facade (ESP-IDF logger on the device, `tracing-subscriber`
//! on the host).  One line per event, prefixed by its category.

use core::fmt::Write;

use heapless::String;
use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::diagnostics::RuntimeCounters;
use crate::link::LinkEvent;

const STATS_LINE_CAP: usize = 256;

/// Adapter that logs every [`AppEvent`] to the console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(t) => {
                info!(
                    "TELEM | t={}ms | T={:.1}\u{00b0}C RH={:.1}% | p={:.4} class={} gate=0b{:04b} | \
                     actuator={}{} | {}",
                    t.timestamp,
                    t.temperature,
                    t.humidity,
                    t.probability,
                    t.class,
                    t.gate_mask,
                    if t.actuator_on { "ON" } else { "OFF" },
                    if t.applied { "" } else { " (held)" },
                    if t.published { "published" } else { "not published" },
                );
            }
            AppEvent::SensorFault(e) => {
                warn!("SENSOR | {e}, tick skipped");
            }
            AppEvent::Link(LinkEvent::Connected) => {
                info!("LINK | connected");
            }
            AppEvent::Link(LinkEvent::ConnectFailed { error, retry_in_ms }) => {
                warn!("LINK | connect failed ({error}), retry in {retry_in_ms} ms");
            }
            AppEvent::Link(LinkEvent::ConnectionLost) => {
                warn!("LINK | connection lost");
            }
            AppEvent::CommandApplied { on, source } => {
                info!("CMD | {} via {:?}", if *on { "ON" } else { "OFF" }, source);
            }
            AppEvent::RemoteProbability(p) => {
                info!("CMD | remote probability {p:.2}");
            }
            AppEvent::CommandIgnored(reason) => {
                info!("CMD | ignored: {reason:?}");
            }
            AppEvent::UnknownCommand => {
                warn!("CMD | unknown command value");
            }
            AppEvent::ParseFailed(e) => {
                warn!("CMD | unparseable frame: {e}");
            }
            AppEvent::PublishFailed(e) => {
                info!("TELEM | publish failed: {e}");
            }
            AppEvent::Stats(c) => {
                info!("{}", stats_line(c));
            }
        }
    }
}

/// One `STATS` record.  Counters are `u32`, so the line always fits.
pub fn stats_line(c: &RuntimeCounters) -> String<STATS_LINE_CAP> {
    let mut line = String::new();
    let _ = write!(
        line,
        "STATS | ticks={} sensor_faults={} sensor_ok={:.0}% inferences={} published={} \
         publish_failures={} frames={} parse_errors={} ignored={} remote={}",
        c.ticks,
        c.sensor_faults,
        c.sensor_success_rate() * 100.0,
        c.inferences,
        c.published,
        c.publish_failures,
        c.frames,
        c.parse_errors,
        c.ignored_commands,
        c.remote_commands,
    );
    line
}
