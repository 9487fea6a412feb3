//! Application service — the hexagonal core.
//!
//! [`AppService`] owns the classifier, actuation controller, tick timer,
//! and the pre-sized telemetry buffer.  All I/O flows through port traits
//! and the [`MessagingLink`] passed in at call sites, so the whole pass is
//! testable with mock adapters.
//!
//! ```text
//!  SensorPort ──▶ ┌─────────────────────────┐ ──▶ EventSink
//!                 │       AppService        │
//! ActuatorPort ◀──│ classify · decide/apply │ ──▶ DisplayPort
//!                 └────────────┬────────────┘
//!                              ▼
//!                   MessagingLink<BrokerTransport>
//! ```

use log::{debug, warn};

use crate::actuation::{ActuationController, ActuatorState, Origin};
use crate::config::{DeviceConfig, TELEMETRY_BUF_CAP};
use crate::diagnostics::{RuntimeCounters, bump};
use crate::error::{PublishError, SensorError};
use crate::inference::{Classifier, FeatureVector, InferenceResult};
use crate::link::codec::{TelemetryRecord, encode_into};
use crate::link::transport::BrokerTransport;
use crate::link::{LinkEvent, MessagingLink};
use crate::scheduler::TickTimer;

use super::commands::{Directive, IgnoreReason, parse_frame, resolve};
use super::display::{
    self, DisplayLines, climate_line, command_line, decision_line, remote_probability_line,
    sensor_fault_line,
};
use super::events::{AppEvent, TelemetrySummary};
use super::ports::{ActuatorPort, DisplayPort, EventSink, SensorPort};

/// What the tick part of a pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickResult {
    /// Less than one period since the last tick.
    NotDue,
    Published,
    /// Sampling failed; nothing was inferred or published.
    SensorFault(SensorError),
    /// Inference ran but the telemetry could not be sent.
    PublishFailed(PublishError),
}

/// Summary of one scheduler pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassOutcome {
    pub link_event: Option<LinkEvent>,
    /// Control frames dispatched this pass.
    pub frames: usize,
    pub tick: TickResult,
}

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

pub struct AppService<'a> {
    config: &'a DeviceConfig,
    classifier: Classifier<'a>,
    actuation: ActuationController,
    timer: TickTimer,
    counters: RuntimeCounters,
    lines: DisplayLines,
    last_result: Option<InferenceResult>,
    telemetry_buf: [u8; TELEMETRY_BUF_CAP],
}

impl<'a> AppService<'a> {
    /// The first tick fires one period after `start_ms`.
    pub fn new(config: &'a DeviceConfig, start_ms: u64) -> Self {
        Self {
            config,
            classifier: Classifier::new(&config.model, config.decision_threshold),
            actuation: ActuationController::new(config),
            timer: TickTimer::new(config.tick_interval_ms, start_ms),
            counters: RuntimeCounters::default(),
            lines: DisplayLines::default(),
            last_result: None,
            telemetry_buf: [0; TELEMETRY_BUF_CAP],
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Drive the actuator to its initial (off) state and show a banner.
    pub fn start(&mut self, hw: &mut impl ActuatorPort, screen: &mut impl DisplayPort) {
        hw.set_actuator(self.actuation.state().on);
        self.lines.top = display::fit_str(&self.config.device_id);
        self.lines.bottom = display::fit_str("starting...");
        screen.show(&self.lines);
    }

    // ── Per-pass orchestration ────────────────────────────────

    /// One cooperative pass: link upkeep, inbound dispatch, then the
    /// tick work if a period has elapsed.
    pub fn run_pass<H, T, D, S>(
        &mut self,
        now_ms: u64,
        hw: &mut H,
        link: &mut MessagingLink<T>,
        screen: &mut D,
        sink: &mut S,
    ) -> PassOutcome
    where
        H: SensorPort + ActuatorPort,
        T: BrokerTransport,
        D: DisplayPort,
        S: EventSink,
    {
        self.actuation.begin_pass();

        // 1. Connection upkeep (the only step that may block).
        let link_event = link.service(now_ms);
        if let Some(ev) = link_event {
            sink.emit(&AppEvent::Link(ev));
        }

        // 2. Inbound control frames, handled before this pass's telemetry.
        let polled = link.poll(now_ms, |frame| {
            self.handle_frame(&frame.payload, now_ms, &mut *hw, &mut *screen, &mut *sink);
        });
        let frames = match polled {
            Ok(n) => n,
            Err(_) => {
                sink.emit(&AppEvent::Link(LinkEvent::ConnectionLost));
                0
            }
        };

        // 3. Tick work.
        let tick = if self.timer.fire(now_ms) {
            self.tick(now_ms, hw, link, screen, sink)
        } else {
            TickResult::NotDue
        };

        PassOutcome {
            link_event,
            frames,
            tick,
        }
    }

    // ── Control frames ────────────────────────────────────────

    /// Parse, resolve, and apply one inbound control frame.
    /// Returns the applied directive, or `None` if the frame did not parse.
    pub fn handle_frame(
        &mut self,
        raw: &[u8],
        now_ms: u64,
        hw: &mut impl ActuatorPort,
        screen: &mut impl DisplayPort,
        sink: &mut impl EventSink,
    ) -> Option<Directive> {
        bump(&mut self.counters.frames);
        let frame = match parse_frame(raw) {
            Ok(f) => f,
            Err(e) => {
                bump(&mut self.counters.parse_errors);
                warn!("Control frame dropped: {e}");
                sink.emit(&AppEvent::ParseFailed(e));
                return None;
            }
        };

        let resolution = resolve(&frame, &self.config.device_id);
        if resolution.unknown_command
            && resolution.directive != Directive::Ignore(IgnoreReason::UnknownCommand)
        {
            sink.emit(&AppEvent::UnknownCommand);
        }

        match resolution.directive {
            Directive::Actuate { on, source } => {
                bump(&mut self.counters.remote_commands);
                self.actuation.apply_remote(on, now_ms, hw);
                self.lines.bottom = command_line(on);
                screen.show(&self.lines);
                sink.emit(&AppEvent::CommandApplied { on, source });
            }
            Directive::ShowProbability(p) => {
                self.lines.bottom = remote_probability_line(p);
                screen.show(&self.lines);
                sink.emit(&AppEvent::RemoteProbability(p));
            }
            Directive::Ignore(reason) => {
                bump(&mut self.counters.ignored_commands);
                debug!("Control frame ignored: {reason:?}");
                sink.emit(&AppEvent::CommandIgnored(reason));
            }
        }
        Some(resolution.directive)
    }

    // ── Tick ──────────────────────────────────────────────────

    fn tick<H, T, D, S>(
        &mut self,
        now_ms: u64,
        hw: &mut H,
        link: &mut MessagingLink<T>,
        screen: &mut D,
        sink: &mut S,
    ) -> TickResult
    where
        H: SensorPort + ActuatorPort,
        T: BrokerTransport,
        D: DisplayPort,
        S: EventSink,
    {
        bump(&mut self.counters.ticks);

        // 1. Sample
        let reading = match hw.sample() {
            Ok(r) => r,
            Err(e) => {
                bump(&mut self.counters.sensor_faults);
                warn!("Sensor read failed: {e}; tick skipped");
                self.lines.bottom = sensor_fault_line();
                screen.show(&self.lines);
                sink.emit(&AppEvent::SensorFault(e));
                self.maybe_emit_stats(sink);
                return TickResult::SensorFault(e);
            }
        };
        let aux = hw.auxiliary();

        // 2. Predict
        let raw = FeatureVector::from_reading(&self.config.model, &reading);
        let result = self.classifier.predict(&raw);
        self.last_result = Some(result);
        bump(&mut self.counters.inferences);

        // 3. Decide + apply
        let decision = self.actuation.decide(result.probability, &aux);
        let applied = self.actuation.apply(decision.class, now_ms, hw);

        let state = self.actuation.state();
        self.lines.top = climate_line(&reading);
        self.lines.bottom = if self.actuation.origin() == Origin::Remote {
            command_line(state.on)
        } else {
            decision_line(result.probability, &state.label)
        };
        screen.show(&self.lines);

        // 4. Telemetry
        let record = TelemetryRecord {
            device_id: self.config.device_id.clone(),
            timestamp: now_ms,
            temperature: reading.temperature,
            humidity: reading.humidity,
            features: raw.values().clone(),
            probability: result.probability,
            class: decision.class,
            actuator: state.on,
            label: state.label.clone(),
        };
        let sent = encode_into(&record, &mut self.telemetry_buf)
            .and_then(|len| link.publish_telemetry(&self.telemetry_buf[..len]));

        let tick = match sent {
            Ok(()) => {
                bump(&mut self.counters.published);
                TickResult::Published
            }
            Err(e) => {
                bump(&mut self.counters.publish_failures);
                if e == PublishError::NotConnected {
                    debug!("Telemetry not sent: offline");
                } else {
                    warn!("Telemetry not sent: {e}");
                }
                sink.emit(&AppEvent::PublishFailed(e));
                TickResult::PublishFailed(e)
            }
        };

        sink.emit(&AppEvent::Telemetry(TelemetrySummary {
            timestamp: now_ms,
            temperature: reading.temperature,
            humidity: reading.humidity,
            probability: result.probability,
            class: decision.class,
            gate_mask: decision.gate.mask,
            actuator_on: record.actuator,
            applied,
            published: tick == TickResult::Published,
        }));
        self.maybe_emit_stats(sink);
        tick
    }

    fn maybe_emit_stats(&self, sink: &mut impl EventSink) {
        let every = self.config.stats_interval_ticks;
        if every > 0 && self.counters.ticks % every == 0 {
            sink.emit(&AppEvent::Stats(self.counters));
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn counters(&self) -> RuntimeCounters {
        self.counters
    }

    pub fn actuator_state(&self) -> &ActuatorState {
        self.actuation.state()
    }

    pub fn last_result(&self) -> Option<InferenceResult> {
        self.last_result
    }

    pub fn display_lines(&self) -> &DisplayLines {
        &self.lines
    }

    /// Milliseconds until the next tick is due.
    pub fn next_tick_in(&self, now_ms: u64) -> u64 {
        self.timer.due_in(now_ms)
    }

    pub fn config(&self) -> &'a DeviceConfig {
        self.config
    }
}
