//! Actuation controller.
//!
//! Turns a probability (plus auxiliary readings) into a class, and a class
//! into an [`ActuatorState`].  It is the only place local inference may
//! change the actuator; remote commands enter through [`apply_remote`],
//! which also starts a hold window during which local decisions are
//! computed and reported but not applied.  A remote command also wins
//! over the local decision of the pass it arrived in, even when the hold
//! window is zero.
//!
//! [`apply_remote`]: ActuationController::apply_remote

pub mod gate;

use log::{debug, info};

use crate::app::ports::ActuatorPort;
use crate::config::{DeviceConfig, Label};
use crate::sensors::AuxReadings;

use self::gate::{Gate, GateEval};

/// Labels used for remote commands.
pub const REMOTE_ON_LABEL: &str = "ON";
pub const REMOTE_OFF_LABEL: &str = "OFF";

/// What the actuator is doing and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActuatorState {
    pub on: bool,
    pub label: Label,
}

impl ActuatorState {
    fn with(on: bool, label: &str) -> Self {
        let mut l = Label::new();
        // Labels are validated against the same capacity in config.
        let _ = l.push_str(label);
        Self { on, label: l }
    }
}

/// Where the current actuator state came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Nothing applied yet.
    Boot,
    Local,
    Remote,
}

/// Result of [`ActuationController::decide`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// 1 = positive class.
    pub class: u8,
    pub gate: GateEval,
}

pub struct ActuationController {
    threshold: f32,
    gate: Gate,
    positive_label: Label,
    negative_label: Label,
    remote_hold_ms: u64,
    state: ActuatorState,
    origin: Origin,
    /// Local inference is suppressed until this time.
    hold_until_ms: Option<u64>,
    /// A remote command was applied since the last [`begin_pass`].
    ///
    /// [`begin_pass`]: ActuationController::begin_pass
    remote_this_pass: bool,
    /// Last gate mask, for change logging.
    last_mask: u8,
}

impl ActuationController {
    pub fn new(config: &DeviceConfig) -> Self {
        Self {
            threshold: config.decision_threshold,
            gate: config.gate.clone(),
            positive_label: config.positive_label.clone(),
            negative_label: config.negative_label.clone(),
            remote_hold_ms: u64::from(config.remote_hold_ms),
            state: ActuatorState {
                on: false,
                label: config.negative_label.clone(),
            },
            origin: Origin::Boot,
            hold_until_ms: None,
            remote_this_pass: false,
            last_mask: 0,
        }
    }

    /// Class for a probability given the current auxiliary readings.
    pub fn decide(&mut self, probability: f32, aux: &AuxReadings) -> Decision {
        let eval = self.gate.evaluate(aux);
        if eval.mask != self.last_mask {
            debug!(
                "Gate conditions changed: 0b{:08b} -> 0b{:08b}",
                self.last_mask, eval.mask
            );
            self.last_mask = eval.mask;
        }
        let positive = self.gate.combine(probability >= self.threshold, eval);
        Decision {
            class: u8::from(positive),
            gate: eval,
        }
    }

    /// Mark the start of a scheduler pass.
    pub fn begin_pass(&mut self) {
        self.remote_this_pass = false;
    }

    /// Apply a locally inferred class.  Returns `false` (and leaves the
    /// actuator alone) while a remote hold is active or a remote command
    /// arrived earlier in the same pass.
    pub fn apply(&mut self, class: u8, now_ms: u64, port: &mut impl ActuatorPort) -> bool {
        if self.remote_this_pass || self.is_held(now_ms) {
            return false;
        }
        self.hold_until_ms = None;
        let on = class != 0;
        let label = if on {
            &self.positive_label
        } else {
            &self.negative_label
        };
        let next = ActuatorState {
            on,
            label: label.clone(),
        };
        self.set(next, Origin::Local, port);
        true
    }

    /// Apply a remote ON/OFF command and start the hold window.
    pub fn apply_remote(&mut self, on: bool, now_ms: u64, port: &mut impl ActuatorPort) {
        let label = if on { REMOTE_ON_LABEL } else { REMOTE_OFF_LABEL };
        self.set(ActuatorState::with(on, label), Origin::Remote, port);
        self.remote_this_pass = true;
        self.hold_until_ms = (self.remote_hold_ms > 0).then(|| now_ms + self.remote_hold_ms);
    }

    pub fn state(&self) -> &ActuatorState {
        &self.state
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn is_held(&self, now_ms: u64) -> bool {
        self.hold_until_ms.is_some_and(|until| now_ms < until)
    }

    // ── Internal ──────────────────────────────────────────────

    fn set(&mut self, next: ActuatorState, origin: Origin, port: &mut impl ActuatorPort) {
        if next.on != self.state.on || origin != self.origin {
            info!(
                "Actuator {} ({}, {:?})",
                if next.on { "ON" } else { "OFF" },
                next.label,
                origin
            );
        }
        port.set_actuator(next.on);
        self.state = next;
        self.origin = origin;
    }
}
