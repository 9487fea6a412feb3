//! Inbound control frames (broker messages or HTTP inference replies).
//!
//! Two steps, both pure:
//!
//! 1. [`parse_frame`] turns raw bytes into a [`ControlFrame`]: a JSON
//!    object first (arrays and scalars are not control messages),
//!    otherwise a bare `ON` / `OFF` token (case-insensitive, surrounding
//!    whitespace ignored).
//! 2. [`resolve`] turns a frame into a [`Directive`] for this device.
//!    Field priority: `command` > `prediction` > `probability`
//!    (the last only updates the display).
//!
//! The [`AppService`](super::service::AppService) applies the directive.

use std::borrow::Cow;

use serde::Deserialize;

use crate::error::ParseError;

/// Structured control message.  Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ControlCommand<'a> {
    #[serde(borrow, default)]
    pub device_id: Option<Cow<'a, str>>,
    #[serde(borrow, default)]
    pub command: Option<Cow<'a, str>>,
    /// Remote class; values ≥ 0.5 mean ON.
    #[serde(default)]
    pub prediction: Option<f64>,
    /// Remote probability, display only.
    #[serde(default)]
    pub probability: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControlFrame<'a> {
    Structured(ControlCommand<'a>),
    /// Plain-text `ON` (`true`) / `OFF` (`false`).
    Legacy(bool),
}

/// Which field produced an actuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandSource {
    Command,
    Prediction,
    Legacy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// `device_id` names another node.
    ForeignDevice,
    /// No `command`, `prediction`, or `probability` present.
    NoActionableField,
    /// `command` was not ON/OFF and nothing else was usable.
    UnknownCommand,
    /// `probability` outside [0, 1].
    InvalidProbability,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Directive {
    Actuate { on: bool, source: CommandSource },
    ShowProbability(f32),
    Ignore(IgnoreReason),
}

/// Result of [`resolve`].  `unknown_command` is set whenever a `command`
/// field was present but unusable, even if a lower-priority field acted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub directive: Directive,
    pub unknown_command: bool,
}

/// Remote class threshold for `prediction`.
const PREDICTION_ON: f64 = 0.5;

fn on_off(token: &str) -> Option<bool> {
    let t = token.trim();
    if t.eq_ignore_ascii_case("ON") {
        Some(true)
    } else if t.eq_ignore_ascii_case("OFF") {
        Some(false)
    } else {
        None
    }
}

pub fn parse_frame(raw: &[u8]) -> Result<ControlFrame<'_>, ParseError> {
    let text = core::str::from_utf8(raw).map_err(|_| ParseError::NotUtf8)?;
    if text.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    // The derived struct visitor also takes sequences; only objects count.
    if text.trim_start().starts_with('{') {
        if let Ok(cmd) = serde_json::from_str::<ControlCommand<'_>>(text) {
            return Ok(ControlFrame::Structured(cmd));
        }
    }
    on_off(text)
        .map(ControlFrame::Legacy)
        .ok_or(ParseError::Unrecognized)
}

pub fn resolve(frame: &ControlFrame<'_>, local_device_id: &str) -> Resolution {
    let cmd = match frame {
        ControlFrame::Legacy(on) => {
            return Resolution {
                directive: Directive::Actuate {
                    on: *on,
                    source: CommandSource::Legacy,
                },
                unknown_command: false,
            };
        }
        ControlFrame::Structured(cmd) => cmd,
    };

    let ignore = |reason| Resolution {
        directive: Directive::Ignore(reason),
        unknown_command: false,
    };

    if cmd.device_id.as_deref().is_some_and(|id| id != local_device_id) {
        return ignore(IgnoreReason::ForeignDevice);
    }

    let command = cmd.command.as_deref().map(on_off);
    let unknown_command = matches!(command, Some(None));
    let act = |on, source| Resolution {
        directive: Directive::Actuate { on, source },
        unknown_command,
    };

    if let Some(Some(on)) = command {
        return act(on, CommandSource::Command);
    }
    if let Some(p) = cmd.prediction {
        return act(p >= PREDICTION_ON, CommandSource::Prediction);
    }
    if let Some(p) = cmd.probability {
        let directive = if (0.0..=1.0).contains(&p) {
            Directive::ShowProbability(p as f32)
        } else {
            Directive::Ignore(IgnoreReason::InvalidProbability)
        };
        return Resolution {
            directive,
            unknown_command,
        };
    }
    Resolution {
        directive: Directive::Ignore(if unknown_command {
            IgnoreReason::UnknownCommand
        } else {
            IgnoreReason::NoActionableField
        }),
        unknown_command,
    }
}
