//! Composite decision gate over auxiliary sensor channels.
//!
//! Conditions are evaluated into a bitmask (bit *i* set = condition *i*
//! held) so the controller can log exactly which ones changed between
//! ticks.  A channel with no reading never satisfies a condition.

use heapless::Vec;
use serde::{Deserialize, Serialize};

use crate::sensors::AuxReadings;

/// Most conditions a single gate can combine (one bit each in a `u8`).
pub const MAX_CONDITIONS: usize = 8;

pub type Conditions = Vec<Condition, MAX_CONDITIONS>;

/// A single predicate over one auxiliary channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    /// Channel value strictly above `threshold`.
    Above { channel: u8, threshold: f32 },
    /// Channel value strictly below `threshold`.
    Below { channel: u8, threshold: f32 },
    /// Digital channel asserted (value >= 0.5).
    Flag { channel: u8 },
}

impl Condition {
    pub fn holds(&self, aux: &AuxReadings) -> bool {
        match *self {
            Self::Above { channel, threshold } => aux.get(channel).is_some_and(|v| v > threshold),
            Self::Below { channel, threshold } => aux.get(channel).is_some_and(|v| v < threshold),
            Self::Flag { channel } => aux.get(channel).is_some_and(|v| v >= 0.5),
        }
    }
}

/// How a satisfied gate combines with the probability threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateMode {
    /// Positive class needs the threshold **and** the gate.
    Require,
    /// Gate alone forces the positive class.
    Override,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Gate {
    /// Threshold only.
    Open,
    /// Every condition must hold.
    All { conditions: Conditions, mode: GateMode },
    /// At least one condition must hold.
    Any { conditions: Conditions, mode: GateMode },
}

/// Result of evaluating a gate against one set of aux readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateEval {
    /// Bit *i* set when condition *i* held.
    pub mask: u8,
    /// Whether the gate as a whole is satisfied.
    pub satisfied: bool,
}

impl Gate {
    pub fn open() -> Self {
        Self::Open
    }

    /// Conditions beyond [`MAX_CONDITIONS`] are dropped.
    pub fn all(conditions: &[Condition], mode: GateMode) -> Self {
        Self::All {
            conditions: conditions.iter().copied().take(MAX_CONDITIONS).collect(),
            mode,
        }
    }

    /// Conditions beyond [`MAX_CONDITIONS`] are dropped.
    pub fn any(conditions: &[Condition], mode: GateMode) -> Self {
        Self::Any {
            conditions: conditions.iter().copied().take(MAX_CONDITIONS).collect(),
            mode,
        }
    }

    pub fn mode(&self) -> Option<GateMode> {
        match self {
            Self::Open => None,
            Self::All { mode, .. } | Self::Any { mode, .. } => Some(*mode),
        }
    }

    pub fn evaluate(&self, aux: &AuxReadings) -> GateEval {
        let (conditions, need_all) = match self {
            Self::Open => {
                return GateEval {
                    mask: 0,
                    satisfied: true,
                };
            }
            Self::All { conditions, .. } => (conditions, true),
            Self::Any { conditions, .. } => (conditions, false),
        };

        let mask = conditions
            .iter()
            .enumerate()
            .filter(|(_, c)| c.holds(aux))
            .fold(0u8, |m, (i, _)| m | (1 << i));

        let full = if conditions.len() >= 8 {
            u8::MAX
        } else {
            (1u8 << conditions.len()) - 1
        };
        let satisfied = if need_all {
            mask == full
        } else {
            mask != 0
        };
        GateEval { mask, satisfied }
    }

    /// Final positive/negative decision for a probability that already
    /// has (or lacks) the threshold.
    pub fn combine(&self, above_threshold: bool, eval: GateEval) -> bool {
        match self.mode() {
            None => above_threshold,
            Some(GateMode::Require) => above_threshold && eval.satisfied,
            Some(GateMode::Override) => above_threshold || eval.satisfied,
        }
    }
}
