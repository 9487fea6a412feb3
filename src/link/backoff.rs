//! Reconnect backoff kept as plain data.
//!
//! The link never sleeps between attempts: it asks [`Backoff::ready`] on
//! every pass and only tries again once the deadline has passed.  The
//! exponential policy doubles after each failure (2 s → 4 s → 8 s …)
//! and is capped; a successful connect resets it.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackoffPolicy {
    /// Same delay after every failure.
    Fixed { delay_ms: u32 },
    /// Start at `initial_ms`, double per failure, never exceed `max_ms`.
    Exponential { initial_ms: u32, max_ms: u32 },
}

impl BackoffPolicy {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Self::Fixed { delay_ms } if delay_ms == 0 => {
                Err(ConfigError::OutOfRange("backoff.delay_ms"))
            }
            Self::Exponential { initial_ms, max_ms } if initial_ms == 0 || max_ms < initial_ms => {
                Err(ConfigError::OutOfRange("backoff.initial_ms"))
            }
            _ => Ok(()),
        }
    }

    fn initial_ms(&self) -> u32 {
        match *self {
            Self::Fixed { delay_ms } => delay_ms,
            Self::Exponential { initial_ms, .. } => initial_ms,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Backoff {
    policy: BackoffPolicy,
    /// Delay applied to the next failure.
    current_ms: u32,
    /// Earliest time another attempt may start.
    next_attempt_ms: u64,
    /// Consecutive failures since the last success.
    failures: u32,
}

impl Backoff {
    /// A fresh backoff allows an attempt immediately.
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            policy,
            current_ms: policy.initial_ms(),
            next_attempt_ms: 0,
            failures: 0,
        }
    }

    pub fn ready(&self, now_ms: u64) -> bool {
        now_ms >= self.next_attempt_ms
    }

    /// Record a failed attempt at `now_ms`; returns the delay until the next one.
    pub fn on_failure(&mut self, now_ms: u64) -> u32 {
        let delay = self.current_ms;
        self.next_attempt_ms = now_ms + u64::from(delay);
        self.failures = self.failures.saturating_add(1);
        if let BackoffPolicy::Exponential { max_ms, .. } = self.policy {
            self.current_ms = self.current_ms.saturating_mul(2).min(max_ms);
        }
        delay
    }

    /// Successful connect: next failure starts from the initial delay again.
    pub fn reset(&mut self) {
        self.current_ms = self.policy.initial_ms();
        self.failures = 0;
    }

    /// Allow an attempt right away (used after losing an established session).
    pub fn retry_now(&mut self, now_ms: u64) {
        self.next_attempt_ms = now_ms;
    }

    pub fn next_attempt_ms(&self) -> u64 {
        self.next_attempt_ms
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }
}
