//! Tick timer for the cooperative main loop.
//!
//! ```text
//!  ┌──────────────────────── one pass ────────────────────────┐
//!  │ link.service()  ─▶  link.poll() ─▶ handle control frames │
//!  │                                                          │
//!  │ timer.fire(now)?  ── no ──▶ done                         │
//!  │        │ yes                                             │
//!  │        ▼                                                 │
//!  │ sample ─▶ predict ─▶ decide/apply ─▶ publish telemetry   │
//!  └──────────────────────────────────────────────────────────┘
//!            main.rs sleeps poll_interval_ms between passes
//! ```
//!
//! The deadline is plain data: the timer is re-armed from the time it
//! actually fired, so a late pass shifts later ticks instead of bursting
//! to catch up.

/// Fixed-period tick timer.
#[derive(Debug, Clone)]
pub struct TickTimer {
    period_ms: u64,
    /// Time of the last fire.
    last_ms: u64,
    fires: u64,
}

impl TickTimer {
    /// First fire happens one full period after `start_ms`.
    pub fn new(period_ms: u32, start_ms: u64) -> Self {
        Self {
            period_ms: u64::from(period_ms.max(1)),
            last_ms: start_ms,
            fires: 0,
        }
    }

    /// True (and re-armed) when at least one period has elapsed.
    pub fn fire(&mut self, now_ms: u64) -> bool {
        if now_ms.saturating_sub(self.last_ms) < self.period_ms {
            return false;
        }
        self.last_ms = now_ms;
        self.fires += 1;
        true
    }

    /// Milliseconds until the next fire (0 if already due).
    pub fn due_in(&self, now_ms: u64) -> u64 {
        (self.last_ms + self.period_ms).saturating_sub(now_ms)
    }

    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }

    /// Number of times the timer has fired.
    pub fn fires(&self) -> u64 {
        self.fires
    }
}
