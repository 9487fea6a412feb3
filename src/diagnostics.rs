//! Runtime diagnostics.
//!
//! Plain counters bumped by the scheduler pass and logged periodically
//! (every `stats_interval_ticks` ticks) through the event sink.  They
//! never reset while the node runs.

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeCounters {
    pub ticks: u32,
    pub sensor_faults: u32,
    pub inferences: u32,
    pub published: u32,
    pub publish_failures: u32,
    pub frames: u32,
    pub parse_errors: u32,
    pub ignored_commands: u32,
    pub remote_commands: u32,
}

/// Saturating increment.
#[inline]
pub fn bump(counter: &mut u32) {
    *counter = counter.saturating_add(1);
}

impl RuntimeCounters {
    /// Fraction of ticks that produced a valid reading.
    pub fn sensor_success_rate(&self) -> f32 {
        if self.ticks == 0 {
            return 1.0;
        }
        self.ticks.saturating_sub(self.sensor_faults) as f32 / self.ticks as f32
    }
}
