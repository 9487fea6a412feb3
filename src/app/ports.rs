//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (sensors, actuator, display, event sinks) implement
//! these traits.  The [`AppService`](super::service::AppService) consumes
//! them via generics, so the domain core never touches hardware directly.
//! The broker side has its own seam,
//! [`BrokerTransport`](crate::link::transport::BrokerTransport).

use crate::error::SensorError;
use crate::sensors::{AuxReadings, SensorReading};

use super::display::DisplayLines;
use super::events::AppEvent;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the domain calls this once per tick.
pub trait SensorPort {
    /// One validated climate reading.  Bounded latency; no retries.
    fn sample(&mut self) -> Result<SensorReading, SensorError>;

    /// Current auxiliary channel values for the decision gate.
    fn auxiliary(&mut self) -> AuxReadings;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port for the single on/off actuator.
pub trait ActuatorPort {
    fn set_actuator(&mut self, on: bool);

    fn is_actuator_on(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Display port (driven adapter: domain → 16x2 character display)
// ───────────────────────────────────────────────────────────────

pub trait DisplayPort {
    fn show(&mut self, lines: &DisplayLines);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`]s through this port.  Adapters
/// decide where they go (serial log, test recorder, …).
pub trait EventSink {
    fn emit(&mut self, event: &AppEvent);
}
