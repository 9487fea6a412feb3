//! Hardware adapter — bridges peripherals to domain port traits.
//!
//! Owns the [`SensorHub`] and the actuator driver, exposing them through
//! [`SensorPort`] and [`ActuatorPort`] as one value so the service can
//! take `&mut (impl SensorPort + ActuatorPort)` without a double borrow.
//! On the host the hub and driver are built on simulated pins.

use embedded_hal::digital::OutputPin;

use crate::app::ports::{ActuatorPort, SensorPort};
use crate::drivers::led::LedDriver;
use crate::error::SensorError;
use crate::sensors::{AuxReadings, AuxSource, ClimateSource, SensorHub, SensorReading};

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter<C, F, P> {
    sensor_hub: SensorHub<C, F>,
    actuator: LedDriver<P>,
}

impl<C, F, P> HardwareAdapter<C, F, P>
where
    C: ClimateSource,
    F: AuxSource,
    P: OutputPin,
{
    pub fn new(sensor_hub: SensorHub<C, F>, actuator: LedDriver<P>) -> Self {
        Self {
            sensor_hub,
            actuator,
        }
    }

    pub fn sensor_hub_mut(&mut self) -> &mut SensorHub<C, F> {
        &mut self.sensor_hub
    }

    pub fn actuator(&self) -> &LedDriver<P> {
        &self.actuator
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl<C, F, P> SensorPort for HardwareAdapter<C, F, P>
where
    C: ClimateSource,
    F: AuxSource,
    P: OutputPin,
{
    fn sample(&mut self) -> Result<SensorReading, SensorError> {
        self.sensor_hub.sample()
    }

    fn auxiliary(&mut self) -> AuxReadings {
        self.sensor_hub.auxiliary()
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl<C, F, P> ActuatorPort for HardwareAdapter<C, F, P>
where
    C: ClimateSource,
    F: AuxSource,
    P: OutputPin,
{
    fn set_actuator(&mut self, on: bool) {
        self.actuator.set(on);
    }

    fn is_actuator_on(&self) -> bool {
        self.actuator.is_on()
    }
}
