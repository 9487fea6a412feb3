//! Actuator output driver (single LED / relay line).
//!
//! Wraps any `embedded-hal` output pin.  The commanded state is tracked
//! in-memory so it can be reported even if the pin write fails; failures
//! are logged and counted, never propagated into the control loop.

use embedded_hal::digital::OutputPin;
use log::warn;

use crate::app::ports::ActuatorPort;

pub struct LedDriver<P> {
    pin: P,
    on: bool,
    /// Active-low outputs (e.g. relay boards) invert the level.
    active_low: bool,
    write_errors: u32,
}

impl<P: OutputPin> LedDriver<P> {
    pub fn new(pin: P) -> Self {
        Self {
            pin,
            on: false,
            active_low: false,
            write_errors: 0,
        }
    }

    pub fn active_low(pin: P) -> Self {
        Self {
            active_low: true,
            ..Self::new(pin)
        }
    }

    pub fn set(&mut self, on: bool) {
        let high = on != self.active_low;
        let result = if high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        if result.is_err() {
            self.write_errors = self.write_errors.saturating_add(1);
            warn!("Actuator pin write failed (errors={})", self.write_errors);
        }
        self.on = on;
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    pub fn write_errors(&self) -> u32 {
        self.write_errors
    }
}

impl<P: OutputPin> ActuatorPort for LedDriver<P> {
    fn set_actuator(&mut self, on: bool) {
        self.set(on);
    }

    fn is_actuator_on(&self) -> bool {
        self.on
    }
}
