//! Digital flame detector (IR photodiode module, comparator output).
//!
//! The module pulls its output LOW when it sees a flame.  Reported as
//! auxiliary channel [`FLAME_CHANNEL`] with 1.0 = flame, 0.0 = clear; a
//! pin read error leaves the channel empty.

use embedded_hal::digital::InputPin;
use log::warn;

use super::{AuxReadings, AuxSource};

/// Aux channel the flame detector reports on.
pub const FLAME_CHANNEL: u8 = 0;

pub struct FlameSensor<P> {
    pin: P,
    last: Option<bool>,
}

impl<P: InputPin> FlameSensor<P> {
    pub fn new(pin: P) -> Self {
        Self { pin, last: None }
    }

    /// `Some(true)` when a flame is detected, `None` on pin error.
    pub fn detect(&mut self) -> Option<bool> {
        let flame = self.pin.is_low().ok();
        if flame.is_none() {
            warn!("Flame sensor pin read failed");
        } else if flame != self.last && flame == Some(true) {
            warn!("Flame detected");
        }
        self.last = flame;
        flame
    }
}

impl<P: InputPin> AuxSource for FlameSensor<P> {
    fn read_aux(&mut self, aux: &mut AuxReadings) {
        match self.detect() {
            Some(flame) => aux.set(FLAME_CHANNEL, if flame { 1.0 } else { 0.0 }),
            None => aux.clear(FLAME_CHANNEL),
        }
    }
}
