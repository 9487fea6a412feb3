//! In-memory GPIO pin and delay for host builds and tests.
//!
//! A [`SimPin`] is a shared level: clones observe and drive the same line,
//! so a test can hold one handle while a driver owns another.  Implements
//! the `embedded-hal` 1.0 digital traits with an infallible error type.

use core::cell::Cell;
use core::convert::Infallible;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin, StatefulOutputPin};

#[derive(Debug, Clone)]
pub struct SimPin {
    level: Rc<Cell<bool>>,
    writes: Rc<Cell<u32>>,
}

impl SimPin {
    pub fn new(high: bool) -> Self {
        Self {
            level: Rc::new(Cell::new(high)),
            writes: Rc::new(Cell::new(0)),
        }
    }

    /// Drive the line from outside (e.g. a simulated sensor output).
    pub fn set_level(&self, high: bool) {
        self.level.set(high);
    }

    pub fn level(&self) -> bool {
        self.level.get()
    }

    /// Number of `set_high`/`set_low` calls made through any handle.
    pub fn writes(&self) -> u32 {
        self.writes.get()
    }

    fn write(&self, high: bool) {
        self.level.set(high);
        self.writes.set(self.writes.get().saturating_add(1));
    }
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl InputPin for SimPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.level.get())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.level.get())
    }
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(true);
        Ok(())
    }
}

impl StatefulOutputPin for SimPin {
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.level.get())
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.level.get())
    }
}

/// Delay that returns immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}
