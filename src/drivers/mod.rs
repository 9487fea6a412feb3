//! Actuator drivers and host-simulation peripherals.

pub mod led;
pub mod sim_pin;
