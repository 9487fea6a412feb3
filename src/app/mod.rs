//! Application core — pure domain logic, zero I/O.
//!
//! This module contains the rules of the node: parsing and applying
//! remote control frames, the per-tick sample → infer → actuate →
//! publish pass, and the display text.  All interaction with hardware
//! happens through **port traits** defined in [`ports`], keeping this
//! layer fully testable without real peripherals.

pub mod commands;
pub mod display;
pub mod events;
pub mod ports;
pub mod service;
