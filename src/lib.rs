//! AIoT edge node library.
//!
//! Exposes the pure-logic modules (inference, actuation, link state
//! machine, application service) for integration testing, plus the
//! adapters the binary wires together.  ESP-IDF-specific code is guarded
//! by `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod actuation;
pub mod adapters;
pub mod app;
pub mod config;
pub mod diagnostics;
pub mod drivers;
pub mod error;
pub mod inference;
pub mod link;
pub mod pins;
pub mod scheduler;
pub mod sensors;

pub use error::{ConfigError, Error, LinkError, ParseError, PublishError, Result, SensorError};
