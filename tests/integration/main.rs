//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock adapters.  All tests run on the host (x86_64) with no
//! real hardware or broker required (the HTTP tests use a loopback
//! listener).

mod app_service_tests;
mod control_tests;
#[cfg(feature = "host")]
mod http_tests;
mod mock_hw;
