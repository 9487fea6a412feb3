//! Fuzz target: `parse_frame` + `resolve`
//!
//! Drives arbitrary bytes through the control-frame parser and resolver
//! and asserts that nothing panics and that a displayed probability is
//! always inside [0, 1].
//!
//! cargo fuzz run fuzz_control_frame

#![no_main]

use aiotnode::app::commands::{Directive, parse_frame, resolve};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(frame) = parse_frame(data) else {
        return;
    };

    let res = resolve(&frame, "esp32-aiot-demo");
    if let Directive::ShowProbability(p) = res.directive {
        assert!((0.0..=1.0).contains(&p), "probability {p} escaped [0, 1]");
    }

    // Resolution depends only on the frame and the local id.
    assert_eq!(res, resolve(&frame, "esp32-aiot-demo"));
});
