//! Fuzz target: `decode_telemetry`
//!
//! Arbitrary bytes must never panic the decoder, and anything that decodes
//! must re-encode into a fixed buffer (every string and vector in the
//! record is capacity-bounded).
//!
//! cargo fuzz run fuzz_telemetry_decode

#![no_main]

use aiotnode::config::TELEMETRY_BUF_CAP;
use aiotnode::link::codec::{decode_telemetry, encode_into};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(record) = decode_telemetry(data) else {
        return;
    };

    let mut buf = [0u8; TELEMETRY_BUF_CAP * 2];
    let len = encode_into(&record, &mut buf).expect("bounded record must encode");
    assert!(len > 0);
});
