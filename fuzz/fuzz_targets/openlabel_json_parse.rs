//! Fuzz target for OpenLABEL JSON parsing.
//!
//! This fuzzer feeds arbitrary byte sequences to the scene reader and
//! writes every scene it accepts back out, checking for panics, crashes,
//! or hangs.

#![no_main]

use libfuzzer_sys::fuzz_target;
use raillabel::{from_slice, to_vec, SaveOptions, Warnings};

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let mut warnings = Warnings::new();
    if let Ok(scene) = from_slice(data, &mut warnings) {
        let _ = to_vec(&scene, &SaveOptions::default(), &mut warnings);
    }
});
