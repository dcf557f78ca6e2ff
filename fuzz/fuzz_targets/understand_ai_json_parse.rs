//! Fuzz target for understand.ai JSON parsing.
//!
//! Inputs are wrapped into a `trains_4` envelope so the fuzzer spends its
//! time inside the predecessor reader instead of format detection.

#![no_main]

use libfuzzer_sys::fuzz_target;
use raillabel::{from_str, Warnings};

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }
    let Ok(frames) = std::str::from_utf8(data) else {
        return;
    };

    let document = format!(
        r#"{{"metadata": {{"project_id": "trains_4"}}, "coordinateSystems": [], "frames": {frames}}}"#
    );
    let _ = from_str(&document, &mut Warnings::new());
});
