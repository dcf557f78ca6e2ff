//! Fuzz target for filter document parsing.

#![no_main]

use libfuzzer_sys::fuzz_target;
use raillabel::filter::parse_filter_spec;

fuzz_target!(|data: &[u8]| {
    if data.len() > 1024 * 1024 {
        return;
    }

    let _ = parse_filter_spec(data);
});
