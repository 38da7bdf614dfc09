//! Fuzz target for frame manifest parsing and integrity checks.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let _ = framelabel::manifest::fuzz_parse_manifest(data);
});
