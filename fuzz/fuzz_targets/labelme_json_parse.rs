//! Fuzz target for LabelMe label parsing and shape normalization.
//!
//! Run with:
//!   cargo +nightly fuzz run labelme_json_parse

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Label files are small; skip inputs that would only stress the allocator.
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let _ = framelabel::label::fuzz_parse_label(data);
});
