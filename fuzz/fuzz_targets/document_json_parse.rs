//! Fuzz target for reading a unified annotation document and validating it.

#![no_main]

use framelabel::ir::io_json::from_json_str;
use framelabel::validation::{validate_document, ValidateOptions};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Validation must never panic on whatever the parser accepts.
    if let Ok(document) = from_json_str(text) {
        let _ = validate_document(&document, &ValidateOptions::default());
    }
});
