#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = pixtext::sniff(text);
        let _ = pixtext::manifest::extract_json_block(text);
    }
});
