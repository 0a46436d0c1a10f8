#![no_main]

use libfuzzer_sys::fuzz_target;
use pixtext::{DecodeOptions, InputLimits, Tier};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let options = DecodeOptions::default().with_limits(InputLimits {
        max_input_bytes: 1 << 20,
        max_pixels: 1 << 16,
    });
    let _ = pixtext::decode(text, &options);
    for tier in Tier::ALL {
        let _ = pixtext::decode_as(text, tier, &options);
    }
});
