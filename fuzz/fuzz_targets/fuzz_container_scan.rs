#![no_main]

use libfuzzer_sys::fuzz_target;
use pixtext::formats::{exif, scan_container};

fuzz_target!(|data: &[u8]| {
    let _ = scan_container(data);
    let _ = exif::parse_exif(data);
});
