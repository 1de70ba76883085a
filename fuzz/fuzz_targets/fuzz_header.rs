#![no_main]
use libfuzzer_sys::fuzz_target;

use sol_codec::read::read_header;

fuzz_target!(|data: &[u8]| {
    if let Ok((_, body_offset)) = read_header(data) {
        assert!(body_offset <= data.len());
    }
});
