#![no_main]
use libfuzzer_sys::fuzz_target;

use sol_codec::amf3::fuzz_parse_string;

fuzz_target!(|data: &[u8]| {
    let _ = fuzz_parse_string(data);
});
