#![no_main]
use libfuzzer_sys::fuzz_target;

use sol_codec::amf3;

fuzz_target!(|data: &[u8]| {
    let _ = amf3::decode_value(data);
});
