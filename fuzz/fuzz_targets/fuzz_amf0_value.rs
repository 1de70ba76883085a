#![no_main]
use libfuzzer_sys::fuzz_target;

use sol_codec::amf0;

fuzz_target!(|data: &[u8]| {
    let _ = amf0::decode_value(data);
});
