#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Anything that decodes must also be accepted or cleanly rejected by the encoder
    if let Ok(document) = sol_codec::decode(data) {
        let _ = sol_codec::encode(&document);
    }
});
