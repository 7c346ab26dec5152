#![no_main]

use drop_storage::Record;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Limit input size to prevent timeout
    if data.len() > 1_000_000 {
        return;
    }

    // Decoding must never panic, and a decoded frame must fit the input
    if let Ok((_, size)) = Record::decode(data) {
        assert!(size <= data.len());
    }
});
