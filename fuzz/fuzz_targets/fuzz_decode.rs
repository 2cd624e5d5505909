#![no_main]

use dht_serialization::{BencodeCodec, MessageCodec};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must never panic the decoder
    if let Ok((message, used)) = BencodeCodec::default().decode(data) {
        assert!(used <= data.len());
        let _ = dht_serialization::core::bencode::to_bytes(&message);
    }
});
