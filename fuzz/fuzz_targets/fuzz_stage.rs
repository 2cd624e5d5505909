#![no_main]

use dht_serialization::{DhtMessage, DiagnosticTap, SerializationStage, StageConfig};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let stage = SerializationStage::with_tap(&StageConfig::default(), DiagnosticTap::disabled());
    let mut msg = DhtMessage::incoming(data);
    if stage.decode(&mut msg).is_ok() {
        // Whatever is left over is a suffix of the input
        assert!(data.ends_with(msg.wire.as_slice()));
    }
});
