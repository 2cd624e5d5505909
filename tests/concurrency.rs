#![allow(clippy::expect_used, clippy::unwrap_used)]

use bytes::BytesMut;
use dht_serialization::core::codec::BencodeFrameCodec;
use dht_serialization::core::value::{dict, Value};
use dht_serialization::{DhtMessage, DiagnosticTap, MemorySink, SerializationStage, StageConfig};
use std::sync::Arc;
use tokio_util::codec::Decoder;

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_decode_keeps_tap_stream_intact() {
    use tokio::task::JoinSet;

    let tasks_n = 8usize;
    let iterations = 500usize;
    let payload_sizes = [0usize, 16, 256, 2048];

    let sink = MemorySink::new();
    let config = StageConfig::default_with_overrides(|c| c.tap.enabled = true);
    let stage = Arc::new(SerializationStage::with_tap(
        &config,
        DiagnosticTap::with_sink(sink.clone(), "memory"),
    ));

    let mut tasks = JoinSet::new();
    for t in 0..tasks_n {
        let stage = stage.clone();
        tasks.spawn(async move {
            for i in 0..iterations {
                let size = payload_sizes[(t + i) % payload_sizes.len()];
                let message = dict([
                    ("task", Value::from(t as i64)),
                    ("seq", Value::from(i as i64)),
                    ("payload", Value::from(vec![(i & 0xFF) as u8; size])),
                ]);

                let mut out = DhtMessage::outgoing(message.clone());
                stage.encode(&mut out).unwrap();
                let mut incoming = DhtMessage::incoming(out.wire.as_slice());
                stage.decode(&mut incoming).unwrap();
                assert_eq!(incoming.dict(), Some(&message));
            }
        });
    }

    while let Some(res) = tasks.join_next().await {
        res.unwrap();
    }

    // Every mirrored message must come back out of the tap stream whole
    let mut codec = BencodeFrameCodec::default();
    let mut stream = BytesMut::from(&sink.contents()[..]);
    let mut seen = 0usize;
    while let Some(frame) = codec.decode(&mut stream).expect("tap stream must stay decodable") {
        assert!(frame.contains_key(&b"seq"[..]));
        seen += 1;
    }
    assert!(stream.is_empty());
    assert_eq!(seen, tasks_n * iterations);

    let snap = stage.metrics().snapshot();
    assert_eq!(snap.messages_decoded, (tasks_n * iterations) as u64);
    assert_eq!(snap.messages_encoded, (tasks_n * iterations) as u64);
    assert_eq!(snap.tap_bytes_written, sink.len() as u64);
}

#[test]
fn stage_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<SerializationStage>();
    assert_send_sync::<DiagnosticTap>();
}
