//! Async framing of back-to-back bencoded messages, as read from the tap

#![allow(clippy::expect_used, clippy::unwrap_used)]

use dht_serialization::core::codec::BencodeFrameCodec;
use dht_serialization::core::value::{dict, Value};
use dht_serialization::StageError;
use futures::{SinkExt, StreamExt};
use tokio_util::codec::{FramedRead, FramedWrite};

#[tokio::test]
async fn test_framed_read_splits_stream() {
    let stream: &[u8] = b"d1:q4:pinge d1:y1:re";
    // The space is not a valid message start
    let mut frames = FramedRead::new(stream, BencodeFrameCodec::default());

    let first = frames.next().await.unwrap().unwrap();
    assert_eq!(first[&b"q"[..]].as_str(), Some("ping"));
    assert!(matches!(
        frames.next().await.unwrap(),
        Err(StageError::Malformed(_))
    ));
}

#[tokio::test]
async fn test_framed_read_many_messages() {
    let mut stream = Vec::new();
    for i in 0..50i64 {
        stream.extend_from_slice(format!("d3:seqi{i}ee").as_bytes());
    }

    let frames: Vec<_> = FramedRead::new(&stream[..], BencodeFrameCodec::default())
        .collect()
        .await;
    assert_eq!(frames.len(), 50);
    for (i, frame) in frames.into_iter().enumerate() {
        let frame = frame.unwrap();
        assert_eq!(frame[&b"seq"[..]].as_integer(), Some(i as i64));
    }
}

#[tokio::test]
async fn test_truncated_tail_reported_at_eof() {
    let stream: &[u8] = b"d1:ai1eed1:bi2";
    let mut frames = FramedRead::new(stream, BencodeFrameCodec::default());

    assert!(frames.next().await.unwrap().is_ok());
    assert!(matches!(
        frames.next().await.unwrap(),
        Err(StageError::Io(_))
    ));
}

#[tokio::test]
async fn test_framed_write_then_read() {
    let a = dict([("t", Value::from("aa")), ("y", Value::from("q"))]);
    let b = dict([("r", Value::Dict(dict([("id", Value::from(vec![7u8; 20]))])))]);

    let mut writer = FramedWrite::new(Vec::new(), BencodeFrameCodec::default());
    writer.send(&a).await.unwrap();
    writer.send(&b).await.unwrap();
    let bytes = writer.into_inner();

    let frames: Vec<_> = FramedRead::new(&bytes[..], BencodeFrameCodec::default())
        .map(|f| f.unwrap())
        .collect()
        .await;
    assert_eq!(frames, vec![a, b]);
}
