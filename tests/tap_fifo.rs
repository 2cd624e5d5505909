//! End-to-end tap tests against a real named pipe

#![cfg(unix)]
#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::fs::{File, OpenOptions};
use std::io::Read;
use std::os::unix::fs::{FileTypeExt, OpenOptionsExt};
use std::path::Path;

use dht_serialization::tap::fifo::{ensure_fifo, FifoStatus};
use dht_serialization::{
    DhtMessage, DiagnosticTap, SerializationStage, StageConfig, StageError,
};
use nix::fcntl::OFlag;

fn tap_config(path: &Path) -> StageConfig {
    StageConfig::default_with_overrides(|c| {
        c.tap.enabled = true;
        c.tap.path = path.to_path_buf();
    })
}

fn open_reader(path: &Path) -> File {
    OpenOptions::new()
        .read(true)
        .custom_flags(OFlag::O_NONBLOCK.bits())
        .open(path)
        .expect("open reader")
}

#[test]
fn test_reader_sees_incoming_bytes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("tap");
    assert_eq!(ensure_fifo(&path, 0o700).unwrap(), FifoStatus::Created);

    let mut reader = open_reader(&path);
    let config = tap_config(&path);
    let tap = DiagnosticTap::open(&config.tap).expect("reader is attached");
    assert!(tap.is_enabled());
    let stage = SerializationStage::with_tap(&config, tap);

    let first: &[u8] = b"d1:q4:ping1:t2:aa1:y1:qe";
    let second: &[u8] = b"broken";
    let mut msg = DhtMessage::incoming(first);
    stage.decode(&mut msg).unwrap();
    let mut msg = DhtMessage::incoming(second);
    assert!(stage.decode(&mut msg).is_err());

    let mut received = vec![0u8; 256];
    let n = reader.read(&mut received).expect("bytes waiting in pipe");
    assert_eq!(&received[..n], [first, second].concat());
}

#[test]
fn test_initialize_without_reader_disables_tap() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("tap");
    let config = tap_config(&path);

    assert!(matches!(
        DiagnosticTap::open(&config.tap),
        Err(StageError::TapUnavailable(_))
    ));
    // The FIFO is still left behind for a later reader
    assert!(std::fs::metadata(&path).unwrap().file_type().is_fifo());

    let stage = SerializationStage::new(&config);
    assert!(!stage.tap().is_enabled());

    let mut msg = DhtMessage::incoming(b"d1:y1:re");
    stage.decode(&mut msg).expect("decode unaffected by missing reader");
    assert_eq!(stage.metrics().snapshot().tap_bytes_written, 0);
}

#[test]
fn test_regular_file_is_never_written() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("tap");
    std::fs::write(&path, b"keep").unwrap();

    let stage = SerializationStage::new(&tap_config(&path));
    assert!(!stage.tap().is_enabled());

    let mut msg = DhtMessage::incoming(b"d1:y1:re");
    stage.decode(&mut msg).unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), b"keep");
}
