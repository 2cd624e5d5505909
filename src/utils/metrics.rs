//! Stage Metrics
//!
//! Counters for monitoring the serialization stage.
//!
//! Each stage owns its own collector; there is no process-wide instance.
//! Uses atomic counters for thread-safe metrics collection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

use crate::tap::TapOutcome;

#[derive(Debug)]
pub struct StageMetrics {
    /// Messages serialized on the outgoing path
    pub messages_encoded: AtomicU64,
    /// Bytes produced by encoding
    pub bytes_encoded: AtomicU64,
    /// Encodes rejected for exceeding the size limit
    pub oversized_encodes: AtomicU64,
    /// Messages decoded on the incoming path
    pub messages_decoded: AtomicU64,
    /// Bytes consumed by decoding
    pub bytes_decoded: AtomicU64,
    /// Incoming messages that failed to parse
    pub decode_failures: AtomicU64,
    /// Decoded messages followed by leftover bytes
    pub trailing_byte_messages: AtomicU64,
    /// Total leftover bytes
    pub trailing_bytes: AtomicU64,
    /// Bytes mirrored to the diagnostic tap
    pub tap_bytes_written: AtomicU64,
    /// Tap writes that transferred only part of a message
    pub tap_short_writes: AtomicU64,
    /// Tap writes that failed outright
    pub tap_write_errors: AtomicU64,
    start_time: Instant,
}

impl StageMetrics {
    pub fn new() -> Self {
        Self {
            messages_encoded: AtomicU64::new(0),
            bytes_encoded: AtomicU64::new(0),
            oversized_encodes: AtomicU64::new(0),
            messages_decoded: AtomicU64::new(0),
            bytes_decoded: AtomicU64::new(0),
            decode_failures: AtomicU64::new(0),
            trailing_byte_messages: AtomicU64::new(0),
            trailing_bytes: AtomicU64::new(0),
            tap_bytes_written: AtomicU64::new(0),
            tap_short_writes: AtomicU64::new(0),
            tap_write_errors: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn message_encoded(&self, byte_count: u64) {
        self.messages_encoded.fetch_add(1, Ordering::Relaxed);
        self.bytes_encoded.fetch_add(byte_count, Ordering::Relaxed);
    }

    pub fn oversized_encode(&self) {
        self.oversized_encodes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn message_decoded(&self, byte_count: u64) {
        self.messages_decoded.fetch_add(1, Ordering::Relaxed);
        self.bytes_decoded.fetch_add(byte_count, Ordering::Relaxed);
    }

    pub fn decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn trailing(&self, byte_count: u64) {
        self.trailing_byte_messages.fetch_add(1, Ordering::Relaxed);
        self.trailing_bytes.fetch_add(byte_count, Ordering::Relaxed);
    }

    /// Record the result of one mirror attempt
    pub fn tap_outcome(&self, outcome: &TapOutcome) {
        match outcome {
            TapOutcome::Disabled => {}
            TapOutcome::Written(n) => {
                self.tap_bytes_written.fetch_add(*n as u64, Ordering::Relaxed);
            }
            TapOutcome::ShortWrite { written, .. } => {
                self.tap_short_writes.fetch_add(1, Ordering::Relaxed);
                self.tap_bytes_written
                    .fetch_add(*written as u64, Ordering::Relaxed);
            }
            TapOutcome::Failed(_) => {
                self.tap_write_errors.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_encoded: self.messages_encoded.load(Ordering::Relaxed),
            bytes_encoded: self.bytes_encoded.load(Ordering::Relaxed),
            oversized_encodes: self.oversized_encodes.load(Ordering::Relaxed),
            messages_decoded: self.messages_decoded.load(Ordering::Relaxed),
            bytes_decoded: self.bytes_decoded.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            trailing_byte_messages: self.trailing_byte_messages.load(Ordering::Relaxed),
            trailing_bytes: self.trailing_bytes.load(Ordering::Relaxed),
            tap_bytes_written: self.tap_bytes_written.load(Ordering::Relaxed),
            tap_short_writes: self.tap_short_writes.load(Ordering::Relaxed),
            tap_write_errors: self.tap_write_errors.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            messages_encoded = snapshot.messages_encoded,
            bytes_encoded = snapshot.bytes_encoded,
            oversized_encodes = snapshot.oversized_encodes,
            messages_decoded = snapshot.messages_decoded,
            bytes_decoded = snapshot.bytes_decoded,
            decode_failures = snapshot.decode_failures,
            trailing_byte_messages = snapshot.trailing_byte_messages,
            trailing_bytes = snapshot.trailing_bytes,
            tap_bytes_written = snapshot.tap_bytes_written,
            tap_short_writes = snapshot.tap_short_writes,
            tap_write_errors = snapshot.tap_write_errors,
            uptime_seconds = snapshot.uptime_seconds,
            "Serialization stage metrics snapshot"
        );
    }
}

impl Default for StageMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub messages_encoded: u64,
    pub bytes_encoded: u64,
    pub oversized_encodes: u64,
    pub messages_decoded: u64,
    pub bytes_decoded: u64,
    pub decode_failures: u64,
    pub trailing_byte_messages: u64,
    pub trailing_bytes: u64,
    pub tap_bytes_written: u64,
    pub tap_short_writes: u64,
    pub tap_write_errors: u64,
    pub uptime_seconds: u64,
}
