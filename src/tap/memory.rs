//! In-memory tap sink.
//!
//! Clones share the same buffer, so a test can hand one clone to the tap and
//! inspect the other. A write limit or a forced error simulates a degraded
//! side channel.

use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::constants;

#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    data: Arc<Mutex<Vec<u8>>>,
    writes: Arc<AtomicUsize>,
    write_limit: Option<usize>,
    fail_with: Option<io::ErrorKind>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept at most `limit` bytes per write call.
    pub fn with_write_limit(limit: usize) -> Self {
        Self {
            write_limit: Some(limit),
            ..Self::default()
        }
    }

    /// Fail every write with `kind`.
    pub fn failing(kind: io::ErrorKind) -> Self {
        Self {
            fail_with: Some(kind),
            ..Self::default()
        }
    }

    /// Everything written so far
    pub fn contents(&self) -> Vec<u8> {
        self.data.lock().map(|d| d.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.data.lock().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of write calls that reached the sink
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        if let Some(kind) = self.fail_with {
            return Err(io::Error::from(kind));
        }
        let n = self.write_limit.map_or(buf.len(), |limit| limit.min(buf.len()));
        self.data
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, constants::ERR_TAP_LOCK_POISONED))?
            .extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
