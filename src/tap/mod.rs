//! # Diagnostic Tap
//!
//! Best-effort side channel that receives a verbatim copy of raw wire bytes.
//!
//! The tap is owned by the stage that writes to it and is decided once, at
//! construction: either it holds an open sink or it is disabled for good.
//! A disabled tap never attempts a write and is never re-opened.
//!
//! ## Write Discipline
//! - One `write` call per message, no framing added
//! - Writes are serialized by a mutex so concurrent messages do not interleave
//! - Short writes and write errors are logged and reported as [`TapOutcome`]
//!   values; they never fail the caller and are never retried
//!
//! ## Backends
//! - [`fifo`]: named pipe opened non-blocking (unix only)
//! - [`memory`]: in-memory sink for tests and embedding

use std::io::{self, Write};
use std::sync::Mutex;
use tracing::{debug, error};

use crate::config::TapConfig;
use crate::error::{constants, Result};

#[cfg(unix)]
pub mod fifo;
pub mod memory;

pub use memory::MemorySink;

type Sink = Box<dyn Write + Send>;

/// Result of one mirror attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TapOutcome {
    /// No sink; nothing was attempted
    Disabled,
    /// Every byte was written
    Written(usize),
    /// The sink accepted only part of the message
    ShortWrite { written: usize, expected: usize },
    /// The write failed outright
    Failed(io::ErrorKind),
}

impl TapOutcome {
    /// True for short writes and failures
    pub fn is_degraded(&self) -> bool {
        matches!(self, TapOutcome::ShortWrite { .. } | TapOutcome::Failed(_))
    }
}

pub struct DiagnosticTap {
    sink: Option<Mutex<Sink>>,
    label: String,
}

impl std::fmt::Debug for DiagnosticTap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagnosticTap")
            .field("enabled", &self.is_enabled())
            .field("label", &self.label)
            .finish()
    }
}

impl Default for DiagnosticTap {
    fn default() -> Self {
        Self::disabled()
    }
}

impl DiagnosticTap {
    /// A tap that never writes.
    pub fn disabled() -> Self {
        Self {
            sink: None,
            label: String::from("disabled"),
        }
    }

    /// A tap writing to an arbitrary sink. `label` names it in log lines.
    pub fn with_sink<W>(sink: W, label: impl Into<String>) -> Self
    where
        W: Write + Send + 'static,
    {
        Self {
            sink: Some(Mutex::new(Box::new(sink))),
            label: label.into(),
        }
    }

    /// Create the FIFO if needed and, when enabled, open it.
    ///
    /// Errors when the tap is enabled but cannot be opened. A disabled
    /// configuration yields a disabled tap.
    pub fn open(config: &TapConfig) -> Result<Self> {
        #[cfg(unix)]
        {
            let path = config.path.display().to_string();
            match fifo::ensure_fifo(&config.path, config.fifo_mode) {
                Ok(fifo::FifoStatus::Created) => debug!(path = %path, "Tap FIFO created"),
                Ok(fifo::FifoStatus::AlreadyExists) => {
                    debug!(path = %path, "Tap FIFO already exists")
                }
                Err(e) => error!(path = %path, error = %e, "Cannot create tap FIFO"),
            }

            if !config.enabled {
                return Ok(Self::disabled());
            }

            let file = fifo::open_writer(&config.path)?;
            tracing::info!(path = %path, "Diagnostic tap opened");
            Ok(Self::with_sink(file, path))
        }

        #[cfg(not(unix))]
        {
            if config.enabled {
                return Err(crate::error::StageError::TapUnavailable(
                    "named pipe tap requires a unix platform".to_string(),
                ));
            }
            Ok(Self::disabled())
        }
    }

    /// Like [`open`](Self::open), but an open failure is logged and leaves the
    /// tap permanently disabled.
    pub fn initialize(config: &TapConfig) -> Self {
        match Self::open(config) {
            Ok(tap) => tap,
            Err(e) => {
                error!(
                    path = %config.path.display(),
                    error = %e,
                    "Cannot open diagnostic tap, mirroring disabled"
                );
                Self::disabled()
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Write `bytes` to the sink in a single call.
    pub fn mirror(&self, bytes: &[u8]) -> TapOutcome {
        let Some(sink) = &self.sink else {
            return TapOutcome::Disabled;
        };
        if bytes.is_empty() {
            return TapOutcome::Written(0);
        }

        let mut sink = match sink.lock() {
            Ok(guard) => guard,
            Err(_) => {
                error!(tap = %self.label, "{}", constants::ERR_TAP_LOCK_POISONED);
                return TapOutcome::Failed(io::ErrorKind::Other);
            }
        };

        match sink.write(bytes) {
            Ok(n) if n == bytes.len() => {
                debug!(tap = %self.label, bytes = n, "Written to tap");
                TapOutcome::Written(n)
            }
            Ok(n) => {
                error!(
                    tap = %self.label,
                    written = n,
                    expected = bytes.len(),
                    "Failed to write {} bytes to tap",
                    bytes.len()
                );
                TapOutcome::ShortWrite {
                    written: n,
                    expected: bytes.len(),
                }
            }
            Err(e) => {
                error!(
                    tap = %self.label,
                    error = %e,
                    "Failed to write {} bytes to tap",
                    bytes.len()
                );
                TapOutcome::Failed(e.kind())
            }
        }
    }
}
