//! # Error Types
//!
//! Error handling for the serialization stage.
//!
//! Every failure is tagged with an [`ErrorKind`] so pipeline drivers branch on
//! meaning instead of magic numbers. Only malformed-input failures cross the
//! stage boundary; diagnostic tap problems are absorbed where they happen.
//!
//! ## Error Categories
//! - **Malformed input**: undecodable wire bytes, oversized encodes
//! - **Degraded capability**: diagnostic tap open/write problems
//! - **Invariant violation**: programmer errors, always escalated to a panic
//! - **Configuration**: unreadable or invalid configuration
//!
//! ## Example Usage
//! ```rust
//! use dht_serialization::error::{ErrorKind, StageError};
//! use dht_serialization::core::bencode::DecodeError;
//!
//! let err = StageError::Malformed(DecodeError::UnexpectedEof(0));
//! assert_eq!(err.kind(), ErrorKind::MalformedInput);
//! assert_eq!(err.status_code(), -2);
//! ```

use crate::core::bencode::DecodeError;
use std::io;
use thiserror::Error;

/// Error message constants shared by log lines and panics.
pub mod constants {
    pub const ERR_BUFFER_NOT_EMPTY: &str = "wire buffer must be empty before encoding";
    pub const ERR_ALIGNMENT_BEFORE: &str = "alignment fault before encode";
    pub const ERR_ALIGNMENT_AFTER: &str = "alignment fault after encode";
    pub const ERR_CONSUME_PAST_END: &str = "cannot consume more bytes than the buffer holds";
    pub const ERR_TAP_LOCK_POISONED: &str = "diagnostic tap lock poisoned";
}

/// Pipeline status returned when a handler lets the message continue.
pub const STATUS_CONTINUE: i32 = 0;

/// Pipeline status for an undecodable or unencodable message.
pub const STATUS_MALFORMED: i32 = -2;

/// Pipeline status for any other halting failure.
pub const STATUS_HALT: i32 = -1;

/// What a failure means for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The message bytes or structure cannot be processed; drop the message.
    MalformedInput,
    /// A best-effort feature stopped working; processing continues.
    DegradedCapability,
    /// An internal invariant was broken. Never returned by the stage handlers.
    InvariantViolation,
    /// Configuration could not be loaded or failed validation.
    Configuration,
}

// StageError is the primary error type for all stage operations
#[derive(Error, Debug)]
pub enum StageError {
    #[error("Failed to parse message: {0}")]
    Malformed(#[from] DecodeError),

    #[error("Encoded message too large: {size} bytes (limit {limit})")]
    Oversized { size: usize, limit: usize },

    #[error("No structured message to encode")]
    MissingMessage,

    #[error("Diagnostic tap unavailable: {0}")]
    TapUnavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Duplicate module name: {0}")]
    DuplicateModule(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(&'static str),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl StageError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StageError::Malformed(_) | StageError::Oversized { .. } | StageError::MissingMessage => {
                ErrorKind::MalformedInput
            }
            StageError::TapUnavailable(_) | StageError::Io(_) => ErrorKind::DegradedCapability,
            StageError::InvariantViolation(_) => ErrorKind::InvariantViolation,
            StageError::DuplicateModule(_) | StageError::ConfigError(_) => {
                ErrorKind::Configuration
            }
        }
    }

    /// Integer status for drivers that still speak the `0` / negative convention.
    pub fn status_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::MalformedInput => STATUS_MALFORMED,
            _ => STATUS_HALT,
        }
    }
}

/// Abort on a broken internal invariant.
///
/// Reserved for programmer errors such as encoding into a non-empty buffer.
/// Input-dependent conditions must return a [`StageError`] instead.
#[cold]
#[track_caller]
pub fn invariant_violation(what: &'static str) -> ! {
    let err = StageError::InvariantViolation(what);
    tracing::error!(error = %err, "Aborting on invariant violation");
    panic!("{err}");
}

/// Type alias for Results using StageError
pub type Result<T> = std::result::Result<T, StageError>;

/// Integer status of a handler result: `0` continues, negative halts.
pub fn status_of(result: &Result<()>) -> i32 {
    match result {
        Ok(()) => STATUS_CONTINUE,
        Err(e) => e.status_code(),
    }
}
