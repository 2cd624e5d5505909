//! Named pipe backend for the diagnostic tap.
//!
//! The FIFO is opened write-only with `O_NONBLOCK`: opening fails with
//! `ENXIO` while no reader is attached, and a full pipe turns into a short
//! write or `WouldBlock` instead of stalling the pipeline.

use std::fs::{File, OpenOptions};
use std::os::unix::fs::{FileTypeExt, OpenOptionsExt};
use std::path::Path;

use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::stat::Mode;
use nix::unistd::mkfifo;

use crate::error::{Result, StageError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FifoStatus {
    Created,
    AlreadyExists,
}

/// Create a FIFO at `path` with `mode` (subject to the process umask).
///
/// An existing path is left untouched and reported as `AlreadyExists`.
pub fn ensure_fifo(path: &Path, mode: u32) -> Result<FifoStatus> {
    match mkfifo(path, Mode::from_bits_truncate(mode as nix::libc::mode_t)) {
        Ok(()) => Ok(FifoStatus::Created),
        Err(Errno::EEXIST) => Ok(FifoStatus::AlreadyExists),
        Err(errno) => Err(StageError::TapUnavailable(format!(
            "mkfifo {} failed: {errno}",
            path.display()
        ))),
    }
}

/// Open the FIFO at `path` for non-blocking writes.
///
/// Anything other than a FIFO is refused so the tap never scribbles over a
/// regular file.
pub fn open_writer(path: &Path) -> Result<File> {
    let file = OpenOptions::new()
        .write(true)
        .custom_flags(OFlag::O_NONBLOCK.bits())
        .open(path)
        .map_err(|e| StageError::TapUnavailable(format!("open {}: {e}", path.display())))?;

    if !file.metadata()?.file_type().is_fifo() {
        return Err(StageError::TapUnavailable(format!(
            "{} is not a FIFO",
            path.display()
        )));
    }
    Ok(file)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_create_then_exists() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tap");

        assert_eq!(ensure_fifo(&path, 0o770).unwrap(), FifoStatus::Created);
        assert!(std::fs::metadata(&path).unwrap().file_type().is_fifo());
        assert_eq!(ensure_fifo(&path, 0o770).unwrap(), FifoStatus::AlreadyExists);
    }

    #[test]
    fn test_open_without_reader_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tap");
        ensure_fifo(&path, 0o770).unwrap();

        assert!(matches!(
            open_writer(&path),
            Err(StageError::TapUnavailable(_))
        ));
    }

    #[test]
    fn test_regular_file_is_refused() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("plain");
        std::fs::write(&path, b"keep me").unwrap();

        assert_eq!(ensure_fifo(&path, 0o770).unwrap(), FifoStatus::AlreadyExists);
        assert!(open_writer(&path).is_err());
        assert_eq!(std::fs::read(&path).unwrap(), b"keep me");
    }

    #[test]
    fn test_missing_directory_fails_creation() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("missing").join("tap");
        assert!(ensure_fifo(&path, 0o770).is_err());
    }
}
