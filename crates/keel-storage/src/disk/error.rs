//! Error types for the disk manager.

use std::io;
use std::path::PathBuf;

use keel_common::types::FileId;
use thiserror::Error;

/// Result type for disk manager operations.
pub type DiskResult<T> = Result<T, DiskError>;

/// Errors that can occur during disk manager operations.
#[derive(Debug, Error)]
#[allow(missing_docs)] // Fields are documented by variant docs
pub enum DiskError {
    /// File already exists.
    #[error("file already exists: {path}")]
    FileExists { path: PathBuf },

    /// File not found.
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// No open file with the given handle.
    #[error("file {file_id} is not open")]
    FileNotOpen { file_id: FileId },

    /// File cannot be destroyed while a handle to it is open.
    #[error("file is still open: {path}")]
    FileStillOpen { path: PathBuf },

    /// Short read/write (fewer bytes transferred than requested).
    #[error("short {operation}: expected {expected} bytes, got {actual}")]
    ShortIo {
        operation: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Underlying OS error.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl DiskError {
    /// Creates a `FileExists` error.
    pub fn file_exists(path: impl Into<PathBuf>) -> Self {
        Self::FileExists { path: path.into() }
    }

    /// Creates a `FileNotFound` error.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Creates a `ShortIo` error for reads.
    pub fn short_read(expected: usize, actual: usize) -> Self {
        Self::ShortIo {
            operation: "read",
            expected,
            actual,
        }
    }

    /// Creates a `ShortIo` error for writes.
    pub fn short_write(expected: usize, actual: usize) -> Self {
        Self::ShortIo {
            operation: "write",
            expected,
            actual,
        }
    }

    /// Returns true if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::FileNotFound { .. })
            || matches!(self, Self::Io { source } if source.kind() == io::ErrorKind::NotFound)
    }

    /// Converts from `std::io::Error` with path context.
    pub fn from_io_with_path(err: io::Error, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match err.kind() {
            io::ErrorKind::NotFound => Self::FileNotFound { path },
            io::ErrorKind::AlreadyExists => Self::FileExists { path },
            _ => Self::Io { source: err },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_io() {
        let err = DiskError::short_read(100, 50);
        assert!(matches!(
            err,
            DiskError::ShortIo {
                operation: "read",
                expected: 100,
                actual: 50
            }
        ));

        let err = DiskError::short_write(100, 50);
        assert!(matches!(
            err,
            DiskError::ShortIo {
                operation: "write",
                ..
            }
        ));
    }

    #[test]
    fn test_from_io_with_path() {
        let std_err = io::Error::new(io::ErrorKind::NotFound, "gone");
        let err = DiskError::from_io_with_path(std_err, "/tmp/gone.kdb");
        assert!(err.is_not_found());

        let std_err = io::Error::new(io::ErrorKind::AlreadyExists, "there");
        let err = DiskError::from_io_with_path(std_err, "/tmp/there.kdb");
        assert!(matches!(err, DiskError::FileExists { .. }));

        let std_err = io::Error::new(io::ErrorKind::PermissionDenied, "no");
        let err = DiskError::from_io_with_path(std_err, "/tmp/no.kdb");
        assert!(matches!(err, DiskError::Io { .. }));
    }

    #[test]
    fn test_display() {
        let err = DiskError::FileNotOpen {
            file_id: FileId::new(9),
        };
        assert_eq!(err.to_string(), "file 9 is not open");
    }
}
