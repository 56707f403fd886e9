//! Buffer pool errors.

use keel_common::types::PageId;
use thiserror::Error;

use crate::disk::DiskError;

/// Result type for buffer pool operations.
pub type BufferResult<T> = Result<T, BufferError>;

/// Errors that can occur during buffer pool operations.
///
/// Pool exhaustion and non-residency are not errors: `fetch_page` and
/// `new_page` report exhaustion as `Ok(None)`, and the unpin/flush/delete
/// operations report non-residency through their boolean results.
#[derive(Debug, Error)]
#[allow(missing_docs)] // Fields are documented by variant docs
pub enum BufferError {
    /// Page ID carries a sentinel file ID or page number.
    #[error("invalid page ID: {page_id:?}")]
    InvalidPageId { page_id: PageId },

    /// Disk manager failure; propagated unchanged.
    #[error(transparent)]
    Disk(#[from] DiskError),

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_common::types::FileId;

    #[test]
    fn test_disk_error_propagates_unchanged() {
        let err = BufferError::from(DiskError::FileNotOpen {
            file_id: FileId::new(4),
        });
        assert_eq!(err.to_string(), "file 4 is not open");
        assert!(matches!(
            err,
            BufferError::Disk(DiskError::FileNotOpen { .. })
        ));
    }

    #[test]
    fn test_invalid_page_id_display() {
        let err = BufferError::InvalidPageId {
            page_id: PageId::INVALID,
        };
        assert!(err.to_string().contains("INVALID"));
    }
}
