//! Storage layer error types.

use thiserror::Error;

/// Errors that can occur in the storage layer.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Record too large: {size} bytes exceeds page capacity of {max} bytes")]
    RecordTooLarge { size: usize, max: usize },

    #[error("Invalid page size: {size} (min: {min})")]
    InvalidPageSize { size: usize, min: usize },

    #[error("Page cache capacity must be at least one page")]
    InvalidCacheCapacity,

    #[error("Page {0} is not resident in the page cache")]
    PageNotCached(crate::storage::page::PageId),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
