//! Storage layer implementation for heapstore.
//!
//! This module provides the foundation for persistent data storage using a page-based
//! architecture. Key components:
//!
//! - **Page**: Fixed-size blocks of data whose first 4 bytes hold the `used` pointer
//! - **PageManager**: Reads, writes and allocates pages of one table file
//! - **PageCache**: Bounded in-memory cache of pages with LRU eviction
//! - **WalWriter**: Dual-format append-only operation log
//!
//! The write-ahead log is an audit trail only; it is never replayed.

pub mod buffer;
pub mod disk;
pub mod error;
pub mod page;
pub mod wal;

pub use buffer::PageCache;
pub use disk::{PageManager, DEFAULT_CACHE_PAGES, DEFAULT_PAGE_SIZE};
pub use error::{StorageError, StorageResult};
pub use page::{Page, PageId, HEADER_SIZE};
pub use wal::{WalEntry, WalOp, WalWriter};
