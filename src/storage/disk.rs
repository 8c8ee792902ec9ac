//! File-backed page storage.

pub mod page_manager;

pub use page_manager::{PageManager, DEFAULT_CACHE_PAGES, DEFAULT_PAGE_SIZE, MIN_PAGE_SIZE};
