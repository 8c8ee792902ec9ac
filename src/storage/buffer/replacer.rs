use crate::storage::page::PageId;
use std::fmt::Debug;

/// Eviction policy for the page cache.
pub trait Replacer: Send + Sync + Debug {
    /// Select a page to evict and stop tracking it. Returns None if no page is tracked.
    fn evict(&mut self) -> Option<PageId>;

    /// Record that a page was just read or inserted.
    fn record_access(&mut self, page_id: PageId);

    /// Stop tracking a page without evicting it.
    fn remove(&mut self, page_id: PageId);

    /// Get the number of tracked pages.
    fn size(&self) -> usize;
}
