use super::replacer::Replacer;
use crate::storage::page::PageId;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default)]
pub struct LruReplacer {
    /// Monotonic access counter
    clock: u64,
    /// Last access stamp of every tracked page
    last_access: HashMap<PageId, u64>,
    /// Pages ordered by access stamp (least recently used first)
    order: BTreeMap<u64, PageId>,
}

impl LruReplacer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Replacer for LruReplacer {
    fn evict(&mut self) -> Option<PageId> {
        let (_, page_id) = self.order.pop_first()?;
        self.last_access.remove(&page_id);
        Some(page_id)
    }

    fn record_access(&mut self, page_id: PageId) {
        if let Some(previous) = self.last_access.insert(page_id, self.clock) {
            self.order.remove(&previous);
        }
        self.order.insert(self.clock, page_id);
        self.clock += 1;
    }

    fn remove(&mut self, page_id: PageId) {
        if let Some(stamp) = self.last_access.remove(&page_id) {
            self.order.remove(&stamp);
        }
    }

    fn size(&self) -> usize {
        self.last_access.len()
    }
}
