//! Bounded in-memory page cache.
//!
//! Pages are addressed by id and evicted according to a [`Replacer`] policy
//! once the cache holds `capacity` pages. The cache never touches the file:
//! the victim is handed back to the caller, which decides whether it needs
//! to be written out first.

pub mod lru;
pub mod replacer;

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::{Page, PageId};
use replacer::Replacer;
use std::collections::HashMap;

#[derive(Debug)]
pub struct PageCache {
    pages: HashMap<PageId, Page>,
    replacer: Box<dyn Replacer>,
    capacity: usize,
}

impl PageCache {
    pub fn new(replacer: Box<dyn Replacer>, capacity: usize) -> StorageResult<Self> {
        if capacity == 0 {
            return Err(StorageError::InvalidCacheCapacity);
        }

        Ok(Self {
            pages: HashMap::with_capacity(capacity.min(1024)),
            replacer,
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn contains(&self, page_id: PageId) -> bool {
        self.pages.contains_key(&page_id)
    }

    /// Look up a cached page without touching the eviction order.
    pub fn get(&self, page_id: PageId) -> Option<&Page> {
        self.pages.get(&page_id)
    }

    /// Look up a cached page, marking it as most recently used.
    pub fn get_mut(&mut self, page_id: PageId) -> Option<&mut Page> {
        let page = self.pages.get_mut(&page_id)?;
        self.replacer.record_access(page_id);
        Some(page)
    }

    /// Insert a page, replacing any cached page with the same id.
    ///
    /// When the cache is full the least valuable page according to the
    /// replacer is removed and returned.
    pub fn insert(&mut self, page: Page) -> Option<Page> {
        let page_id = page.id();
        let mut victim = None;

        if !self.pages.contains_key(&page_id) && self.pages.len() >= self.capacity {
            victim = self
                .replacer
                .evict()
                .and_then(|victim_id| self.pages.remove(&victim_id));
        }

        self.pages.insert(page_id, page);
        self.replacer.record_access(page_id);
        victim
    }

    /// Iterate over every cached page without touching the eviction order.
    pub fn pages_mut(&mut self) -> impl Iterator<Item = &mut Page> {
        self.pages.values_mut()
    }

    /// Drop every cached page, dirty or not.
    pub fn clear(&mut self) {
        for page_id in self.pages.keys() {
            self.replacer.remove(*page_id);
        }
        self.pages.clear();
    }
}
