use crate::storage::buffer::lru::LruReplacer;
use crate::storage::buffer::PageCache;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::{Page, PageId, HEADER_SIZE};
use log::debug;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

pub const DEFAULT_PAGE_SIZE: usize = 8192;

pub const DEFAULT_CACHE_PAGES: usize = 4096;

/// Smallest page able to hold the header plus one empty record.
pub const MIN_PAGE_SIZE: usize = HEADER_SIZE + 4;

/// Owns one page-structured file and a bounded cache of its pages.
pub struct PageManager {
    file: File,
    path: PathBuf,
    page_size: usize,
    cache: PageCache,
}

impl PageManager {
    /// Create a new, empty page file, discarding any existing contents.
    pub fn create(path: &Path, page_size: usize, cache_pages: usize) -> StorageResult<Self> {
        Self::open_with(path, page_size, cache_pages, true)
    }

    /// Open a page file, creating it if it does not exist.
    pub fn open(path: &Path, page_size: usize, cache_pages: usize) -> StorageResult<Self> {
        Self::open_with(path, page_size, cache_pages, false)
    }

    fn open_with(
        path: &Path,
        page_size: usize,
        cache_pages: usize,
        truncate: bool,
    ) -> StorageResult<Self> {
        if page_size < MIN_PAGE_SIZE || page_size > u32::MAX as usize {
            return Err(StorageError::InvalidPageSize {
                size: page_size,
                min: MIN_PAGE_SIZE,
            });
        }
        let cache = PageCache::new(Box::new(LruReplacer::new()), cache_pages)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(truncate)
            .open(path)?;

        debug!("opened page file {:?} (page size {})", path, page_size);
        Ok(Self {
            file,
            path: path.to_path_buf(),
            page_size,
            cache,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn size_bytes(&self) -> StorageResult<u64> {
        Ok(self.file.metadata()?.len())
    }

    /// Number of whole pages in the file. A trailing partial page is ignored.
    pub fn page_count(&self) -> StorageResult<u32> {
        Ok((self.size_bytes()? / self.page_size as u64) as u32)
    }

    /// Number of pages currently held in memory.
    pub fn cached_pages(&self) -> usize {
        self.cache.len()
    }

    /// Return the cached page, loading it from the file on a miss.
    ///
    /// Bytes past the end of the file read as zero, so reading a page that
    /// does not exist yet yields an uninitialized page rather than an error.
    pub fn read(&mut self, page_id: PageId) -> StorageResult<&mut Page> {
        if !self.cache.contains(page_id) {
            let page = self.load_page(page_id)?;
            self.cache_page(page)?;
        }

        self.cache
            .get_mut(page_id)
            .ok_or(StorageError::PageNotCached(page_id))
    }

    /// Write a cached page's full buffer back to the file at its offset.
    ///
    /// The write is not forced to durable storage; see [`PageManager::force`].
    pub fn write(&mut self, page_id: PageId) -> StorageResult<()> {
        let offset = page_id.offset(self.page_size);
        let page = self
            .cache
            .get_mut(page_id)
            .ok_or(StorageError::PageNotCached(page_id))?;

        write_at(&mut self.file, offset, page.data())?;
        page.mark_clean();
        Ok(())
    }

    /// Reserve the page id just past the end of the file.
    ///
    /// The new zero-filled page lives only in the cache until it is written,
    /// so calling this twice without a write in between yields the same id.
    /// A modified page already cached at that id is written out first, and
    /// the id moves past it.
    pub fn allocate_new_page(&mut self) -> StorageResult<PageId> {
        let mut page_id = PageId(self.page_count()?);
        while self.cache.get(page_id).is_some_and(Page::is_dirty) {
            self.write(page_id)?;
            page_id = PageId(self.page_count()?);
        }
        self.cache_page(Page::new(page_id, self.page_size))?;

        debug!("allocated page {} in {:?}", page_id, self.path);
        Ok(page_id)
    }

    /// Flush all outstanding writes and file metadata to durable storage.
    pub fn force(&mut self) -> StorageResult<()> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Cut the file to zero length and forget every cached page.
    pub fn truncate(&mut self) -> StorageResult<()> {
        self.file.set_len(0)?;
        self.cache.clear();

        debug!("truncated {:?}", self.path);
        Ok(())
    }

    /// Release the file handle. Writes not followed by [`PageManager::force`]
    /// are left to the operating system.
    pub fn close(self) -> StorageResult<()> {
        debug!("closing {:?}", self.path);
        Ok(())
    }

    fn load_page(&mut self, page_id: PageId) -> StorageResult<Page> {
        let mut data = vec![0u8; self.page_size].into_boxed_slice();
        read_at(&mut self.file, page_id.offset(self.page_size), &mut data)?;
        Ok(Page::from_data(page_id, data))
    }

    fn cache_page(&mut self, page: Page) -> StorageResult<()> {
        if let Some(victim) = self.cache.insert(page) {
            if victim.is_dirty() {
                write_at(
                    &mut self.file,
                    victim.id().offset(self.page_size),
                    victim.data(),
                )?;
            }
            debug!("evicted page {} from {:?}", victim.id(), self.path);
        }
        Ok(())
    }
}

/// Fill `buf` from `offset`, stopping early at end of file.
fn read_at(file: &mut File, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
    file.seek(SeekFrom::Start(offset))?;

    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn write_at(file: &mut File, offset: u64, data: &[u8]) -> io::Result<()> {
    file.seek(SeekFrom::Start(offset))?;
    file.write_all(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    const TEST_PAGE_SIZE: usize = 64;

    fn write_page(pm: &mut PageManager, page_id: PageId, fill: u8) -> Result<()> {
        pm.read(page_id)?.data_mut().fill(fill);
        pm.write(page_id)?;
        Ok(())
    }

    #[test]
    fn test_create_and_open() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("test.tbl");

        // Create new file
        {
            let pm = PageManager::create(&file_path, TEST_PAGE_SIZE, 8)?;
            assert_eq!(pm.page_count()?, 0);
            assert_eq!(pm.page_size(), TEST_PAGE_SIZE);
        }

        // Open existing file
        {
            let pm = PageManager::open(&file_path, TEST_PAGE_SIZE, 8)?;
            assert_eq!(pm.page_count()?, 0);
        }

        Ok(())
    }

    #[test]
    fn test_open_creates_parent_directories() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("tables").join("nested").join("t.tbl");

        let pm = PageManager::open(&file_path, TEST_PAGE_SIZE, 8)?;
        assert!(file_path.exists());
        assert_eq!(pm.path(), file_path.as_path());

        Ok(())
    }

    #[test]
    fn test_write_and_read_page() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("test.tbl");

        {
            let mut pm = PageManager::create(&file_path, TEST_PAGE_SIZE, 8)?;
            let page = pm.read(PageId(0))?;
            page.data_mut()[0] = 42;
            page.data_mut()[TEST_PAGE_SIZE - 1] = 24;
            pm.write(PageId(0))?;
            assert_eq!(pm.page_count()?, 1);
        }

        // Read through a fresh manager so the cache is cold
        let mut pm = PageManager::open(&file_path, TEST_PAGE_SIZE, 8)?;
        let page = pm.read(PageId(0))?;
        assert_eq!(page.data()[0], 42);
        assert_eq!(page.data()[TEST_PAGE_SIZE - 1], 24);

        Ok(())
    }

    #[test]
    fn test_multiple_pages() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("test.tbl");
        let mut pm = PageManager::create(&file_path, TEST_PAGE_SIZE, 8)?;

        for i in 0..5 {
            write_page(&mut pm, PageId(i), i as u8)?;
        }
        assert_eq!(pm.page_count()?, 5);

        let mut pm = PageManager::open(&file_path, TEST_PAGE_SIZE, 8)?;
        for i in 0..5 {
            let page = pm.read(PageId(i))?;
            assert!(page.data().iter().all(|&b| b == i as u8));
        }

        Ok(())
    }

    #[test]
    fn test_read_beyond_eof_is_zeroed() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("test.tbl");
        let mut pm = PageManager::create(&file_path, TEST_PAGE_SIZE, 8)?;

        let page = pm.read(PageId(10))?;
        assert_eq!(page.id(), PageId(10));
        assert!(page.data().iter().all(|&b| b == 0));
        assert_eq!(page.used(), None);

        // Reading does not grow the file
        assert_eq!(pm.page_count()?, 0);

        Ok(())
    }

    #[test]
    fn test_short_read_leaves_zeros() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("test.tbl");
        fs::write(&file_path, vec![7u8; TEST_PAGE_SIZE + 10])?;

        let mut pm = PageManager::open(&file_path, TEST_PAGE_SIZE, 8)?;
        let page = pm.read(PageId(1))?;
        assert!(page.data()[..10].iter().all(|&b| b == 7));
        assert!(page.data()[10..].iter().all(|&b| b == 0));

        Ok(())
    }

    #[test]
    fn test_page_count_ignores_partial_page() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("test.tbl");
        fs::write(&file_path, vec![0u8; TEST_PAGE_SIZE * 2 + 17])?;

        let pm = PageManager::open(&file_path, TEST_PAGE_SIZE, 8)?;
        assert_eq!(pm.size_bytes()?, (TEST_PAGE_SIZE * 2 + 17) as u64);
        assert_eq!(pm.page_count()?, 2);

        Ok(())
    }

    #[test]
    fn test_invalid_page_size() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("test.tbl");

        let result = PageManager::create(&file_path, 4, 8);
        assert!(matches!(
            result,
            Err(StorageError::InvalidPageSize { size: 4, .. })
        ));

        let result = PageManager::create(&file_path, TEST_PAGE_SIZE, 0);
        assert!(matches!(result, Err(StorageError::InvalidCacheCapacity)));

        Ok(())
    }

    #[test]
    fn test_write_uncached_page_fails() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("test.tbl");
        let mut pm = PageManager::create(&file_path, TEST_PAGE_SIZE, 8)?;

        let result = pm.write(PageId(3));
        assert!(matches!(result, Err(StorageError::PageNotCached(PageId(3)))));

        Ok(())
    }

    #[test]
    fn test_file_growth() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("test.tbl");
        let mut pm = PageManager::create(&file_path, TEST_PAGE_SIZE, 8)?;

        // Write to page 5 (skipping 0-4)
        write_page(&mut pm, PageId(5), 5)?;
        assert_eq!(pm.page_count()?, 6);

        Ok(())
    }

    #[test]
    fn test_allocate_page() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("test.tbl");
        let mut pm = PageManager::create(&file_path, TEST_PAGE_SIZE, 8)?;

        let page_id = pm.allocate_new_page()?;
        assert_eq!(page_id, PageId(0));

        // Allocation alone writes nothing
        assert_eq!(pm.page_count()?, 0);
        assert_eq!(pm.allocate_new_page()?, PageId(0));

        pm.write(page_id)?;
        assert_eq!(pm.page_count()?, 1);
        assert_eq!(pm.allocate_new_page()?, PageId(1));

        Ok(())
    }

    #[test]
    fn test_allocate_keeps_modified_page() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("test.tbl");
        let mut pm = PageManager::create(&file_path, TEST_PAGE_SIZE, 8)?;

        // Page 0 is modified in memory but never written
        pm.read(PageId(0))?.data_mut()[8] = 7;

        let page_id = pm.allocate_new_page()?;
        assert_eq!(page_id, PageId(1));
        assert_eq!(pm.page_count()?, 1);
        assert_eq!(pm.read(PageId(0))?.data()[8], 7);
        assert!(!pm.read(PageId(0))?.is_dirty());

        Ok(())
    }

    #[test]
    fn test_write_clears_dirty_flag() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("test.tbl");
        let mut pm = PageManager::create(&file_path, TEST_PAGE_SIZE, 8)?;

        let page_id = pm.allocate_new_page()?;
        assert!(!pm.read(page_id)?.is_dirty());

        pm.read(page_id)?.data_mut()[8] = 1;
        assert!(pm.read(page_id)?.is_dirty());

        pm.write(page_id)?;
        pm.force()?;
        assert!(!pm.read(page_id)?.is_dirty());

        Ok(())
    }

    #[test]
    fn test_cache_is_bounded() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("test.tbl");
        let mut pm = PageManager::create(&file_path, TEST_PAGE_SIZE, 3)?;

        for i in 0..10 {
            write_page(&mut pm, PageId(i), i as u8 + 1)?;
        }
        assert_eq!(pm.cached_pages(), 3);

        // Evicted pages come back from the file
        for i in 0..10 {
            assert_eq!(pm.read(PageId(i))?.data()[0], i as u8 + 1);
        }
        assert_eq!(pm.cached_pages(), 3);

        Ok(())
    }

    #[test]
    fn test_eviction_flushes_dirty_page() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("test.tbl");
        let mut pm = PageManager::create(&file_path, TEST_PAGE_SIZE, 1)?;

        // Modify page 0 without writing it, then force it out of the cache
        pm.read(PageId(0))?.data_mut()[0] = 99;
        pm.read(PageId(1))?;

        assert_eq!(pm.page_count()?, 1);
        assert_eq!(pm.read(PageId(0))?.data()[0], 99);

        Ok(())
    }

    #[test]
    fn test_truncate() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("test.tbl");
        let mut pm = PageManager::create(&file_path, TEST_PAGE_SIZE, 8)?;

        for i in 0..3 {
            write_page(&mut pm, PageId(i), 1)?;
        }
        pm.truncate()?;

        assert_eq!(pm.page_count()?, 0);
        assert_eq!(pm.cached_pages(), 0);
        assert!(pm.read(PageId(0))?.data().iter().all(|&b| b == 0));

        Ok(())
    }

    #[test]
    fn test_persistence() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("test.tbl");

        {
            let mut pm = PageManager::create(&file_path, TEST_PAGE_SIZE, 8)?;
            write_page(&mut pm, PageId(0), 99)?;
            pm.force()?;
            pm.close()?;
        }

        {
            let mut pm = PageManager::open(&file_path, TEST_PAGE_SIZE, 8)?;
            assert_eq!(pm.read(PageId(0))?.data()[0], 99);
        }

        Ok(())
    }
}
