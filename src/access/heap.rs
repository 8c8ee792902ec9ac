use crate::storage::disk::PageManager;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::{PageId, HEADER_SIZE};
use byteorder::{BigEndian, ByteOrder};
use log::warn;
use parking_lot::Mutex;
use std::path::Path;

/// Size of the length prefix stored in front of every record.
const RECORD_LEN_SIZE: usize = 4;

/// Outcome of a full table scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Number of records handed to the visitor
    pub records: usize,
    /// Pages whose record area ended in a corrupt or truncated record.
    /// Scanning of such a page stops at the bad record and resumes on the next page.
    pub truncated_pages: Vec<PageId>,
}

impl ScanSummary {
    pub fn ended_early(&self) -> bool {
        !self.truncated_pages.is_empty()
    }
}

/// Append-only table of variable-length records spread over the pages of one file.
///
/// Page layout: `[used:4]` followed by packed `[len:4][payload]` records up to
/// `used`. New records always go to the last page; earlier pages are never
/// revisited for free space. Every operation takes the table lock, so
/// concurrent inserts and scans run one after another.
pub struct HeapTable {
    pager: Mutex<PageManager>,
}

impl HeapTable {
    pub fn new(pager: PageManager) -> Self {
        Self {
            pager: Mutex::new(pager),
        }
    }

    /// Open a table file, creating it if needed.
    pub fn open(path: &Path, page_size: usize, cache_pages: usize) -> StorageResult<Self> {
        Ok(Self::new(PageManager::open(path, page_size, cache_pages)?))
    }

    pub fn page_size(&self) -> usize {
        self.pager.lock().page_size()
    }

    pub fn page_count(&self) -> StorageResult<u32> {
        self.pager.lock().page_count()
    }

    /// Largest payload a single record may carry.
    pub fn max_record_size(&self) -> usize {
        self.page_size() - HEADER_SIZE - RECORD_LEN_SIZE
    }

    /// Append a record and return the page it landed on.
    pub fn insert(&self, record: &[u8]) -> StorageResult<PageId> {
        let wrapped_len = RECORD_LEN_SIZE + record.len();

        let mut pager = self.pager.lock();
        let capacity = pager.page_size() - HEADER_SIZE;
        if wrapped_len > capacity {
            return Err(StorageError::RecordTooLarge {
                size: wrapped_len,
                max: capacity,
            });
        }

        let page_count = pager.page_count()?;
        let mut page_id = if page_count == 0 {
            pager.allocate_new_page()?
        } else {
            PageId(page_count - 1)
        };

        let page = pager.read(page_id)?;
        page.init_header();
        if wrapped_len > page.free_space() {
            page_id = pager.allocate_new_page()?;
        }

        let page = pager.read(page_id)?;
        page.init_header();
        let used = page.used().unwrap_or(HEADER_SIZE).max(HEADER_SIZE);

        let data = page.data_mut();
        BigEndian::write_u32(
            &mut data[used..used + RECORD_LEN_SIZE],
            record.len() as u32,
        );
        data[used + RECORD_LEN_SIZE..used + wrapped_len].copy_from_slice(record);
        page.set_used(used + wrapped_len);

        pager.write(page_id)?;
        Ok(page_id)
    }

    /// Visit every record in insertion order.
    ///
    /// The table stays locked while the visitor runs, so the visitor must not
    /// call back into this table.
    pub fn for_each<F>(&self, mut visit: F) -> StorageResult<ScanSummary>
    where
        F: FnMut(&[u8]),
    {
        let mut pager = self.pager.lock();
        let page_size = pager.page_size();
        let mut summary = ScanSummary::default();

        for id in 0..pager.page_count()? {
            let page_id = PageId(id);
            let page = pager.read(page_id)?;
            let used = page.used().unwrap_or(HEADER_SIZE);
            let limit = used.min(page_size);
            let data = page.data();

            let mut pos = HEADER_SIZE;
            while pos + RECORD_LEN_SIZE <= limit {
                let len = BigEndian::read_u32(&data[pos..pos + RECORD_LEN_SIZE]) as usize;
                if len > limit - pos - RECORD_LEN_SIZE {
                    break;
                }
                let start = pos + RECORD_LEN_SIZE;
                visit(&data[start..start + len]);
                summary.records += 1;
                pos = start + len;
            }

            if pos != used {
                warn!(
                    "scan of page {} stopped at offset {} before used offset {}",
                    page_id, pos, used
                );
                summary.truncated_pages.push(page_id);
            }
        }

        Ok(summary)
    }

    /// Collect every record in insertion order.
    pub fn records(&self) -> StorageResult<(Vec<Vec<u8>>, ScanSummary)> {
        let mut records = Vec::new();
        let summary = self.for_each(|record| records.push(record.to_vec()))?;
        Ok((records, summary))
    }

    /// Remove every record by cutting the file to zero length.
    pub fn truncate(&self) -> StorageResult<()> {
        self.pager.lock().truncate()
    }

    /// Force written pages to durable storage.
    pub fn force(&self) -> StorageResult<()> {
        self.pager.lock().force()
    }

    pub fn close(self) -> StorageResult<()> {
        self.pager.into_inner().close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn create_test_table(page_size: usize) -> Result<(HeapTable, tempfile::TempDir)> {
        let dir = tempdir()?;
        let table = HeapTable::open(&dir.path().join("test.tbl"), page_size, 16)?;
        Ok((table, dir))
    }

    #[test]
    fn test_empty_table() -> Result<()> {
        let (table, _dir) = create_test_table(64)?;

        assert_eq!(table.page_count()?, 0);
        let (records, summary) = table.records()?;
        assert!(records.is_empty());
        assert_eq!(summary, ScanSummary::default());

        Ok(())
    }

    #[test]
    fn test_insert_and_scan() -> Result<()> {
        let (table, _dir) = create_test_table(8192)?;

        let page_id = table.insert(b"first")?;
        assert_eq!(page_id, PageId(0));
        table.insert(b"second")?;
        table.insert(b"")?;

        let (records, summary) = table.records()?;
        assert_eq!(records, vec![b"first".to_vec(), b"second".to_vec(), vec![]]);
        assert_eq!(summary.records, 3);
        assert!(!summary.ended_early());
        assert_eq!(table.page_count()?, 1);

        Ok(())
    }

    #[test]
    fn test_page_layout() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("test.tbl");
        let table = HeapTable::open(&path, 64, 16)?;

        table.insert(&[0xAA, 0xBB])?;
        table.close()?;

        let bytes = std::fs::read(&path)?;
        assert_eq!(bytes.len(), 64);
        // used = 4 (header) + 4 (length) + 2 (payload)
        assert_eq!(&bytes[..4], &[0, 0, 0, 10]);
        assert_eq!(&bytes[4..10], &[0, 0, 0, 2, 0xAA, 0xBB]);
        assert!(bytes[10..].iter().all(|&b| b == 0));

        Ok(())
    }

    #[test]
    fn test_records_spill_to_new_page() -> Result<()> {
        let (table, _dir) = create_test_table(64)?;

        // Each wrapped record takes 4 + 30 = 34 bytes; only one fits in 60
        let first = vec![1u8; 30];
        let second = vec![2u8; 30];
        assert_eq!(table.insert(&first)?, PageId(0));
        assert_eq!(table.insert(&second)?, PageId(1));
        assert_eq!(table.page_count()?, 2);

        let (records, _) = table.records()?;
        assert_eq!(records, vec![first, second]);

        Ok(())
    }

    #[test]
    fn test_exact_fit() -> Result<()> {
        let (table, _dir) = create_test_table(64)?;

        // 4 + 56 = 60 bytes fills the page exactly
        let max = vec![7u8; table.max_record_size()];
        assert_eq!(max.len(), 56);
        assert_eq!(table.insert(&max)?, PageId(0));
        assert_eq!(table.insert(b"")?, PageId(1));

        Ok(())
    }

    #[test]
    fn test_record_too_large() -> Result<()> {
        let (table, _dir) = create_test_table(64)?;

        let result = table.insert(&[0u8; 57]);
        assert!(matches!(
            result,
            Err(StorageError::RecordTooLarge { size: 61, max: 60 })
        ));

        // Nothing was allocated or written
        assert_eq!(table.page_count()?, 0);
        assert_eq!(table.records()?.0.len(), 0);

        Ok(())
    }

    #[test]
    fn test_earlier_pages_not_revisited() -> Result<()> {
        let (table, _dir) = create_test_table(64)?;

        table.insert(&[1u8; 20])?; // page 0, 36 bytes left
        table.insert(&[2u8; 40])?; // page 1, 16 bytes left
        // Fits in page 0's leftover space, but only the last page is considered
        assert_eq!(table.insert(&[3u8; 20])?, PageId(2));

        let (records, _) = table.records()?;
        assert_eq!(records.len(), 3);
        assert_eq!(records[2], vec![3u8; 20]);

        Ok(())
    }

    #[test]
    fn test_persistence() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("test.tbl");

        {
            let table = HeapTable::open(&path, 64, 16)?;
            for i in 0..10u8 {
                table.insert(&[i; 20])?;
            }
            table.force()?;
            table.close()?;
        }

        let table = HeapTable::open(&path, 64, 16)?;
        let (records, _) = table.records()?;
        assert_eq!(records.len(), 10);
        for (i, record) in records.iter().enumerate() {
            assert_eq!(record, &vec![i as u8; 20]);
        }

        // Appends continue on the last page after reopening
        table.insert(&[99u8; 4])?;
        assert_eq!(table.records()?.0.len(), 11);

        Ok(())
    }

    #[test]
    fn test_scan_stops_at_corrupt_record() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("test.tbl");

        {
            let table = HeapTable::open(&path, 64, 16)?;
            table.insert(b"ok")?;
            table.insert(b"bad")?;
            table.insert(&[5u8; 45])?; // page 1
            table.close()?;
        }

        // Corrupt the length of the second record on page 0
        let mut bytes = std::fs::read(&path)?;
        bytes[10..14].copy_from_slice(&1000u32.to_be_bytes());
        std::fs::write(&path, &bytes)?;

        let table = HeapTable::open(&path, 64, 16)?;
        let (records, summary) = table.records()?;
        assert_eq!(records, vec![b"ok".to_vec(), vec![5u8; 45]]);
        assert_eq!(summary.records, 2);
        assert_eq!(summary.truncated_pages, vec![PageId(0)]);
        assert!(summary.ended_early());

        Ok(())
    }

    #[test]
    fn test_truncate() -> Result<()> {
        let (table, _dir) = create_test_table(64)?;

        for _ in 0..3 {
            table.insert(&[1u8; 30])?;
        }
        table.truncate()?;

        assert_eq!(table.page_count()?, 0);
        assert!(table.records()?.0.is_empty());

        // The table is usable again from page 0
        assert_eq!(table.insert(b"again")?, PageId(0));
        assert_eq!(table.records()?.0, vec![b"again".to_vec()]);

        Ok(())
    }

    #[test]
    fn test_small_cache_keeps_all_records() -> Result<()> {
        let dir = tempdir()?;
        let table = HeapTable::open(&dir.path().join("test.tbl"), 64, 2)?;

        for i in 0..50u8 {
            table.insert(&[i; 25])?;
        }
        assert_eq!(table.page_count()?, 25);

        let (records, _) = table.records()?;
        assert_eq!(records.len(), 50);
        assert!(records.iter().enumerate().all(|(i, r)| r == &vec![i as u8; 25]));

        Ok(())
    }

    #[test]
    fn test_concurrent_inserts() -> Result<()> {
        let (table, _dir) = create_test_table(256)?;
        let table = Arc::new(table);

        let handles: Vec<_> = (0..4u8)
            .map(|t| {
                let table = table.clone();
                std::thread::spawn(move || -> StorageResult<()> {
                    for i in 0..50u8 {
                        table.insert(&[t, i])?;
                    }
                    Ok(())
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("insert thread panicked")?;
        }

        let (records, summary) = table.records()?;
        assert_eq!(records.len(), 200);
        assert!(!summary.ended_early());

        // Each writer's records keep their relative order
        for t in 0..4u8 {
            let seq: Vec<u8> = records.iter().filter(|r| r[0] == t).map(|r| r[1]).collect();
            assert_eq!(seq, (0..50u8).collect::<Vec<_>>());
        }

        Ok(())
    }
}
