//! WAL writer implementation.
//!
//! The writer owns both log files and serializes every append and sync
//! through one lock, so the binary and text halves of a single call are
//! written back to back.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use bytes::{BufMut, BytesMut};
use log::debug;
use parking_lot::Mutex;

use super::record::WalEntry;
use crate::storage::error::StorageResult;

/// Binary log file name inside the WAL directory.
pub const WAL_BINARY_FILE: &str = "wal.log";

/// Text log file name inside the WAL directory.
pub const WAL_TEXT_FILE: &str = "wal.txt";

struct WalFiles {
    binary: File,
    text: File,
}

/// Append-only writer for the binary and text logs.
pub struct WalWriter {
    dir: PathBuf,
    files: Mutex<WalFiles>,
}

impl WalWriter {
    /// Open (or create) both log files inside `dir`, keeping existing contents.
    pub fn open(dir: &Path) -> StorageResult<Self> {
        fs::create_dir_all(dir)?;

        let files = WalFiles {
            binary: open_append(&dir.join(WAL_BINARY_FILE))?,
            text: open_append(&dir.join(WAL_TEXT_FILE))?,
        };

        debug!("opened WAL in {:?}", dir);
        Ok(Self {
            dir: dir.to_path_buf(),
            files: Mutex::new(files),
        })
    }

    pub fn binary_path(&self) -> PathBuf {
        self.dir.join(WAL_BINARY_FILE)
    }

    pub fn text_path(&self) -> PathBuf {
        self.dir.join(WAL_TEXT_FILE)
    }

    /// Append a raw record to the binary log as `[len:4][record]`.
    pub fn append(&self, record: &[u8]) -> StorageResult<()> {
        let mut files = self.files.lock();
        write_binary(&mut files.binary, record)
    }

    /// Append one line to the text log. The newline is added here.
    pub fn append_text(&self, line: &str) -> StorageResult<()> {
        let mut files = self.files.lock();
        write_text(&mut files.text, line)
    }

    /// Write an entry to both logs, text first, under a single lock.
    pub fn log(&self, entry: &WalEntry) -> StorageResult<()> {
        let line = entry.to_text_line();
        let record = entry.to_binary();

        let mut files = self.files.lock();
        write_text(&mut files.text, &line)?;
        write_binary(&mut files.binary, &record)
    }

    pub fn log_create_table(&self, table: &str) -> StorageResult<()> {
        self.log(&WalEntry::create_table(table))
    }

    pub fn log_drop_table(&self, table: &str) -> StorageResult<()> {
        self.log(&WalEntry::drop_table(table))
    }

    pub fn log_truncate(&self, table: &str) -> StorageResult<()> {
        self.log(&WalEntry::truncate(table))
    }

    pub fn log_insert(&self, table: &str, row: &[u8]) -> StorageResult<()> {
        self.log(&WalEntry::insert(table, row))
    }

    /// Force both log files to durable storage.
    pub fn sync(&self) -> StorageResult<()> {
        let files = self.files.lock();
        files.binary.sync_all()?;
        files.text.sync_all()?;
        Ok(())
    }

    /// Release both file handles without syncing.
    pub fn close(self) -> StorageResult<()> {
        debug!("closing WAL in {:?}", self.dir);
        Ok(())
    }
}

fn open_append(path: &Path) -> StorageResult<File> {
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

fn write_binary(file: &mut File, record: &[u8]) -> StorageResult<()> {
    let mut frame = BytesMut::with_capacity(4 + record.len());
    frame.put_u32(record.len() as u32);
    frame.put_slice(record);
    file.write_all(&frame)?;
    Ok(())
}

fn write_text(file: &mut File, line: &str) -> StorageResult<()> {
    let mut buf = String::with_capacity(line.len() + 1);
    buf.push_str(line);
    buf.push('\n');
    file.write_all(buf.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::wal::record::WalOp;
    use anyhow::Result;
    use byteorder::{BigEndian, ByteOrder};
    use tempfile::TempDir;

    fn create_test_wal() -> Result<(WalWriter, TempDir)> {
        let temp_dir = TempDir::new()?;
        let wal = WalWriter::open(temp_dir.path())?;
        Ok((wal, temp_dir))
    }

    /// Split the binary log into its length-prefixed records.
    fn binary_records(path: &Path) -> Result<Vec<Vec<u8>>> {
        let data = fs::read(path)?;
        let mut records = Vec::new();
        let mut pos = 0;
        while pos + 4 <= data.len() {
            let len = BigEndian::read_u32(&data[pos..pos + 4]) as usize;
            records.push(data[pos + 4..pos + 4 + len].to_vec());
            pos += 4 + len;
        }
        assert_eq!(pos, data.len());
        Ok(records)
    }

    fn text_lines(path: &Path) -> Result<Vec<String>> {
        Ok(fs::read_to_string(path)?.lines().map(str::to_string).collect())
    }

    #[test]
    fn test_open_creates_both_files() -> Result<()> {
        let (wal, _temp_dir) = create_test_wal()?;
        assert!(wal.binary_path().exists());
        assert!(wal.text_path().exists());
        Ok(())
    }

    #[test]
    fn test_append_raw_record() -> Result<()> {
        let (wal, _temp_dir) = create_test_wal()?;

        wal.append(b"hello")?;
        wal.append(b"")?;

        let data = fs::read(wal.binary_path())?;
        assert_eq!(data, vec![0, 0, 0, 5, b'h', b'e', b'l', b'l', b'o', 0, 0, 0, 0]);
        Ok(())
    }

    #[test]
    fn test_append_text() -> Result<()> {
        let (wal, _temp_dir) = create_test_wal()?;

        wal.append_text("first")?;
        wal.append_text("second")?;

        assert_eq!(fs::read_to_string(wal.text_path())?, "first\nsecond\n");
        Ok(())
    }

    #[test]
    fn test_insert_record_layout() -> Result<()> {
        let (wal, _temp_dir) = create_test_wal()?;

        wal.log_insert("users", &[1, 2, 3])?;

        let records = binary_records(&wal.binary_path())?;
        assert_eq!(records.len(), 1);
        let rec = &records[0];
        assert_eq!(rec[0], WalOp::Insert.opcode());
        assert_eq!(BigEndian::read_u32(&rec[1..5]), 5);
        assert_eq!(&rec[5..10], b"users");
        assert_eq!(BigEndian::read_u32(&rec[10..14]), 3);
        assert_eq!(&rec[14..], &[1, 2, 3]);

        let lines = text_lines(&wal.text_path())?;
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains(r#""op":"INSERT""#));
        assert!(lines[0].contains(r#""row":"AQID""#));
        Ok(())
    }

    #[test]
    fn test_logs_stay_parallel() -> Result<()> {
        let (wal, _temp_dir) = create_test_wal()?;

        wal.log_create_table("t")?;
        wal.log_insert("t", &[0, 0, 0, 7])?;
        wal.log_insert("t", &[0, 0, 0, 8])?;
        wal.log_truncate("t")?;
        wal.log_drop_table("t")?;
        wal.sync()?;

        let expected = [
            WalOp::CreateTable,
            WalOp::Insert,
            WalOp::Insert,
            WalOp::Truncate,
            WalOp::DropTable,
        ];

        let records = binary_records(&wal.binary_path())?;
        let lines = text_lines(&wal.text_path())?;
        assert_eq!(records.len(), expected.len());
        assert_eq!(lines.len(), expected.len());

        for ((record, line), op) in records.iter().zip(&lines).zip(expected) {
            assert_eq!(WalOp::from_u8(record[0]), Some(op));
            assert!(line.contains(&format!("\"op\":\"{}\"", op)));
            assert!(line.starts_with("{\"ts\":\""));
        }
        Ok(())
    }

    #[test]
    fn test_reopen_appends() -> Result<()> {
        let temp_dir = TempDir::new()?;

        {
            let wal = WalWriter::open(temp_dir.path())?;
            wal.log_create_table("a")?;
            wal.close()?;
        }
        {
            let wal = WalWriter::open(temp_dir.path())?;
            wal.log_create_table("b")?;
        }

        let wal = WalWriter::open(temp_dir.path())?;
        assert_eq!(binary_records(&wal.binary_path())?.len(), 2);

        let lines = text_lines(&wal.text_path())?;
        assert!(lines[0].ends_with(r#""table":"a"}"#));
        assert!(lines[1].ends_with(r#""table":"b"}"#));
        Ok(())
    }

    #[test]
    fn test_concurrent_appends_do_not_interleave() -> Result<()> {
        let (wal, _temp_dir) = create_test_wal()?;
        let wal = std::sync::Arc::new(wal);

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let wal = wal.clone();
                std::thread::spawn(move || -> Result<()> {
                    for i in 0..25u8 {
                        wal.log_insert(&format!("t{}", t), &[t as u8, i])?;
                    }
                    Ok(())
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("writer thread panicked")?;
        }

        assert_eq!(binary_records(&wal.binary_path())?.len(), 100);
        assert_eq!(text_lines(&wal.text_path())?.len(), 100);
        Ok(())
    }
}
