//! Database configuration.

use crate::storage::{DEFAULT_CACHE_PAGES, DEFAULT_PAGE_SIZE};
use anyhow::{bail, Result};
use std::path::PathBuf;

/// Name of the directory holding table files inside the data directory.
pub const TABLES_DIR: &str = "tables";

/// Extension of table files.
pub const TABLE_FILE_EXTENSION: &str = "tbl";

/// Database configuration.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Root directory for table files and the WAL.
    pub data_dir: PathBuf,
    /// Page size of every table file, in bytes.
    pub page_size: usize,
    /// Maximum number of pages cached per open table.
    pub cache_pages: usize,
    /// Whether to fsync the WAL after every catalog operation.
    pub sync_wal: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            data_dir: PathBuf::from("./data"),
            page_size: DEFAULT_PAGE_SIZE,
            cache_pages: DEFAULT_CACHE_PAGES,
            sync_wal: true,
        }
    }
}

impl DatabaseConfig {
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        DatabaseConfig {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    pub fn tables_dir(&self) -> PathBuf {
        self.data_dir.join(TABLES_DIR)
    }

    /// File backing `table`. Names that could reach outside the tables
    /// directory are rejected.
    pub fn table_path(&self, table: &str) -> Result<PathBuf> {
        if table.is_empty()
            || table == "."
            || table == ".."
            || table.contains(|c: char| matches!(c, '/' | '\\' | '\0'))
        {
            bail!("Invalid table name: {:?}", table);
        }
        Ok(self
            .tables_dir()
            .join(format!("{}.{}", table, TABLE_FILE_EXTENSION)))
    }
}
