use crate::access::{decode_row, encode_row, Column, HeapTable, Row, ScanSummary, TableSchema};
use crate::catalog::Catalog;
use crate::config::DatabaseConfig;
use crate::sql::Select;
use crate::storage::disk::MIN_PAGE_SIZE;
use crate::storage::{PageId, WalWriter};
use anyhow::{anyhow, bail, Context, Result};
use dashmap::DashMap;
use log::{debug, info, warn};
use std::fs::{self, OpenOptions};
use std::sync::Arc;

/// Rows read by a scan, together with what the heap reported about it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    pub rows: Vec<Row>,
    pub summary: ScanSummary,
}

impl ScanResult {
    /// True when some page held a record that could not be read, so rows
    /// after it on that page are missing from `rows`.
    pub fn ended_early(&self) -> bool {
        self.summary.ended_early()
    }
}

/// High-level database interface tying the catalog, table files and WAL together.
///
/// Each table lives in its own file under `data_dir/tables`. Tables are opened
/// lazily and kept open; operations on distinct tables never contend.
pub struct Database {
    config: DatabaseConfig,
    catalog: Catalog,
    wal: WalWriter,
    tables: DashMap<String, Arc<HeapTable>>,
}

impl Database {
    /// Open the database rooted at `config.data_dir`, creating directories as needed
    pub fn open(config: DatabaseConfig) -> Result<Self> {
        if config.page_size < MIN_PAGE_SIZE {
            bail!(
                "Page size {} is below the minimum of {} bytes",
                config.page_size,
                MIN_PAGE_SIZE
            );
        }

        fs::create_dir_all(config.tables_dir()).with_context(|| {
            format!("Failed to create data directory {:?}", config.data_dir)
        })?;
        let wal = WalWriter::open(&config.data_dir).context("Failed to open WAL")?;

        info!(
            "Opened database at {:?} (page size {}, cache {} pages)",
            config.data_dir, config.page_size, config.cache_pages
        );

        Ok(Self {
            config,
            catalog: Catalog::new(),
            wal,
            tables: DashMap::new(),
        })
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn wal(&self) -> &WalWriter {
        &self.wal
    }

    /// Register a table and create its (empty) file
    pub fn create_table(&self, name: &str, columns: Vec<Column>) -> Result<Arc<TableSchema>> {
        self.config.table_path(name)?;
        let schema = self.catalog.create_table(TableSchema::new(name, columns))?;
        if let Err(e) = self.open_table(name) {
            self.catalog.drop_table(name);
            return Err(e);
        }

        self.wal.log_create_table(name)?;
        self.sync_wal()?;

        debug!("Created table {}", schema);
        Ok(schema)
    }

    /// Remove every row of a table by cutting its file to zero length
    pub fn truncate_table(&self, name: &str) -> Result<()> {
        let path = self.config.table_path(name)?;

        let open = self.tables.get(name).map(|table| table.value().clone());
        match open {
            Some(table) => table
                .truncate()
                .with_context(|| format!("Failed to truncate table {}", name))?,
            None if path.exists() => {
                OpenOptions::new()
                    .write(true)
                    .open(&path)
                    .and_then(|file| file.set_len(0))
                    .with_context(|| format!("Failed to truncate {:?}", path))?;
            }
            None if self.catalog.get_table(name).is_some() => {}
            None => bail!("No such table: {}", name),
        }

        self.wal.log_truncate(name)?;
        self.sync_wal()?;

        debug!("Truncated table {}", name);
        Ok(())
    }

    /// Truncate a table, delete its file and forget its schema
    pub fn drop_table(&self, name: &str) -> Result<()> {
        self.truncate_table(name)?;

        self.tables.remove(name);
        let path = self.config.table_path(name)?;
        if path.exists() {
            fs::remove_file(&path).with_context(|| format!("Failed to delete {:?}", path))?;
        }
        self.catalog.drop_table(name);

        self.wal.log_drop_table(name)?;
        self.sync_wal()?;

        debug!("Dropped table {}", name);
        Ok(())
    }

    /// Encode a row against the table schema, append it and log the insert
    pub fn insert_row(&self, name: &str, row: &Row) -> Result<PageId> {
        let schema = self.schema(name)?;
        let record = encode_row(&schema, row)
            .with_context(|| format!("Failed to encode row for table {}", name))?;

        let page_id = self
            .open_table(name)?
            .insert(&record)
            .with_context(|| format!("Failed to insert into table {}", name))?;
        self.wal.log_insert(name, &record)?;

        Ok(page_id)
    }

    /// All readable rows of a table in insertion order
    pub fn scan(&self, name: &str) -> Result<ScanResult> {
        let schema = self.schema(name)?;
        let (records, summary) = self
            .open_table(name)?
            .records()
            .with_context(|| format!("Failed to scan table {}", name))?;

        let rows = records
            .iter()
            .map(|record| {
                decode_row(&schema, record)
                    .with_context(|| format!("Corrupt row in table {}", name))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ScanResult { rows, summary })
    }

    /// Rows of `select.table` matching its optional equality filter
    pub fn select(&self, select: &Select) -> Result<ScanResult> {
        let mut result = self.scan(&select.table)?;
        if let Some(filter) = &select.filter {
            result.rows.retain(|row| {
                row.get(&filter.column)
                    .is_some_and(|value| value.to_string() == filter.value)
            });
        }
        Ok(result)
    }

    /// One `{col=value, ...}` line per row, and the scan summary
    pub fn dump(&self, name: &str) -> Result<(String, ScanSummary)> {
        let result = self.scan(name)?;
        let text = result.rows.iter().map(|row| format!("{}\n", row)).collect();
        Ok((text, result.summary))
    }

    /// Last `n` lines of the text WAL
    pub fn wal_tail(&self, n: usize) -> Result<Vec<String>> {
        let path = self.wal.text_path();
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {:?}", path))?;
        let lines: Vec<&str> = content.lines().collect();
        let from = lines.len().saturating_sub(n);
        Ok(lines[from..].iter().map(|line| line.to_string()).collect())
    }

    /// Sync the WAL and force every open table to disk
    pub fn checkpoint(&self) -> Result<()> {
        self.wal.sync().context("Failed to sync WAL")?;
        for entry in self.tables.iter() {
            entry
                .value()
                .force()
                .with_context(|| format!("Failed to flush table {}", entry.key()))?;
        }
        Ok(())
    }

    /// Checkpoint, then close every table and the WAL
    pub fn close(self) -> Result<()> {
        self.checkpoint()?;

        for (name, table) in self.tables {
            match Arc::try_unwrap(table) {
                Ok(table) => table
                    .close()
                    .with_context(|| format!("Failed to close table {}", name))?,
                Err(_) => warn!("Table {} is still in use; left open", name),
            }
        }
        self.wal.close().context("Failed to close WAL")?;

        info!("Closed database at {:?}", self.config.data_dir);
        Ok(())
    }

    fn schema(&self, name: &str) -> Result<Arc<TableSchema>> {
        self.catalog
            .get_table(name)
            .ok_or_else(|| anyhow!("No such table: {}", name))
    }

    fn open_table(&self, name: &str) -> Result<Arc<HeapTable>> {
        if let Some(table) = self.tables.get(name) {
            return Ok(table.value().clone());
        }

        let table = HeapTable::open(
            &self.config.table_path(name)?,
            self.config.page_size,
            self.config.cache_pages,
        )
        .with_context(|| format!("Failed to open table file: {}", name))?;

        Ok(self
            .tables
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(table))
            .value()
            .clone())
    }

    fn sync_wal(&self) -> Result<()> {
        if self.config.sync_wal {
            self.wal.sync().context("Failed to sync WAL")?;
        }
        Ok(())
    }
}
