//! In-memory table catalog.
//!
//! Maps table names to their schemas. The catalog is not persisted; a
//! reopened database starts with an empty catalog even if table files exist.

use crate::access::TableSchema;
use anyhow::{bail, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct Catalog {
    tables: RwLock<HashMap<String, Arc<TableSchema>>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema under its table name
    pub fn create_table(&self, schema: TableSchema) -> Result<Arc<TableSchema>> {
        let mut tables = self.tables.write();
        if tables.contains_key(schema.name()) {
            bail!("Table exists: {}", schema.name());
        }

        let schema = Arc::new(schema);
        tables.insert(schema.name().to_string(), schema.clone());
        Ok(schema)
    }

    /// Get table schema by name
    pub fn get_table(&self, name: &str) -> Option<Arc<TableSchema>> {
        self.tables.read().get(name).cloned()
    }

    /// Remove a table, returning its schema if it existed
    pub fn drop_table(&self, name: &str) -> Option<Arc<TableSchema>> {
        self.tables.write().remove(name)
    }

    /// All schemas, sorted by table name
    pub fn list_tables(&self) -> Vec<Arc<TableSchema>> {
        let mut tables: Vec<_> = self.tables.read().values().cloned().collect();
        tables.sort_by(|a, b| a.name().cmp(b.name()));
        tables
    }

    /// One `name(col TYPE, ...)` line per table
    pub fn describe(&self) -> String {
        self.list_tables()
            .iter()
            .map(|schema| format!("{}\n", schema))
            .collect()
    }
}
