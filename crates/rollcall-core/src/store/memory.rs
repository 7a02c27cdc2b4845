//! In-memory table storage.
//!
//! Used by tests and by callers embedding the engine over their own substrate.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::Result;

use super::{StoreLock, Table, TableId, TableStore};

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<TableId, Table>>,
    lock: StoreLock,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a table, replacing any existing contents.
    pub fn with_table(self, table: TableId, contents: Table) -> Self {
        self.tables
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(table, contents);
        self
    }
}

impl TableStore for MemoryStore {
    fn read_table(&self, table: TableId) -> Result<Table> {
        let tables = self.tables.read().unwrap_or_else(|e| e.into_inner());
        Ok(tables.get(&table).cloned().unwrap_or_default())
    }

    fn write_table(&self, table: TableId, contents: &Table) -> Result<()> {
        let mut tables = self.tables.write().unwrap_or_else(|e| e.into_inner());
        tables.insert(table, contents.clone());
        Ok(())
    }

    fn append_rows(&self, table: TableId, rows: &Table) -> Result<()> {
        let mut tables = self.tables.write().unwrap_or_else(|e| e.into_inner());
        tables.entry(table).or_default().append_aligned(rows);
        Ok(())
    }

    fn lock(&self) -> StoreLock {
        self.lock.clone()
    }
}
