//! JSON file table storage.
//!
//! Each table lives in `<data_dir>/<table>.json`. The serialized form keeps the
//! spreadsheet convention: the first row holds the machine headers and data
//! rows follow it. Writes go through a temp file + rename.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AttendanceError, Result};

use super::{StoreLock, Table, TableId, TableStore};

/// Lock file held while a process mutates the data directory
const LOCK_FILE: &str = ".rollcall.lock";

/// On-disk form of a table: `values[0]` is the header row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredTable {
    pub saved_at: DateTime<Utc>,
    pub values: Vec<Vec<String>>,
}

impl StoredTable {
    pub fn new(table: &Table) -> Self {
        let mut values = Vec::with_capacity(table.rows.len() + 1);
        values.push(table.headers.clone());
        values.extend(table.rows.iter().cloned());
        Self {
            saved_at: Utc::now(),
            values,
        }
    }

    pub fn into_table(self) -> Table {
        let mut values = self.values.into_iter();
        let headers = values.next().unwrap_or_default();
        Table {
            headers,
            rows: values.collect(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.saved_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            format!("{}h ago", minutes / 60)
        } else {
            format!("{}d ago", minutes / 1440)
        }
    }
}

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    data_dir: PathBuf,
    lock: StoreLock,
}

impl JsonFileStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir).map_err(|e| AttendanceError::storage(&data_dir, e))?;
        let lock = StoreLock::for_directory(&data_dir, data_dir.join(LOCK_FILE));
        Ok(Self { data_dir, lock })
    }

    pub fn data_dir(&self) -> &PathBuf {
        &self.data_dir
    }

    fn table_path(&self, table: TableId) -> PathBuf {
        self.data_dir.join(format!("{}.json", table.name()))
    }

    fn temp_path(&self, table: TableId) -> PathBuf {
        self.data_dir.join(format!(".{}.json.tmp", table.name()))
    }

    /// Load the stored form of a table, `None` if it was never written.
    pub fn load(&self, table: TableId) -> Result<Option<StoredTable>> {
        let path = self.table_path(table);
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&path).map_err(|e| AttendanceError::storage(&path, e))?;
        let stored: StoredTable = serde_json::from_str(&contents)
            .map_err(|source| AttendanceError::Encoding { table, source })?;
        Ok(Some(stored))
    }

    fn save(&self, table: TableId, contents: &Table) -> Result<()> {
        let final_path = self.table_path(table);
        let temp_path = self.temp_path(table);

        let json = serde_json::to_string_pretty(&StoredTable::new(contents))
            .map_err(|source| AttendanceError::Encoding { table, source })?;

        {
            let mut file =
                fs::File::create(&temp_path).map_err(|e| AttendanceError::storage(&temp_path, e))?;
            file.write_all(json.as_bytes())
                .map_err(|e| AttendanceError::storage(&temp_path, e))?;
            file.sync_all()
                .map_err(|e| AttendanceError::storage(&temp_path, e))?;
        }

        fs::rename(&temp_path, &final_path).map_err(|e| AttendanceError::storage(&final_path, e))?;
        debug!(table = %table, rows = contents.len(), "Saved table");
        Ok(())
    }

    /// Age of every stored table, for status display.
    pub fn table_ages(&self) -> Vec<(TableId, Option<String>)> {
        TableId::ALL
            .iter()
            .map(|&table| {
                let age = match self.load(table) {
                    Ok(Some(stored)) => Some(stored.age_display()),
                    Ok(None) => None,
                    Err(e) => {
                        debug!(table = %table, error = %e, "Failed to load table for age display");
                        None
                    }
                };
                (table, age)
            })
            .collect()
    }
}

impl TableStore for JsonFileStore {
    fn read_table(&self, table: TableId) -> Result<Table> {
        Ok(self
            .load(table)?
            .map(StoredTable::into_table)
            .unwrap_or_default())
    }

    fn write_table(&self, table: TableId, contents: &Table) -> Result<()> {
        self.save(table, contents)
    }

    fn append_rows(&self, table: TableId, rows: &Table) -> Result<()> {
        let mut existing = self.read_table(table)?;
        existing.append_aligned(rows);
        self.save(table, &existing)
    }

    fn lock(&self) -> StoreLock {
        self.lock.clone()
    }
}
