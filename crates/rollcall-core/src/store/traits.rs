//! Backing store contract for the attendance tables.

use std::sync::Arc;

use crate::error::Result;

use super::{StoreLock, Table, TableId};

/// Trait for table storage backends.
///
/// The backing store has no row-level transactions: writes replace a whole
/// table or append a block of rows. Callers serialize mutations by holding
/// the store's `lock()` for the whole read-modify-write sequence.
pub trait TableStore: Send + Sync {
    /// Read a table. A table that was never written reads as empty.
    fn read_table(&self, table: TableId) -> Result<Table>;

    /// Replace the full contents of a table.
    fn write_table(&self, table: TableId, contents: &Table) -> Result<()>;

    /// Append rows, aligning columns by header name.
    fn append_rows(&self, table: TableId, rows: &Table) -> Result<()>;

    /// The write lock shared by every handle to this store.
    fn lock(&self) -> StoreLock;
}

impl<T: TableStore + ?Sized> TableStore for Arc<T> {
    fn read_table(&self, table: TableId) -> Result<Table> {
        (**self).read_table(table)
    }

    fn write_table(&self, table: TableId, contents: &Table) -> Result<()> {
        (**self).write_table(table, contents)
    }

    fn append_rows(&self, table: TableId, rows: &Table) -> Result<()> {
        (**self).append_rows(table, rows)
    }

    fn lock(&self) -> StoreLock {
        (**self).lock()
    }
}

/// Shared checks for TableStore implementations.
#[cfg(test)]
pub mod tests {
    use super::*;

    pub fn test_table_store_contract<S: TableStore>(store: &S) {
        // Unwritten tables read as empty
        let empty = store.read_table(TableId::AttendanceLog).unwrap();
        assert!(empty.is_empty());

        let mut first = Table::new(&["submission_id", "event"]);
        first.rows.push(vec!["SUB-1".into(), "EV-1".into()]);
        store.append_rows(TableId::AttendanceLog, &first).unwrap();

        let mut second = Table::new(&["event", "submission_id"]);
        second.rows.push(vec!["EV-2".into(), "SUB-2".into()]);
        store.append_rows(TableId::AttendanceLog, &second).unwrap();

        let log = store.read_table(TableId::AttendanceLog).unwrap();
        assert_eq!(log.headers, vec!["submission_id", "event"]);
        assert_eq!(log.rows[0], vec!["SUB-1", "EV-1"]);
        assert_eq!(log.rows[1], vec!["SUB-2", "EV-2"]);

        // Full replace
        let replacement = Table::new(&["submission_id", "event"]);
        store.write_table(TableId::AttendanceLog, &replacement).unwrap();
        assert!(store.read_table(TableId::AttendanceLog).unwrap().is_empty());

        // Tables are independent
        assert!(store.read_table(TableId::Excusals).unwrap().is_empty());
    }
}
