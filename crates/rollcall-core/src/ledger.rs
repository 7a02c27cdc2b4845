//! Append-only attendance ledger.
//!
//! The ledger is the source of truth for the matrix. Entries are never
//! rewritten or removed, and replay always follows append order: a later
//! correction wins even if its `submitted_at` is older.

use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::models::AttendanceLogEntry;
use crate::store::{Table, TableId, TableStore};

#[derive(Clone)]
pub struct AttendanceLedger {
    store: Arc<dyn TableStore>,
}

impl AttendanceLedger {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    /// Durably append entries. Duplicates are legal.
    pub fn append(&self, entries: &[AttendanceLogEntry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        self.store
            .append_rows(TableId::AttendanceLog, &Table::encode(entries))?;
        debug!(count = entries.len(), "Appended ledger entries");
        Ok(())
    }

    /// Every valid entry in append order. Rows that fail to decode (a
    /// hand-entered typo, a missing event) are skipped with a warning; they
    /// stay in the table and count again once corrected.
    pub fn replay_all(&self) -> Result<Vec<AttendanceLogEntry>> {
        Ok(self
            .store
            .read_table(TableId::AttendanceLog)?
            .decode_lenient())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.replay_all()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Entries recorded against an event id, in append order
    pub fn entries_for_event(&self, event_id: &str) -> Result<Vec<AttendanceLogEntry>> {
        Ok(self
            .replay_all()?
            .into_iter()
            .filter(|e| e.event.eq_ignore_ascii_case(event_id))
            .collect())
    }

    /// Entries naming a cadet, in append order
    pub fn entries_for_cadet(&self, email: &str) -> Result<Vec<AttendanceLogEntry>> {
        Ok(self
            .replay_all()?
            .into_iter()
            .filter(|e| e.cadets.iter().any(|c| c.eq_ignore_ascii_case(email)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AttendanceCode;
    use crate::store::MemoryStore;
    use chrono::{Duration, Utc};

    fn entry(id: &str, event: &str, code: AttendanceCode, cadets: &[&str]) -> AttendanceLogEntry {
        AttendanceLogEntry {
            submission_id: id.to_string(),
            submitted_at: Utc::now(),
            event: event.to_string(),
            attendance_type: code,
            email: "cc@example.edu".to_string(),
            name: "Cadre, Carl".to_string(),
            flight: "Alpha".to_string(),
            cadets: cadets.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn test_replay_preserves_append_order_not_timestamps() {
        let ledger = AttendanceLedger::new(Arc::new(MemoryStore::new()));
        let mut late = entry("SUB-2", "EV-1", AttendanceCode::Ed, &["a@example.edu"]);
        late.submitted_at = Utc::now() - Duration::days(7);
        ledger
            .append(&[entry("SUB-1", "EV-1", AttendanceCode::P, &["a@example.edu"])])
            .unwrap();
        ledger.append(&[late]).unwrap();

        let ids: Vec<String> = ledger
            .replay_all()
            .unwrap()
            .into_iter()
            .map(|e| e.submission_id)
            .collect();
        assert_eq!(ids, vec!["SUB-1", "SUB-2"]);
    }

    #[test]
    fn test_duplicates_are_kept() {
        let ledger = AttendanceLedger::new(Arc::new(MemoryStore::new()));
        let e = entry("SUB-1", "EV-1", AttendanceCode::P, &["a@example.edu"]);
        ledger.append(&[e.clone(), e]).unwrap();
        assert_eq!(ledger.len().unwrap(), 2);
    }

    #[test]
    fn test_audit_queries() {
        let ledger = AttendanceLedger::new(Arc::new(MemoryStore::new()));
        ledger
            .append(&[
                entry("SUB-1", "EV-1", AttendanceCode::P, &["a@example.edu", "b@example.edu"]),
                entry("SUB-2", "EV-2", AttendanceCode::Er, &["b@example.edu"]),
            ])
            .unwrap();
        assert_eq!(ledger.entries_for_event("ev-1").unwrap().len(), 1);
        assert_eq!(ledger.entries_for_cadet("B@example.edu").unwrap().len(), 2);
        assert!(ledger.entries_for_cadet("c@example.edu").unwrap().is_empty());
    }

    #[test]
    fn test_empty_append_is_noop() {
        let ledger = AttendanceLedger::new(Arc::new(MemoryStore::new()));
        ledger.append(&[]).unwrap();
        assert!(ledger.is_empty().unwrap());
    }
}
