//! Projection of the attendance ledger into the cadet × event matrix.
//!
//! The matrix keeps one code per (cadet, event) pair, including pairs for
//! events without a column (drafts, archived events) and cadets missing from
//! the directory, so that incremental application and full replay always agree.
//! Catalog status is applied only when rendering: cancelled events show `N/A`
//! and only in-scope events count toward percentages.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::catalog::EventCatalog;
use crate::directory::Directory;
use crate::models::{AttendanceCode, AttendanceLogEntry, Event, EventType};
use crate::resolver::{resolve, Stimulus};
use crate::store::Table;
use crate::utils::format_percentage;

/// Fixed leading columns of the matrix artifact
pub const MATRIX_FIXED_COLUMNS: [&str; 7] = [
    "last_name",
    "first_name",
    "as_year",
    "flight",
    "squadron",
    "overall_attendance_pct",
    "llab_attendance_pct",
];

/// (lowercased cadet email, event id)
type CellKey = (String, String);

/// One cell changed by an incremental apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellChange {
    pub email: String,
    pub event_id: String,
    pub before: AttendanceCode,
    pub after: AttendanceCode,
}

/// A cell on which two projections disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellDrift {
    pub email: String,
    pub event_id: String,
    pub left: AttendanceCode,
    pub right: AttendanceCode,
}

/// Attendance aggregates for one cadet over in-scope events.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AttendanceSummary {
    pub credited: usize,
    pub recorded: usize,
    pub llab_credited: usize,
    pub llab_recorded: usize,
}

impl AttendanceSummary {
    /// Undefined (None) when nothing is recorded
    pub fn overall_pct(&self) -> Option<f64> {
        ratio(self.credited, self.recorded)
    }

    pub fn llab_pct(&self) -> Option<f64> {
        ratio(self.llab_credited, self.llab_recorded)
    }
}

fn ratio(numerator: usize, denominator: usize) -> Option<f64> {
    if denominator == 0 {
        None
    } else {
        Some(numerator as f64 / denominator as f64)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttendanceMatrix {
    cells: BTreeMap<CellKey, AttendanceCode>,
    applied: usize,
}

impl AttendanceMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replay the full ledger, in append order, from an empty matrix.
    pub fn rebuild(entries: &[AttendanceLogEntry], catalog: &EventCatalog) -> Self {
        let mut matrix = Self::new();
        for entry in entries {
            matrix.apply(entry, catalog);
        }
        debug!(entries = entries.len(), cells = matrix.cells.len(), "Rebuilt attendance matrix");
        matrix
    }

    /// Apply one ledger entry to the cells it names, leaving all others alone.
    pub fn apply(&mut self, entry: &AttendanceLogEntry, catalog: &EventCatalog) -> Vec<CellChange> {
        let event_id = event_key(&entry.event, catalog);
        let stimulus = Stimulus::from_mark(&entry.attendance_type);
        let mut changes = Vec::with_capacity(entry.cadets.len());

        for cadet in &entry.cadets {
            let key = (cadet.trim().to_lowercase(), event_id.clone());
            let before = self.cells.get(&key).cloned().unwrap_or_default();
            let after = resolve(&before, &stimulus);
            if after.is_unset() {
                self.cells.remove(&key);
            } else {
                self.cells.insert(key.clone(), after.clone());
            }
            changes.push(CellChange {
                email: key.0,
                event_id: event_id.clone(),
                before,
                after,
            });
        }
        self.applied += 1;
        changes
    }

    /// Number of ledger entries applied
    pub fn applied(&self) -> usize {
        self.applied
    }

    /// Stored code, ignoring catalog status
    pub fn raw_code(&self, email: &str, event_id: &str) -> AttendanceCode {
        self.cells
            .get(&(email.trim().to_lowercase(), event_id.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    /// Rendered code: cancelled events always show `N/A`
    pub fn cell(&self, email: &str, event: &Event) -> AttendanceCode {
        if event.is_cancelled() {
            AttendanceCode::NotApplicable
        } else {
            self.raw_code(email, &event.event_id)
        }
    }

    pub fn summary(&self, email: &str, catalog: &EventCatalog) -> AttendanceSummary {
        let mut summary = AttendanceSummary::default();
        for event in catalog.in_scope() {
            let code = self.cell(email, event);
            if !code.is_recorded() {
                continue;
            }
            let credit = code.is_credit();
            summary.recorded += 1;
            summary.credited += usize::from(credit);
            if event.event_type == EventType::Llab {
                summary.llab_recorded += 1;
                summary.llab_credited += usize::from(credit);
            }
        }
        summary
    }

    /// Render the matrix artifact: one row per directory cadet, one column
    /// per event with a column.
    pub fn to_table(&self, directory: &Directory, catalog: &EventCatalog) -> Table {
        let columns = catalog.columns();
        let mut headers: Vec<String> = MATRIX_FIXED_COLUMNS.iter().map(|h| h.to_string()).collect();
        headers.extend(columns.iter().map(|e| e.column_label().to_string()));

        let rows = directory
            .sorted()
            .into_iter()
            .map(|cadet| {
                let summary = self.summary(&cadet.email, catalog);
                let mut row = vec![
                    cadet.last_name.clone(),
                    cadet.first_name.clone(),
                    cadet.as_year.clone(),
                    cadet.flight.clone(),
                    cadet.squadron.clone(),
                    format_percentage(summary.overall_pct()),
                    format_percentage(summary.llab_pct()),
                ];
                row.extend(columns.iter().map(|e| self.cell(&cadet.email, e).to_string()));
                row
            })
            .collect();

        Table { headers, rows }
    }

    /// Cells on which `self` and `other` disagree
    pub fn drift(&self, other: &AttendanceMatrix) -> Vec<CellDrift> {
        let keys: BTreeSet<&CellKey> = self.cells.keys().chain(other.cells.keys()).collect();
        keys.into_iter()
            .filter_map(|key| {
                let left = self.cells.get(key).cloned().unwrap_or_default();
                let right = other.cells.get(key).cloned().unwrap_or_default();
                (left != right).then(|| CellDrift {
                    email: key.0.clone(),
                    event_id: key.1.clone(),
                    left,
                    right,
                })
            })
            .collect()
    }
}

/// Cell key for a ledger event reference: the catalog event id when the
/// reference resolves, else the trimmed reference itself.
fn event_key(reference: &str, catalog: &EventCatalog) -> String {
    match catalog.lookup(reference) {
        Ok(event) => event.event_id.clone(),
        Err(e) => {
            debug!(reference = %reference, error = %e, "Ledger event not in catalog");
            reference.trim().to_string()
        }
    }
}
