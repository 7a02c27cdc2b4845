//! Typed table abstraction over header-keyed rows.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;

/// The tables the attendance engine reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TableId {
    Directory,
    Events,
    AttendanceLog,
    Excusals,
    AttendanceMatrix,
}

impl TableId {
    pub const ALL: [TableId; 5] = [
        TableId::Directory,
        TableId::Events,
        TableId::AttendanceLog,
        TableId::Excusals,
        TableId::AttendanceMatrix,
    ];

    /// Machine name, also used as the backing file stem.
    pub fn name(&self) -> &'static str {
        match self {
            TableId::Directory => "directory",
            TableId::Events => "events",
            TableId::AttendanceLog => "attendance_log",
            TableId::Excusals => "excusals",
            TableId::AttendanceMatrix => "attendance_matrix",
        }
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A table of string cells keyed by a header row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn column(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    pub fn has_column(&self, header: &str) -> bool {
        self.column(header).is_some()
    }

    /// Iterate rows as header-keyed records. Blank rows are skipped.
    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.iter().any(|cell| !cell.trim().is_empty()))
            .map(move |(index, values)| Record {
                headers: &self.headers,
                values,
                index,
            })
    }

    /// Append the rows of `other`, matching columns by header name.
    ///
    /// An empty table adopts `other`'s headers. Headers unknown to this table
    /// are added at the end so no appended value is dropped.
    pub fn append_aligned(&mut self, other: &Table) {
        if self.headers.is_empty() {
            self.headers = other.headers.clone();
        }
        for header in &other.headers {
            if !self.has_column(header) {
                self.headers.push(header.clone());
                for row in &mut self.rows {
                    row.push(String::new());
                }
            }
        }

        let mapping: Vec<usize> = other
            .headers
            .iter()
            .filter_map(|h| self.column(h))
            .collect();

        for source in &other.rows {
            let mut row = vec![String::new(); self.headers.len()];
            for (value, &target) in source.iter().zip(mapping.iter()) {
                row[target] = value.clone();
            }
            self.rows.push(row);
        }
    }

    /// Decode every non-blank row into `T`.
    pub fn decode<T: TableRecord>(&self) -> Result<Vec<T>> {
        self.records().map(|record| T::from_record(&record)).collect()
    }

    /// Decode every non-blank row into `T`, skipping rows that fail to decode.
    pub fn decode_lenient<T: TableRecord>(&self) -> Vec<T> {
        self.records()
            .filter_map(|record| match T::from_record(&record) {
                Ok(item) => Some(item),
                Err(e) => {
                    warn!(table = %T::TABLE, row = record.index(), error = %e, "Skipping invalid row");
                    None
                }
            })
            .collect()
    }

    /// Encode `items` into a table with `T`'s schema.
    pub fn encode<'a, T: TableRecord + 'a>(items: impl IntoIterator<Item = &'a T>) -> Table {
        let mut table = Table::new(T::SCHEMA);
        table.rows = items.into_iter().map(|item| item.to_row()).collect();
        table
    }
}

/// One row of a table viewed through its header row.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    headers: &'a [String],
    values: &'a [String],
    index: usize,
}

impl<'a> Record<'a> {
    /// Trimmed cell value for `header`; empty if the column is missing.
    pub fn get(&self, header: &str) -> &'a str {
        self.headers
            .iter()
            .position(|h| h == header)
            .and_then(|i| self.values.get(i))
            .map(|v| v.trim())
            .unwrap_or("")
    }

    pub fn has(&self, header: &str) -> bool {
        self.headers.iter().any(|h| h == header)
    }

    /// Zero-based data row index, for error messages.
    pub fn index(&self) -> usize {
        self.index
    }
}

/// A typed row with a fixed machine-header schema.
pub trait TableRecord: Sized {
    const TABLE: TableId;
    const SCHEMA: &'static [&'static str];

    fn from_record(record: &Record<'_>) -> Result<Self>;

    /// Cell values in `SCHEMA` order.
    fn to_row(&self) -> Vec<String>;
}
