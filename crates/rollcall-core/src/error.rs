use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::store::TableId;

#[derive(Error, Debug)]
pub enum AttendanceError {
    #[error("No published event matches training week '{training_week}' and type '{event_type}'")]
    EventNotFound {
        training_week: String,
        event_type: String,
    },

    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    #[error("Event reference '{reference}' matches several events: {}", candidates.join(", "))]
    AmbiguousEvent {
        reference: String,
        candidates: Vec<String>,
    },

    #[error("No cadets could be resolved from: {}", tokens.join(", "))]
    NoCadetsResolved { tokens: Vec<String> },

    #[error("Cadet not found in directory: {0}")]
    CadetNotFound(String),

    #[error("Excusal request not found: {0}")]
    ExcusalNotFound(String),

    #[error("Timed out after {}s waiting for the store lock", waited.as_secs())]
    LockTimeout { waited: Duration },

    #[error("Storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode table {table}: {source}")]
    Encoding {
        table: TableId,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid {table} row {row}: {message}")]
    InvalidRecord {
        table: TableId,
        row: usize,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, AttendanceError>;

/// Maximum number of tokens echoed back in an error message
const MAX_LISTED_TOKENS: usize = 20;

impl AttendanceError {
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AttendanceError::Storage {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_record(table: TableId, row: usize, message: impl Into<String>) -> Self {
        AttendanceError::InvalidRecord {
            table,
            row,
            message: message.into(),
        }
    }

    pub fn no_cadets(tokens: &[String]) -> Self {
        let mut listed: Vec<String> = tokens.iter().take(MAX_LISTED_TOKENS).cloned().collect();
        if tokens.len() > MAX_LISTED_TOKENS {
            listed.push(format!("... ({} total)", tokens.len()));
        }
        AttendanceError::NoCadetsResolved { tokens: listed }
    }

    /// Transient failures the caller should retry. Nothing was half-applied.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AttendanceError::LockTimeout { .. } | AttendanceError::Storage { .. }
        )
    }
}
