use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AttendanceError, Result};
use crate::store::{Record, TableId, TableRecord};
use crate::utils::{format_timestamp, parse_timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExcusalStatus {
    Pending,
    Approved,
    Denied,
}

impl ExcusalStatus {
    pub fn parse(raw: &str) -> Self {
        match Decision::parse(raw) {
            Some(Decision::Approved) => ExcusalStatus::Approved,
            Some(Decision::Denied) => ExcusalStatus::Denied,
            None => ExcusalStatus::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExcusalStatus::Pending)
    }
}

impl std::fmt::Display for ExcusalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExcusalStatus::Pending => write!(f, "Pending"),
            ExcusalStatus::Approved => write!(f, "Approved"),
            ExcusalStatus::Denied => write!(f, "Denied"),
        }
    }
}

/// A commander's decision on an excusal request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Approved,
    Denied,
}

impl Decision {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "approved" | "approve" | "a" | "yes" | "y" => Some(Decision::Approved),
            "denied" | "deny" | "d" | "no" | "n" => Some(Decision::Denied),
            _ => None,
        }
    }

    pub fn status(&self) -> ExcusalStatus {
        match self {
            Decision::Approved => ExcusalStatus::Approved,
            Decision::Denied => ExcusalStatus::Denied,
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::Approved => write!(f, "Approved"),
            Decision::Denied => write!(f, "Denied"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcusalRequest {
    pub request_id: String,
    /// Event id
    pub event: String,
    pub email: String,
    pub last_name: String,
    pub first_name: String,
    pub flight: String,
    pub squadron: String,
    pub status: ExcusalStatus,
    pub decision: Option<Decision>,
    pub decided_by: String,
    pub decided_at: Option<DateTime<Utc>>,
    /// Cell code the latest decision produced
    pub attendance_effect: String,
    pub submitted_at: DateTime<Utc>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub notes: String,
}

impl ExcusalRequest {
    pub fn display_name(&self) -> String {
        format!("{}, {}", self.last_name, self.first_name)
    }
}

impl TableRecord for ExcusalRequest {
    const TABLE: TableId = TableId::Excusals;
    const SCHEMA: &'static [&'static str] = &[
        "request_id",
        "event",
        "email",
        "last_name",
        "first_name",
        "flight",
        "squadron",
        "status",
        "decision",
        "decided_by",
        "decided_at",
        "attendance_effect",
        "submitted_at",
        "last_updated_at",
        "notes",
    ];

    fn from_record(record: &Record<'_>) -> Result<Self> {
        let request_id = record.get("request_id");
        if request_id.is_empty() {
            return Err(AttendanceError::invalid_record(
                Self::TABLE,
                record.index(),
                "missing request_id",
            ));
        }
        let submitted_raw = record.get("submitted_at");
        let submitted_at = parse_timestamp(submitted_raw).ok_or_else(|| {
            AttendanceError::invalid_record(
                Self::TABLE,
                record.index(),
                format!("unparseable submitted_at '{}'", submitted_raw),
            )
        })?;

        Ok(Self {
            request_id: request_id.to_string(),
            event: record.get("event").to_string(),
            email: record.get("email").to_string(),
            last_name: record.get("last_name").to_string(),
            first_name: record.get("first_name").to_string(),
            flight: record.get("flight").to_string(),
            squadron: record.get("squadron").to_string(),
            status: ExcusalStatus::parse(record.get("status")),
            decision: Decision::parse(record.get("decision")),
            decided_by: record.get("decided_by").to_string(),
            decided_at: parse_timestamp(record.get("decided_at")),
            attendance_effect: record.get("attendance_effect").to_string(),
            submitted_at,
            last_updated_at: parse_timestamp(record.get("last_updated_at")),
            notes: record.get("notes").to_string(),
        })
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            self.request_id.clone(),
            self.event.clone(),
            self.email.clone(),
            self.last_name.clone(),
            self.first_name.clone(),
            self.flight.clone(),
            self.squadron.clone(),
            self.status.to_string(),
            self.decision.map(|d| d.to_string()).unwrap_or_default(),
            self.decided_by.clone(),
            format_timestamp(&self.decided_at),
            self.attendance_effect.clone(),
            self.submitted_at.to_rfc3339(),
            format_timestamp(&self.last_updated_at),
            self.notes.clone(),
        ]
    }
}
