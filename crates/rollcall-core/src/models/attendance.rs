use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AttendanceError, Result};
use crate::store::{Record, TableId, TableRecord};
use crate::utils::parse_timestamp;

/// Attendance code held by one matrix cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AttendanceCode {
    #[default]
    Unset,
    /// Present
    P,
    /// Excused
    E,
    /// Excused, special
    Es,
    /// Excusal requested
    Er,
    /// Excusal denied
    Ed,
    /// Tardy
    T,
    /// Unexcused
    U,
    /// Unexcused, excusal requested
    Ur,
    /// Make-up
    Mu,
    /// Make-up, recorded separately
    Mrs,
    /// Event cancelled
    NotApplicable,
    /// Unrecognized non-empty code, kept verbatim
    Other(String),
}

/// Known codes, longest first so `ED` never classifies as `E`.
const KNOWN_CODES: [(&str, AttendanceCode); 11] = [
    ("MRS", AttendanceCode::Mrs),
    ("N/A", AttendanceCode::NotApplicable),
    ("ES", AttendanceCode::Es),
    ("ER", AttendanceCode::Er),
    ("ED", AttendanceCode::Ed),
    ("UR", AttendanceCode::Ur),
    ("MU", AttendanceCode::Mu),
    ("P", AttendanceCode::P),
    ("E", AttendanceCode::E),
    ("T", AttendanceCode::T),
    ("U", AttendanceCode::U),
];

impl AttendanceCode {
    /// Classify cell text by its longest known prefix (`P1` is `P`, `ES-late` is `ES`).
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return AttendanceCode::Unset;
        }
        let upper = trimmed.to_ascii_uppercase();
        KNOWN_CODES
            .iter()
            .find(|(prefix, _)| upper.starts_with(prefix))
            .map(|(_, code)| code.clone())
            .unwrap_or_else(|| AttendanceCode::Other(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        match self {
            AttendanceCode::Unset => "",
            AttendanceCode::P => "P",
            AttendanceCode::E => "E",
            AttendanceCode::Es => "ES",
            AttendanceCode::Er => "ER",
            AttendanceCode::Ed => "ED",
            AttendanceCode::T => "T",
            AttendanceCode::U => "U",
            AttendanceCode::Ur => "UR",
            AttendanceCode::Mu => "MU",
            AttendanceCode::Mrs => "MRS",
            AttendanceCode::NotApplicable => "N/A",
            AttendanceCode::Other(raw) => raw,
        }
    }

    /// Counts toward the attendance percentage numerator
    pub fn is_credit(&self) -> bool {
        matches!(
            self,
            AttendanceCode::P
                | AttendanceCode::E
                | AttendanceCode::Es
                | AttendanceCode::Mu
                | AttendanceCode::Mrs
        )
    }

    /// Counts toward the denominator: any non-empty, non-N/A code
    pub fn is_recorded(&self) -> bool {
        !matches!(self, AttendanceCode::Unset | AttendanceCode::NotApplicable)
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, AttendanceCode::Unset)
    }
}

impl std::fmt::Display for AttendanceCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One append-only fact in the attendance ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceLogEntry {
    pub submission_id: String,
    pub submitted_at: DateTime<Utc>,
    /// Event id (or a free-text reference in hand-entered rows)
    pub event: String,
    /// `P`, `ER`, `E` and `ED` are replayed as stimuli; other codes are set directly
    pub attendance_type: AttendanceCode,
    /// Submitter
    pub email: String,
    pub name: String,
    pub flight: String,
    /// Cadet emails the fact applies to
    pub cadets: Vec<String>,
}

/// Separator for the `cadets` column
const CADET_SEPARATOR: char = ';';

impl TableRecord for AttendanceLogEntry {
    const TABLE: TableId = TableId::AttendanceLog;
    const SCHEMA: &'static [&'static str] = &[
        "submission_id",
        "submitted_at",
        "event",
        "attendance_type",
        "email",
        "name",
        "flight",
        "cadets",
    ];

    fn from_record(record: &Record<'_>) -> Result<Self> {
        let invalid = |message: String| {
            AttendanceError::invalid_record(Self::TABLE, record.index(), message)
        };

        let submitted_raw = record.get("submitted_at");
        let submitted_at = parse_timestamp(submitted_raw)
            .ok_or_else(|| invalid(format!("unparseable submitted_at '{}'", submitted_raw)))?;

        let attendance_type = AttendanceCode::parse(record.get("attendance_type"));
        if attendance_type.is_unset() {
            return Err(invalid("missing attendance_type".to_string()));
        }

        let event = record.get("event");
        if event.is_empty() {
            return Err(invalid("missing event".to_string()));
        }

        let cadets = record
            .get("cadets")
            .split(CADET_SEPARATOR)
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            submission_id: record.get("submission_id").to_string(),
            submitted_at,
            event: event.to_string(),
            attendance_type,
            email: record.get("email").to_string(),
            name: record.get("name").to_string(),
            flight: record.get("flight").to_string(),
            cadets,
        })
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            self.submission_id.clone(),
            self.submitted_at.to_rfc3339(),
            self.event.clone(),
            self.attendance_type.to_string(),
            self.email.clone(),
            self.name.clone(),
            self.flight.clone(),
            self.cadets.join(&CADET_SEPARATOR.to_string()),
        ]
    }
}
