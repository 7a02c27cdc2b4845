//! Submission kinds accepted by the attendance service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::matrix::CellChange;
use crate::models::Decision;

/// Attendance form: a flight's roster for one training event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceForm {
    /// Raw training week, e.g. `TW-03` or `Week 3`
    pub training_week: String,
    /// Raw event type, e.g. `LLAB` or `Mando PT`
    pub event_type: String,
    /// Raw cadets cell: names or emails separated by newlines or `;`
    pub cadets: String,
    pub submitted_by_email: String,
    pub submitted_by_name: String,
    pub flight: String,
    pub submitted_at: DateTime<Utc>,
}

/// Excusal form filed by a cadet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcusalForm {
    /// Free-text event reference: id, column label or display name
    pub event: String,
    pub email: String,
    pub notes: String,
    pub submitted_at: DateTime<Utc>,
}

/// A commander's decision edit on an excusal request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionEdit {
    pub request_id: String,
    pub decision: Decision,
    pub decided_by: String,
    pub decided_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Submission {
    Attendance(AttendanceForm),
    ExcusalSubmit(ExcusalForm),
    ExcusalDecision(DecisionEdit),
}

impl Submission {
    pub fn kind(&self) -> &'static str {
        match self {
            Submission::Attendance(_) => "attendance",
            Submission::ExcusalSubmit(_) => "excusal",
            Submission::ExcusalDecision(_) => "decision",
        }
    }
}

/// What a submission did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionOutcome {
    /// Ledger entry id, `None` when nothing was appended
    pub submission_id: Option<String>,
    pub event_id: String,
    /// Directory emails the ledger entry applied to
    pub applied: Vec<String>,
    /// Tokens that did not resolve to a cadet
    pub missing: Vec<String>,
    /// Subset of `missing` shared by several cadets
    pub ambiguous: Vec<String>,
    /// Excusal request created or decided
    pub request_id: Option<String>,
    pub changes: Vec<CellChange>,
}

impl SubmissionOutcome {
    /// Some cadets were recorded while others could not be resolved
    pub fn is_partial(&self) -> bool {
        !self.applied.is_empty() && !self.missing.is_empty()
    }

    /// Nothing was appended: a repeated decision, or an excusal for a cell
    /// that already earns credit
    pub fn is_unchanged(&self) -> bool {
        self.submission_id.is_none()
    }
}
