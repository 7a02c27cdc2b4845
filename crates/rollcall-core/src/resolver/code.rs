//! Attendance code state machine.
//!
//! `resolve` maps the current cell value and an incoming stimulus to the next
//! cell value. It is pure, so replaying the ledger through it reproduces the
//! matrix exactly.

use crate::models::{AttendanceCode, Decision};

/// Something that happened to a (cadet, event) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stimulus {
    /// Attendance form marked the cadet present
    Present,
    /// Cadet submitted an excusal request
    ExcusalSubmitted,
    /// Commander decided an excusal request
    Decided(Decision),
    /// A code asserted directly, applied unconditionally
    Set(AttendanceCode),
}

impl Stimulus {
    /// Interpret a ledger `attendance_type`. The four stimulus marks replay
    /// through the state machine; any other code is a direct assertion.
    pub fn from_mark(mark: &AttendanceCode) -> Self {
        match mark {
            AttendanceCode::P => Stimulus::Present,
            AttendanceCode::Er => Stimulus::ExcusalSubmitted,
            AttendanceCode::E => Stimulus::Decided(Decision::Approved),
            AttendanceCode::Ed => Stimulus::Decided(Decision::Denied),
            other => Stimulus::Set(other.clone()),
        }
    }

    /// The ledger `attendance_type` recorded for this stimulus
    pub fn mark(&self) -> AttendanceCode {
        match self {
            Stimulus::Present => AttendanceCode::P,
            Stimulus::ExcusalSubmitted => AttendanceCode::Er,
            Stimulus::Decided(Decision::Approved) => AttendanceCode::E,
            Stimulus::Decided(Decision::Denied) => AttendanceCode::Ed,
            Stimulus::Set(code) => code.clone(),
        }
    }
}

/// Next code for a cell.
///
/// An excusal submitted against a cell that already earns credit leaves it
/// unchanged, and `UR` stays `UR`. Any other value becomes `ER`.
pub fn resolve(current: &AttendanceCode, stimulus: &Stimulus) -> AttendanceCode {
    match stimulus {
        Stimulus::Present => AttendanceCode::P,
        Stimulus::ExcusalSubmitted => match current {
            AttendanceCode::U | AttendanceCode::Ur => AttendanceCode::Ur,
            credited if credited.is_credit() => credited.clone(),
            _ => AttendanceCode::Er,
        },
        Stimulus::Decided(Decision::Approved) => AttendanceCode::E,
        Stimulus::Decided(Decision::Denied) => match current {
            AttendanceCode::Ur => AttendanceCode::U,
            _ => AttendanceCode::Ed,
        },
        Stimulus::Set(code) => code.clone(),
    }
}
