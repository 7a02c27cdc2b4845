//! Data models for squadron attendance.
//!
//! - `Cadet`: Directory entry keyed by email
//! - `Event`, `EventType`, `EventStatus`: Catalog entries
//! - `AttendanceCode`, `AttendanceLogEntry`: Matrix codes and ledger facts
//! - `ExcusalRequest`, `Decision`: Excusal register rows

pub mod attendance;
pub mod cadet;
pub mod event;
pub mod excusal;

pub use attendance::{AttendanceCode, AttendanceLogEntry};
pub use cadet::Cadet;
pub use event::{normalize_training_week, Event, EventStatus, EventType};
pub use excusal::{Decision, ExcusalRequest, ExcusalStatus};
