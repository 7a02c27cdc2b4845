//! Core library for Rollcall - the cadet squadron attendance engine.
//!
//! The attendance ledger is the source of truth. Every submission (attendance
//! form, excusal request, excusal decision) appends facts to the ledger, and the
//! matrix projector turns those facts into a cadet × event grid of attendance
//! codes with completion percentages.
//!
//! - `models`: Cadets, events, attendance codes, ledger entries, excusals
//! - `store`: Typed table store trait with memory and JSON file backends
//! - `directory`, `catalog`: Read-only cadet and event lookups
//! - `ledger`, `excusals`: Append-only fact log and excusal register
//! - `resolver`: Code state machine and free-text name resolution
//! - `matrix`: Projection of the ledger into the attendance matrix
//! - `service`: Lock-guarded entry point for submissions and rebuilds

pub mod catalog;
pub mod config;
pub mod directory;
pub mod error;
pub mod excusals;
pub mod ledger;
pub mod matrix;
pub mod models;
pub mod notify;
pub mod resolver;
pub mod service;
pub mod store;
pub mod submission;
pub mod utils;

pub use catalog::EventCatalog;
pub use config::Config;
pub use directory::Directory;
pub use error::{AttendanceError, Result};
pub use excusals::ExcusalRegister;
pub use ledger::AttendanceLedger;
pub use matrix::AttendanceMatrix;
pub use models::{
    AttendanceCode, AttendanceLogEntry, Cadet, Decision, Event, EventStatus, EventType, ExcusalRequest,
    ExcusalStatus,
};
pub use notify::{Notifier, NullNotifier, TracingNotifier};
pub use service::{AttendanceService, RebuildReport, ServiceOptions};
pub use store::{JsonFileStore, MemoryStore, StoreLock, Table, TableId, TableStore};
pub use submission::{AttendanceForm, DecisionEdit, ExcusalForm, Submission, SubmissionOutcome};
