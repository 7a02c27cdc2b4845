//! Table storage for the attendance engine.
//!
//! The backing store is a plain table substrate: whole-table reads, whole-table
//! replaces, and row appends. `TableRecord` maps typed rows to and from the
//! fixed machine-header schemas.

pub mod file;
pub mod lock;
pub mod memory;
pub mod table;
pub mod traits;

pub use file::{JsonFileStore, StoredTable};
pub use lock::{StoreGuard, StoreLock};
pub use memory::MemoryStore;
pub use table::{Record, Table, TableId, TableRecord};
pub use traits::TableStore;
