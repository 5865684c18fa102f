//! Journal Core - versioning and change-diffing engine
//!
//! Every mutation of a tracked entity (a journable) is captured as an
//! immutable, monotonically-numbered snapshot. This crate computes the
//! change set between consecutive snapshots and renders stored change sets
//! into audit-log sentences:
//! - Snapshot data model with a totally ordered value type
//! - Attribute and keyed sub-record association differs
//! - Formatter registry with render-time reference resolution
//! - Noop classification and in-memory journal history
//! - Error and logging facilities, TOML configuration

pub mod config;
pub mod diff;
pub mod errors;
pub mod journal;
pub mod logging_facility;
pub mod model;
pub mod noop;
pub mod render;

// Used by the logging macros
pub use journal_core_types;

// Re-export commonly used types
pub use config::JournalConfig;
pub use diff::{compute_change_set, ChangeEntry, ChangeSet, ChangeValue, DiffSpec};
pub use errors::{DiffError, JournalError, JournalErrorKind, Result};
pub use journal::{next_entry, InMemoryJournals, Journal, JournalEntry, JournalRepository};
pub use model::{JournableRef, Snapshot, SnapshotDraft, SubRecord, Value};
pub use noop::is_noop;
pub use render::{render, FormatterContext, FormatterRegistry};
