//! Snapshot data model: values, sub-records, snapshots and their drafts

pub mod snapshot;
pub mod value;

pub use snapshot::{JournableRef, Snapshot, SnapshotDraft, SubRecord};
pub use value::Value;
