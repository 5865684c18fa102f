//! Journal diff engine.
//!
//! Compares a snapshot with its predecessor and produces a flat
//! [`ChangeSet`] keyed by attribute name or by association key.
//!
//! ```
//! use chrono::Utc;
//! use journal_core::diff::{AttributeSpec, DiffSpec};
//! use journal_core::model::{JournableRef, Snapshot, SnapshotDraft};
//!
//! let wp = JournableRef::new("WorkPackage", "1");
//! let spec = DiffSpec::new().attribute(AttributeSpec::text("subject"));
//! let v1 = Snapshot::from_draft(SnapshotDraft::new(wp.clone()).attribute("subject", "a"), 1, Utc::now());
//! let v2 = Snapshot::from_draft(SnapshotDraft::new(wp).attribute("subject", "b"), 2, Utc::now());
//!
//! let changes = spec.compute(Some(&v1), &v2).unwrap();
//! assert!(changes.contains_key("subject"));
//! ```
//!
//! ## Guarantees
//!
//! - **Idempotence**: a snapshot compared with itself yields an empty set.
//! - **Symmetry**: swapping the snapshots reports the same keys with old and
//!   new swapped.
//! - **Order invariance**: reordering sub-records never produces a change.

pub mod association;
pub mod attribute;
pub mod engine;
pub mod model;
pub mod spec;

pub use association::{diff_association, diff_collections};
pub use attribute::diff_attribute;
pub use engine::compute_change_set;
pub use model::{ChangeEntry, ChangeSet, ChangeValue};
pub use spec::{
    AssociationSpec, AttributeSpec, DiffSpec, KeyMode, Multiplicity, ReferenceKind, SemanticTag,
    SemanticType,
};
