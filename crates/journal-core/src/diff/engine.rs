//! Change set computation.
//!
//! The entry point is [`compute_change_set`], which runs every attribute and
//! association differ over a snapshot and its predecessor and merges their
//! entries into one [`ChangeSet`].

use crate::diff::association::diff_association;
use crate::diff::attribute::diff_attribute;
use crate::diff::model::ChangeSet;
use crate::diff::spec::{AssociationSpec, AttributeSpec};
use crate::errors::{DiffError, Result};
use crate::model::Snapshot;
use crate::{log_op_end, log_op_error, log_op_start};

/// Compute the changes from `old` to `new`.
///
/// `old` is `None` for the first snapshot of a journable. Pure and
/// synchronous: no I/O, no locking. Calling it twice with the same inputs
/// gives the same change set.
///
/// # Errors
///
/// - `JournableMismatch` when the snapshots belong to different journables
/// - `UnknownAttribute` / `UnknownAssociation` when a spec names something
///   neither snapshot defines
/// - `DuplicateKey` when two specs emit the same key
pub fn compute_change_set(
    old: Option<&Snapshot>,
    new: &Snapshot,
    attributes: &[AttributeSpec],
    associations: &[AssociationSpec],
) -> Result<ChangeSet> {
    let op = "compute_change_set";
    log_op_start!(
        op,
        journable_type = %new.journable().journable_type,
        journable_id = %new.journable().journable_id,
        version = new.version()
    );
    let start = std::time::Instant::now();

    let changes = build(old, new, attributes, associations).map_err(|e| {
        log_op_error!(op, e.clone(), duration_ms = start.elapsed().as_millis() as u64);
        e
    })?;

    log_op_end!(
        op,
        duration_ms = start.elapsed().as_millis() as u64,
        change_count = changes.len()
    );
    Ok(changes)
}

fn build(
    old: Option<&Snapshot>,
    new: &Snapshot,
    attributes: &[AttributeSpec],
    associations: &[AssociationSpec],
) -> Result<ChangeSet> {
    if let Some(old) = old {
        if old.journable() != new.journable() {
            return Err(DiffError::JournableMismatch {
                expected: new.journable().to_string(),
                actual: old.journable().to_string(),
            });
        }
    }

    let mut changes = ChangeSet::new();
    for attribute in attributes {
        if let Some(entry) = diff_attribute(old, new, &attribute.name)? {
            changes.insert(entry)?;
        }
    }
    for association in associations {
        for entry in diff_association(old, new, association)? {
            changes.insert(entry)?;
        }
    }
    Ok(changes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::spec::{AttributeSpec, SemanticType};
    use crate::model::{JournableRef, SnapshotDraft, SubRecord};
    use chrono::Utc;

    fn wp(id: &str) -> SnapshotDraft {
        SnapshotDraft::new(JournableRef::new("WorkPackage", id))
    }

    fn snap(version: u32, draft: SnapshotDraft) -> Snapshot {
        Snapshot::from_draft(draft, version, Utc::now())
    }

    fn custom_values() -> AssociationSpec {
        AssociationSpec::new("custom_values", "custom_field_id", "custom_field")
            .attribute(AttributeSpec::text("value"))
    }

    #[test]
    fn test_merges_attribute_and_association_entries() {
        let a = snap(
            1,
            wp("1")
                .attribute("subject", "a")
                .push_record("custom_values", SubRecord::new().with("custom_field_id", 9).with("value", "1")),
        );
        let b = snap(
            2,
            wp("1")
                .attribute("subject", "b")
                .push_record("custom_values", SubRecord::new().with("custom_field_id", 9).with("value", "2")),
        );

        let changes = compute_change_set(
            Some(&a),
            &b,
            &[AttributeSpec::text("subject")],
            &[custom_values()],
        )
        .unwrap();

        assert_eq!(
            changes.keys().collect::<Vec<_>>(),
            vec!["custom_field_9", "subject"]
        );
    }

    #[test]
    fn test_association_missing_on_one_side_is_empty() {
        let a = snap(1, wp("1"));
        let b = snap(
            2,
            wp("1").push_record("custom_values", SubRecord::new().with("custom_field_id", 9).with("value", "1")),
        );
        let changes = compute_change_set(Some(&a), &b, &[], &[custom_values()]).unwrap();
        assert!(changes.contains_key("custom_field_9"));
    }

    #[test]
    fn test_unknown_association_fails_fast() {
        let a = snap(1, wp("1"));
        let b = snap(2, wp("1"));
        let err = compute_change_set(Some(&a), &b, &[], &[custom_values()]).unwrap_err();
        assert!(matches!(err, DiffError::UnknownAssociation { .. }));
    }

    #[test]
    fn test_snapshots_of_different_journables_are_rejected() {
        let a = snap(1, wp("1").attribute("subject", "x"));
        let b = snap(2, wp("2").attribute("subject", "x"));
        let err = compute_change_set(Some(&a), &b, &[AttributeSpec::text("subject")], &[])
            .unwrap_err();
        assert!(matches!(err, DiffError::JournableMismatch { .. }));
    }

    #[test]
    fn test_colliding_keys_are_reported() {
        let a = snap(1, wp("1").attribute("custom_field_9", "x").association("custom_values", vec![]));
        let b = snap(
            2,
            wp("1")
                .attribute("custom_field_9", "y")
                .push_record("custom_values", SubRecord::new().with("custom_field_id", 9).with("value", "1")),
        );
        let err = compute_change_set(
            Some(&a),
            &b,
            &[AttributeSpec::new("custom_field_9", SemanticType::Text)],
            &[custom_values()],
        )
        .unwrap_err();
        assert_eq!(
            err,
            DiffError::DuplicateKey {
                key: "custom_field_9".to_string()
            }
        );
    }
}
