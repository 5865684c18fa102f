use chrono::{TimeZone, Utc};
use journal_core::diff::{AssociationSpec, AttributeSpec, DiffSpec, Multiplicity};
use journal_core::model::{JournableRef, Snapshot, SnapshotDraft, SubRecord};

#[allow(dead_code)]
pub fn work_package() -> JournableRef {
    JournableRef::new("WorkPackage", "42")
}

#[allow(dead_code)]
pub fn project() -> JournableRef {
    JournableRef::new("Project", "7")
}

/// Freeze a draft at a fixed instant so snapshots compare deterministically
#[allow(dead_code)]
pub fn snapshot(version: u32, draft: SnapshotDraft) -> Snapshot {
    let at = Utc
        .with_ymd_and_hms(2024, 1, 17, 12, 0, 0)
        .single()
        .unwrap();
    Snapshot::from_draft(draft, version, at)
}

#[allow(dead_code)]
pub fn custom_value(field_id: i64, value: &str) -> SubRecord {
    SubRecord::new()
        .with("custom_field_id", field_id)
        .with("value", value)
}

/// `custom_values` keyed by `custom_field_id`, one compared attribute
#[allow(dead_code)]
pub fn custom_values_spec(multiplicity: Multiplicity) -> AssociationSpec {
    AssociationSpec::new("custom_values", "custom_field_id", "custom_field")
        .multiplicity(multiplicity)
        .attribute(AttributeSpec::text("value"))
}

#[allow(dead_code)]
pub fn work_package_spec() -> DiffSpec {
    DiffSpec::new()
        .attribute(AttributeSpec::text("subject"))
        .attribute(AttributeSpec::text("status_id"))
        .association(custom_values_spec(Multiplicity::Joined))
}
