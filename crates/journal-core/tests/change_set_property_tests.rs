//! Property-based tests for change set computation.
//!
//! ## Properties Verified
//!
//! - Idempotence: a snapshot compared with itself is empty
//! - Symmetry: swapping the snapshots swaps old and new of every entry
//! - Order invariance: shuffling sub-records never produces a change
//! - Initial snapshots only ever report values as set

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{custom_values_spec, snapshot, work_package};
use journal_core::diff::{compute_change_set, AttributeSpec, Multiplicity};
use journal_core::model::{Snapshot, SnapshotDraft, SubRecord, Value};
use proptest::prelude::*;

fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-20i64..20).prop_map(Value::Integer),
        "[a-c]{0,2}".prop_map(Value::Text),
    ]
}

fn arb_multiplicity() -> impl Strategy<Value = Multiplicity> {
    prop_oneof![
        Just(Multiplicity::Joined),
        Just(Multiplicity::Array),
        Just(Multiplicity::Single),
    ]
}

/// Records that all carry an identifier
fn arb_records() -> impl Strategy<Value = Vec<SubRecord>> {
    prop::collection::vec(
        (0i64..4, arb_value()).prop_map(|(id, value)| {
            SubRecord::new()
                .with("custom_field_id", id)
                .with("value", value)
        }),
        0..8,
    )
}

fn build(version: u32, subject: Value, records: Vec<SubRecord>) -> Snapshot {
    snapshot(
        version,
        SnapshotDraft::new(work_package())
            .attribute("subject", subject)
            .association("custom_values", records),
    )
}

fn arb_snapshot(version: u32) -> impl Strategy<Value = Snapshot> {
    (arb_value(), arb_records()).prop_map(move |(subject, records)| build(version, subject, records))
}

proptest! {
    /// Property: comparing a snapshot with itself yields nothing
    #[test]
    fn prop_change_set_idempotent(s in arb_snapshot(1), multiplicity in arb_multiplicity()) {
        let changes = compute_change_set(
            Some(&s),
            &s,
            &[AttributeSpec::text("subject")],
            &[custom_values_spec(multiplicity)],
        )
        .unwrap();

        prop_assert!(changes.is_empty(), "unexpected changes: {:?}", changes);
    }

    /// Property: a change detected one way is detected the other way, reversed
    #[test]
    fn prop_change_set_symmetric(
        a in arb_snapshot(1),
        b in arb_snapshot(2),
        multiplicity in arb_multiplicity()
    ) {
        let attributes = [AttributeSpec::text("subject")];
        let associations = [custom_values_spec(multiplicity)];

        let forward = compute_change_set(Some(&a), &b, &attributes, &associations).unwrap();
        let backward = compute_change_set(Some(&b), &a, &attributes, &associations).unwrap();

        prop_assert_eq!(forward.reversed(), backward);
    }

    /// Property: sub-record order is not significant
    #[test]
    fn prop_association_order_invariant(
        (records, shuffled) in arb_records()
            .prop_flat_map(|r| (Just(r.clone()), Just(r).prop_shuffle())),
        multiplicity in arb_multiplicity()
    ) {
        let a = build(1, Value::from("s"), records);
        let b = build(2, Value::from("s"), shuffled);

        let changes = compute_change_set(
            Some(&a),
            &b,
            &[],
            &[custom_values_spec(multiplicity)],
        )
        .unwrap();

        prop_assert!(changes.is_empty(), "reordering produced {:?}", changes);
    }

    /// Property: without a predecessor nothing can be changed or deleted
    #[test]
    fn prop_initial_snapshot_only_sets(s in arb_snapshot(1), multiplicity in arb_multiplicity()) {
        let changes = compute_change_set(
            None,
            &s,
            &[AttributeSpec::text("subject")],
            &[custom_values_spec(multiplicity)],
        )
        .unwrap();

        for entry in &changes {
            prop_assert!(entry.old().is_none());
            prop_assert!(entry.new_value().is_some());
        }
    }
}
