//! Keyed sub-record collection differ.
//!
//! Sub-records are grouped by the display form of their identifier, so the
//! integer `3` and the text `"3"` land in the same group. Within a group the
//! values of each compared attribute are sorted by natural [`Value`] order
//! before they are compared, which makes the result independent of
//! insertion order.
//!
//! Records without an identifier are never matched across snapshots. Old
//! ones are grouped under [`UNIDENTIFIED_REMOVED`] and only ever appear as
//! disappearing; new ones are grouped under [`UNIDENTIFIED_ADDED`] and only
//! ever appear as appearing.

use crate::diff::model::{ChangeEntry, ChangeValue};
use crate::diff::spec::{AssociationSpec, Multiplicity};
use crate::errors::{DiffError, Result};
use crate::model::{Snapshot, SubRecord, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Pseudo-identifier for predecessor sub-records lacking an identifier
pub const UNIDENTIFIED_REMOVED: &str = "unidentified-removed";
/// Pseudo-identifier for new sub-records lacking an identifier
pub const UNIDENTIFIED_ADDED: &str = "unidentified-added";

type Groups<'a> = BTreeMap<String, Vec<&'a SubRecord>>;

fn group<'a>(records: &'a [SubRecord], id_attribute: &str, unidentified: &str) -> Groups<'a> {
    let mut groups: Groups<'a> = BTreeMap::new();
    for record in records {
        let identifier = record
            .identifier(id_attribute)
            .map(ToString::to_string)
            .unwrap_or_else(|| unidentified.to_string());
        groups.entry(identifier).or_default().push(record);
    }
    groups
}

/// Canonical representation of `attribute` across one identifier's records.
///
/// `None` when no record carries a non-null value.
pub fn canonicalize(
    records: &[&SubRecord],
    attribute: &str,
    multiplicity: Multiplicity,
) -> Option<ChangeValue> {
    let mut values: Vec<Value> = records
        .iter()
        .filter_map(|r| r.get(attribute))
        .filter(|v| !v.is_null())
        .cloned()
        .collect();
    values.sort();

    let first = values.first()?.clone();
    Some(match multiplicity {
        Multiplicity::Joined => ChangeValue::Joined(
            values
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(","),
        ),
        Multiplicity::Array => ChangeValue::List(values),
        Multiplicity::Single => ChangeValue::Scalar(first),
    })
}

/// Stand-in value for unidentified records none of whose compared
/// attributes carry a value.
///
/// Each record renders as its sorted non-null `name=value` pairs separated
/// by spaces, or `{}` when it has none; records are sorted and comma joined.
fn describe_records(records: &[&SubRecord]) -> ChangeValue {
    let mut described: Vec<String> = records
        .iter()
        .map(|record| {
            let pairs: Vec<String> = record
                .attributes()
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(name, v)| format!("{}={}", name, v))
                .collect();
            if pairs.is_empty() {
                "{}".to_string()
            } else {
                pairs.join(" ")
            }
        })
        .collect();
    described.sort();
    ChangeValue::Joined(described.join(","))
}

/// Diff two collections of the same association.
///
/// Emits one entry per identifier (or per identifier and attribute, see
/// [`AssociationSpec::key_for`]) whose canonical representations differ.
/// A non-empty unidentified group always yields at least one entry; when
/// none of its compared attributes has a value it is reported under the
/// first attribute's key with a `name=value` rendering of its records.
/// Never fails: malformed records degrade to unmatched entries.
pub fn diff_collections(
    old: &[SubRecord],
    new: &[SubRecord],
    spec: &AssociationSpec,
) -> Vec<ChangeEntry> {
    let old_groups = group(old, &spec.id_attribute, UNIDENTIFIED_REMOVED);
    let new_groups = group(new, &spec.id_attribute, UNIDENTIFIED_ADDED);

    for (side, groups, marker) in [
        ("old", &old_groups, UNIDENTIFIED_REMOVED),
        ("new", &new_groups, UNIDENTIFIED_ADDED),
    ] {
        if let Some(records) = groups.get(marker) {
            tracing::warn!(
                association = %spec.association,
                id_attribute = %spec.id_attribute,
                side,
                count = records.len(),
                "sub-records without identifier"
            );
        }
    }

    let identifiers: BTreeSet<&String> = old_groups.keys().chain(new_groups.keys()).collect();
    let empty: Vec<&SubRecord> = Vec::new();

    let mut entries = Vec::new();
    for identifier in identifiers {
        let old_records = old_groups.get(identifier).unwrap_or(&empty);
        let new_records = new_groups.get(identifier).unwrap_or(&empty);

        let before = entries.len();
        for attribute in &spec.attributes {
            let entry = ChangeEntry::new(
                spec.key_for(identifier, &attribute.name),
                canonicalize(old_records, &attribute.name, spec.multiplicity),
                canonicalize(new_records, &attribute.name, spec.multiplicity),
            );
            entries.extend(entry);
        }

        let unidentified = identifier == UNIDENTIFIED_REMOVED || identifier == UNIDENTIFIED_ADDED;
        if unidentified && entries.len() == before {
            if let Some(first) = spec.attributes.first() {
                let key = spec.key_for(identifier, &first.name);
                let entry = if identifier == UNIDENTIFIED_REMOVED {
                    ChangeEntry::new(key, Some(describe_records(old_records)), None)
                } else {
                    ChangeEntry::new(key, None, Some(describe_records(new_records)))
                };
                entries.extend(entry);
            }
        }
    }
    entries
}

/// Diff the association named by `spec` between a snapshot and its predecessor.
///
/// An association declared on only one side is an empty collection on the
/// other.
///
/// # Errors
///
/// `UnknownAssociation` when neither snapshot declares the association.
pub fn diff_association(
    old: Option<&Snapshot>,
    new: &Snapshot,
    spec: &AssociationSpec,
) -> Result<Vec<ChangeEntry>> {
    let name = spec.association.as_str();
    let defined =
        new.defines_association(name) || old.is_some_and(|o| o.defines_association(name));
    if !defined {
        return Err(DiffError::UnknownAssociation {
            journable_type: new.journable().journable_type.clone(),
            association: name.to_string(),
        });
    }

    let old_records = old.and_then(|o| o.association(name)).unwrap_or(&[]);
    let new_records = new.association(name).unwrap_or(&[]);
    Ok(diff_collections(old_records, new_records, spec))
}
