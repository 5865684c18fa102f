//! Scalar attribute differ

use crate::diff::model::{ChangeEntry, ChangeValue};
use crate::errors::{DiffError, Result};
use crate::model::Snapshot;

/// Compare one scalar attribute between a snapshot and its predecessor.
///
/// The key of the entry is the attribute name. A null value and a missing
/// value are the same thing here. Without a predecessor every present value
/// is reported as newly set.
///
/// # Errors
///
/// `UnknownAttribute` when neither snapshot defines `name`: that is a
/// mismatch between the diff configuration and the journable's schema, not
/// an unchanged attribute.
pub fn diff_attribute(
    old: Option<&Snapshot>,
    new: &Snapshot,
    name: &str,
) -> Result<Option<ChangeEntry>> {
    let defined = new.defines_attribute(name) || old.is_some_and(|o| o.defines_attribute(name));
    if !defined {
        return Err(DiffError::UnknownAttribute {
            journable_type: new.journable().journable_type.clone(),
            attribute: name.to_string(),
        });
    }

    let side = |snapshot: &Snapshot| {
        snapshot
            .attribute(name)
            .filter(|v| !v.is_null())
            .cloned()
            .map(ChangeValue::Scalar)
    };

    Ok(ChangeEntry::new(name, old.and_then(side), side(new)))
}
