//! Change set output types.
//!
//! A side of a [`ChangeEntry`] is `Option<ChangeValue>`: `None` is the absent
//! marker, distinct from an empty string or an empty list. Both sides survive
//! serialization exactly.

use crate::errors::{DiffError, Result};
use crate::model::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The canonical representation of one side of a change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ChangeValue {
    /// A plain attribute value, or the representative of a `single` association
    Scalar(Value),
    /// Sorted values of a `joined` association, comma separated
    Joined(String),
    /// Sorted values of an `array` association
    List(Vec<Value>),
}

impl ChangeValue {
    /// A scalar null carries no information and is treated as absent
    pub fn is_null(&self) -> bool {
        matches!(self, ChangeValue::Scalar(Value::Null))
    }

    /// Split into individually formattable parts.
    ///
    /// Joined text is split back on commas; each part is text.
    pub fn parts(&self) -> Vec<Value> {
        match self {
            ChangeValue::Scalar(v) => vec![v.clone()],
            ChangeValue::Joined(s) => s.split(',').map(Value::from).collect(),
            ChangeValue::List(values) => values.clone(),
        }
    }
}

impl fmt::Display for ChangeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeValue::Scalar(v) => write!(f, "{}", v),
            ChangeValue::Joined(s) => f.write_str(s),
            ChangeValue::List(values) => {
                let parts: Vec<String> = values.iter().map(ToString::to_string).collect();
                f.write_str(&parts.join(", "))
            }
        }
    }
}

impl From<Value> for ChangeValue {
    fn from(v: Value) -> Self {
        ChangeValue::Scalar(v)
    }
}

/// One differing key between two snapshots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawChangeEntry")]
pub struct ChangeEntry {
    key: String,
    old: Option<ChangeValue>,
    new: Option<ChangeValue>,
}

#[derive(Deserialize)]
struct RawChangeEntry {
    key: String,
    old: Option<ChangeValue>,
    new: Option<ChangeValue>,
}

impl TryFrom<RawChangeEntry> for ChangeEntry {
    type Error = DiffError;

    fn try_from(raw: RawChangeEntry) -> Result<Self> {
        ChangeEntry::new(raw.key.clone(), raw.old, raw.new).ok_or_else(|| {
            DiffError::Serialization {
                message: format!("change entry '{}' has identical sides", raw.key),
            }
        })
    }
}

impl ChangeEntry {
    /// Build an entry, or `None` when both sides are equal.
    ///
    /// Scalar nulls are normalized to absent first, so `(Null, absent)` is
    /// not a change.
    pub fn new(
        key: impl Into<String>,
        old: Option<ChangeValue>,
        new: Option<ChangeValue>,
    ) -> Option<Self> {
        let old = old.filter(|v| !v.is_null());
        let new = new.filter(|v| !v.is_null());
        if old == new {
            return None;
        }
        Some(Self {
            key: key.into(),
            old,
            new,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn old(&self) -> Option<&ChangeValue> {
        self.old.as_ref()
    }

    pub fn new_value(&self) -> Option<&ChangeValue> {
        self.new.as_ref()
    }

    /// The same change seen in the opposite direction
    pub fn reversed(&self) -> Self {
        Self {
            key: self.key.clone(),
            old: self.new.clone(),
            new: self.old.clone(),
        }
    }
}

/// Flat mapping from change key to entry.
///
/// Keys iterate in lexical order so rendering and storage are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "Vec<ChangeEntry>", try_from = "Vec<ChangeEntry>")]
pub struct ChangeSet {
    entries: BTreeMap<String, ChangeEntry>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry.
    ///
    /// # Errors
    ///
    /// `DuplicateKey` if an entry with the same key is already present.
    pub fn insert(&mut self, entry: ChangeEntry) -> Result<()> {
        if self.entries.contains_key(entry.key()) {
            return Err(DiffError::DuplicateKey {
                key: entry.key().to_string(),
            });
        }
        self.entries.insert(entry.key().to_string(), entry);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, key: &str) -> Option<&ChangeEntry> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChangeEntry> {
        self.entries.values()
    }

    /// Every entry with old and new swapped
    pub fn reversed(&self) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .map(|(k, e)| (k.clone(), e.reversed()))
                .collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a ChangeEntry;
    type IntoIter = std::collections::btree_map::Values<'a, String, ChangeEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.values()
    }
}

impl From<ChangeSet> for Vec<ChangeEntry> {
    fn from(set: ChangeSet) -> Self {
        set.entries.into_values().collect()
    }
}

impl TryFrom<Vec<ChangeEntry>> for ChangeSet {
    type Error = DiffError;

    fn try_from(entries: Vec<ChangeEntry>) -> Result<Self> {
        let mut set = ChangeSet::new();
        for entry in entries {
            set.insert(entry)?;
        }
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scalar(v: impl Into<Value>) -> Option<ChangeValue> {
        Some(ChangeValue::Scalar(v.into()))
    }

    #[test]
    fn test_equal_sides_are_not_an_entry() {
        assert!(ChangeEntry::new("subject", scalar("a"), scalar("a")).is_none());
        assert!(ChangeEntry::new("subject", None, None).is_none());
    }

    #[test]
    fn test_null_is_normalized_to_absent() {
        assert!(ChangeEntry::new("due_date", scalar(Value::Null), None).is_none());

        let entry = ChangeEntry::new("due_date", scalar(Value::Null), scalar("2024-01-17")).unwrap();
        assert!(entry.old().is_none());
    }

    #[test]
    fn test_absent_is_distinct_from_empty_string() {
        let entry = ChangeEntry::new("subject", None, scalar("")).unwrap();
        assert!(entry.old().is_none());
        assert_eq!(entry.new_value(), Some(&ChangeValue::Scalar(Value::from(""))));
    }

    #[test]
    fn test_insert_rejects_duplicate_key() {
        let mut set = ChangeSet::new();
        set.insert(ChangeEntry::new("status_id", scalar(1), scalar(2)).unwrap())
            .unwrap();
        let err = set
            .insert(ChangeEntry::new("status_id", scalar(2), scalar(3)).unwrap())
            .unwrap_err();

        assert_eq!(
            err,
            DiffError::DuplicateKey {
                key: "status_id".to_string()
            }
        );
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_reversed_swaps_sides() {
        let entry = ChangeEntry::new("status_id", None, scalar(2)).unwrap();
        let back = entry.reversed();
        assert_eq!(back.old(), scalar(2).as_ref());
        assert!(back.new_value().is_none());
    }

    #[test]
    fn test_serialized_form_marks_absent_with_null() {
        let mut set = ChangeSet::new();
        set.insert(
            ChangeEntry::new("custom_field_9", Some(ChangeValue::Joined("1,2".into())), None)
                .unwrap(),
        )
        .unwrap();

        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(
            json,
            json!([{
                "key": "custom_field_9",
                "old": {"kind": "joined", "value": "1,2"},
                "new": null
            }])
        );
        let back: ChangeSet = serde_json::from_value(json).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn test_deserialize_rejects_identical_sides() {
        let json = json!([{
            "key": "subject",
            "old": {"kind": "joined", "value": "x"},
            "new": {"kind": "joined", "value": "x"}
        }]);
        assert!(serde_json::from_value::<ChangeSet>(json).is_err());
    }

    #[test]
    fn test_parts_split_joined_text() {
        let joined = ChangeValue::Joined("1,2".to_string());
        assert_eq!(joined.parts(), vec![Value::from("1"), Value::from("2")]);
        assert_eq!(
            ChangeValue::List(vec![Value::from(1), Value::from(2)]).to_string(),
            "1, 2"
        );
    }
}
