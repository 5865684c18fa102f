use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::value::Value;

/// Identity of a journalable entity: its type name and stable id
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JournableRef {
    pub journable_type: String,
    pub journable_id: String,
}

impl JournableRef {
    pub fn new(journable_type: impl Into<String>, journable_id: impl Into<String>) -> Self {
        Self {
            journable_type: journable_type.into(),
            journable_id: journable_id.into(),
        }
    }
}

impl fmt::Display for JournableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.journable_type, self.journable_id)
    }
}

/// One element of an association collection (a custom value, a phase
/// assignment, ...).
///
/// A sub-record has no identity of its own: the caller names the attribute
/// that identifies it when diffing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubRecord {
    attributes: BTreeMap<String, Value>,
}

impl SubRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style attribute setter
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// The identifier under `id_attribute`, or `None` when it is missing or null
    pub fn identifier(&self, id_attribute: &str) -> Option<&Value> {
        self.get(id_attribute).filter(|v| !v.is_null())
    }

    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }
}

impl FromIterator<(String, Value)> for SubRecord {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            attributes: iter.into_iter().collect(),
        }
    }
}

/// The mutable state a caller assembles before a snapshot is recorded.
///
/// Turning a draft into a [`Snapshot`] assigns its version and timestamp;
/// after that nothing about it can change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDraft {
    pub journable: JournableRef,
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
    #[serde(default)]
    pub associations: BTreeMap<String, Vec<SubRecord>>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}

impl SnapshotDraft {
    pub fn new(journable: JournableRef) -> Self {
        Self {
            journable,
            attributes: BTreeMap::new(),
            associations: BTreeMap::new(),
            note: None,
            author: None,
        }
    }

    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Declare an association, replacing any records already added to it
    pub fn association(mut self, name: impl Into<String>, records: Vec<SubRecord>) -> Self {
        self.associations.insert(name.into(), records);
        self
    }

    pub fn push_record(mut self, association: impl Into<String>, record: SubRecord) -> Self {
        self.associations
            .entry(association.into())
            .or_default()
            .push(record);
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Build a draft from loosely-typed JSON of the shape
    /// `{"attributes": {..}, "associations": {"name": [{..}, ..]}, "note": ".."}`.
    ///
    /// Unrecognised top-level keys are ignored; non-object sections are
    /// treated as empty. Association items that are not objects become
    /// empty sub-records, which diff as unidentified.
    pub fn from_json(journable: JournableRef, json: &serde_json::Value) -> Self {
        let attributes = json
            .get("attributes")
            .and_then(serde_json::Value::as_object)
            .map(|obj| {
                obj.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect()
            })
            .unwrap_or_default();

        let associations = json
            .get("associations")
            .and_then(serde_json::Value::as_object)
            .map(|obj| {
                obj.iter()
                    .map(|(name, records)| {
                        let records = records
                            .as_array()
                            .map(|items| {
                                items
                                    .iter()
                                    .map(|item| match item.as_object() {
                                        Some(record) => record
                                            .iter()
                                            .map(|(k, v)| (k.clone(), Value::from_json(v)))
                                            .collect::<SubRecord>(),
                                        None => SubRecord::new(),
                                    })
                                    .collect()
                            })
                            .unwrap_or_default();
                        (name.clone(), records)
                    })
                    .collect()
            })
            .unwrap_or_default();

        let text = |key: &str| {
            json.get(key)
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
        };

        Self {
            journable,
            attributes,
            associations,
            note: text("note"),
            author: text("author"),
        }
    }
}

/// An immutable, versioned capture of a journable's state.
///
/// Fields are private: a snapshot is only ever created from a
/// [`SnapshotDraft`] (or deserialized from storage) and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    journable: JournableRef,
    version: u32,
    attributes: BTreeMap<String, Value>,
    associations: BTreeMap<String, Vec<SubRecord>>,
    note: Option<String>,
    author: Option<String>,
    created_at: DateTime<Utc>,
}

impl Snapshot {
    /// Freeze a draft as `version` of its journable
    pub fn from_draft(draft: SnapshotDraft, version: u32, created_at: DateTime<Utc>) -> Self {
        Self {
            journable: draft.journable,
            version,
            attributes: draft.attributes,
            associations: draft.associations,
            note: draft.note,
            author: draft.author,
            created_at,
        }
    }

    pub fn journable(&self) -> &JournableRef {
        &self.journable
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn defines_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn associations(&self) -> &BTreeMap<String, Vec<SubRecord>> {
        &self.associations
    }

    pub fn association(&self, name: &str) -> Option<&[SubRecord]> {
        self.associations.get(name).map(Vec::as_slice)
    }

    pub fn defines_association(&self, name: &str) -> bool {
        self.associations.contains_key(name)
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Return the state of this snapshot as a fresh draft, e.g. to build
    /// the next mutation on top of it.
    pub fn to_draft(&self) -> SnapshotDraft {
        SnapshotDraft {
            journable: self.journable.clone(),
            attributes: self.attributes.clone(),
            associations: self.associations.clone(),
            note: None,
            author: None,
        }
    }
}
