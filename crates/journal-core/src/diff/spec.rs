//! Diff configuration: which attributes and associations of a journable
//! type are compared, and how their keys and values are typed.

use crate::diff::engine::compute_change_set;
use crate::diff::model::ChangeSet;
use crate::errors::{DiffError, Result};
use crate::model::{Snapshot, SnapshotDraft, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Kind of record an identifier points into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Status,
    Priority,
    Type,
    User,
    Project,
    Version,
    Category,
    CustomField,
    CustomOption,
    ProjectPhase,
}

impl ReferenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceKind::Status => "status",
            ReferenceKind::Priority => "priority",
            ReferenceKind::Type => "type",
            ReferenceKind::User => "user",
            ReferenceKind::Project => "project",
            ReferenceKind::Version => "version",
            ReferenceKind::Category => "category",
            ReferenceKind::CustomField => "custom_field",
            ReferenceKind::CustomOption => "custom_option",
            ReferenceKind::ProjectPhase => "project_phase",
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReferenceKind {
    type Err = DiffError;

    fn from_str(s: &str) -> Result<Self> {
        let kind = match s {
            "status" => ReferenceKind::Status,
            "priority" => ReferenceKind::Priority,
            "type" => ReferenceKind::Type,
            "user" => ReferenceKind::User,
            "project" => ReferenceKind::Project,
            "version" => ReferenceKind::Version,
            "category" => ReferenceKind::Category,
            "custom_field" => ReferenceKind::CustomField,
            "custom_option" => ReferenceKind::CustomOption,
            "project_phase" => ReferenceKind::ProjectPhase,
            other => {
                return Err(DiffError::InvalidSpec {
                    reason: format!("unknown reference kind '{}'", other),
                })
            }
        };
        Ok(kind)
    }
}

/// Declared meaning of a key's values, used to pick a formatter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticType {
    #[default]
    Text,
    Number,
    Boolean,
    Date,
    /// Values are identifiers into a separate reference table
    Reference(ReferenceKind),
}

/// Payload-free discriminant of [`SemanticType`]; the formatter registry key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemanticTag {
    Text,
    Number,
    Boolean,
    Date,
    Reference,
}

impl SemanticType {
    pub fn tag(&self) -> SemanticTag {
        match self {
            SemanticType::Text => SemanticTag::Text,
            SemanticType::Number => SemanticTag::Number,
            SemanticType::Boolean => SemanticTag::Boolean,
            SemanticType::Date => SemanticTag::Date,
            SemanticType::Reference(_) => SemanticTag::Reference,
        }
    }

    pub fn reference_kind(&self) -> Option<ReferenceKind> {
        match self {
            SemanticType::Reference(kind) => Some(*kind),
            _ => None,
        }
    }
}

/// How several sub-records sharing one identifier are canonicalized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Multiplicity {
    /// Sorted values rendered as text and joined with a comma
    #[default]
    Joined,
    /// Sorted values kept as a list
    Array,
    /// The smallest value stands for the identifier
    Single,
}

/// Shape of the keys an association emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyMode {
    /// `{prefix}_{identifier}`
    Identifier,
    /// `{prefix}_{identifier}_{attribute}`
    IdentifierAttribute,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSpec {
    pub name: String,
    #[serde(default)]
    pub semantic: SemanticType,
}

impl AttributeSpec {
    pub fn new(name: impl Into<String>, semantic: SemanticType) -> Self {
        Self {
            name: name.into(),
            semantic,
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, SemanticType::Text)
    }
}

/// Declares how one sub-record collection is matched and keyed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationSpec {
    pub association: String,
    pub id_attribute: String,
    #[serde(default)]
    pub multiplicity: Multiplicity,
    pub attributes: Vec<AttributeSpec>,
    pub key_prefix: String,
    /// Derived from the attribute count when not given
    #[serde(default)]
    pub key_mode: Option<KeyMode>,
    /// What the identifier itself refers to, used for labels
    #[serde(default)]
    pub identifier_reference: Option<ReferenceKind>,
}

impl AssociationSpec {
    pub fn new(
        association: impl Into<String>,
        id_attribute: impl Into<String>,
        key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            association: association.into(),
            id_attribute: id_attribute.into(),
            multiplicity: Multiplicity::default(),
            attributes: Vec::new(),
            key_prefix: key_prefix.into(),
            key_mode: None,
            identifier_reference: None,
        }
    }

    pub fn multiplicity(mut self, multiplicity: Multiplicity) -> Self {
        self.multiplicity = multiplicity;
        self
    }

    pub fn attribute(mut self, attribute: AttributeSpec) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn key_mode(mut self, key_mode: KeyMode) -> Self {
        self.key_mode = Some(key_mode);
        self
    }

    pub fn identifier_reference(mut self, kind: ReferenceKind) -> Self {
        self.identifier_reference = Some(kind);
        self
    }

    pub fn effective_key_mode(&self) -> KeyMode {
        self.key_mode.unwrap_or(if self.attributes.len() > 1 {
            KeyMode::IdentifierAttribute
        } else {
            KeyMode::Identifier
        })
    }

    /// Change key for `attribute` of the sub-records identified by `identifier`
    pub fn key_for(&self, identifier: &str, attribute: &str) -> String {
        match self.effective_key_mode() {
            KeyMode::Identifier => format!("{}_{}", self.key_prefix, identifier),
            KeyMode::IdentifierAttribute => {
                format!("{}_{}_{}", self.key_prefix, identifier, attribute)
            }
        }
    }

    fn validate(&self) -> Result<()> {
        let invalid = |reason: String| Err(DiffError::InvalidSpec { reason });

        if self.association.trim().is_empty() {
            return invalid("association name must not be empty".to_string());
        }
        if self.id_attribute.trim().is_empty() {
            return invalid(format!(
                "association '{}' has an empty id attribute",
                self.association
            ));
        }
        if self.key_prefix.trim().is_empty() {
            return invalid(format!(
                "association '{}' has an empty key prefix",
                self.association
            ));
        }
        if self.attributes.is_empty() {
            return invalid(format!(
                "association '{}' compares no attributes",
                self.association
            ));
        }

        let mut seen = BTreeSet::new();
        for attribute in &self.attributes {
            if attribute.name.trim().is_empty() {
                return invalid(format!(
                    "association '{}' has an attribute with an empty name",
                    self.association
                ));
            }
            if !seen.insert(attribute.name.as_str()) {
                return invalid(format!(
                    "association '{}' lists attribute '{}' twice",
                    self.association, attribute.name
                ));
            }
        }

        if self.key_mode == Some(KeyMode::Identifier) && self.attributes.len() > 1 {
            return invalid(format!(
                "association '{}' compares {} attributes but keys by identifier only",
                self.association,
                self.attributes.len()
            ));
        }
        Ok(())
    }
}

/// Everything compared for one journable type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSpec {
    #[serde(default)]
    pub attributes: Vec<AttributeSpec>,
    #[serde(default)]
    pub associations: Vec<AssociationSpec>,
}

impl DiffSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attribute(mut self, attribute: AttributeSpec) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn association(mut self, association: AssociationSpec) -> Self {
        self.associations.push(association);
        self
    }

    pub fn attribute_spec(&self, name: &str) -> Option<&AttributeSpec> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn association_spec(&self, name: &str) -> Option<&AssociationSpec> {
        self.associations.iter().find(|a| a.association == name)
    }

    /// Check names and keys for structural mistakes.
    ///
    /// # Errors
    ///
    /// `InvalidSpec` naming the first problem found.
    pub fn validate(&self) -> Result<()> {
        let mut names = BTreeSet::new();
        for attribute in &self.attributes {
            if attribute.name.trim().is_empty() {
                return Err(DiffError::InvalidSpec {
                    reason: "attribute name must not be empty".to_string(),
                });
            }
            if !names.insert(attribute.name.as_str()) {
                return Err(DiffError::InvalidSpec {
                    reason: format!("attribute '{}' is listed twice", attribute.name),
                });
            }
        }

        let mut associations = BTreeSet::new();
        let mut prefixes = BTreeSet::new();
        for association in &self.associations {
            association.validate()?;
            if !associations.insert(association.association.as_str()) {
                return Err(DiffError::InvalidSpec {
                    reason: format!("association '{}' is listed twice", association.association),
                });
            }
            if !prefixes.insert(association.key_prefix.as_str()) {
                return Err(DiffError::InvalidSpec {
                    reason: format!("key prefix '{}' is used twice", association.key_prefix),
                });
            }
        }

        // Keys are `<prefix>_<identifier>`, so no prefix may extend another
        // and no attribute may look like an association key.
        for prefix in &prefixes {
            let scope = format!("{}_", prefix);
            if let Some(longer) = prefixes.iter().find(|p| p.starts_with(&scope)) {
                return Err(DiffError::InvalidSpec {
                    reason: format!("key prefix '{}' overlaps key prefix '{}'", longer, prefix),
                });
            }
            if let Some(attribute) = names.iter().find(|n| n.starts_with(&scope)) {
                return Err(DiffError::InvalidSpec {
                    reason: format!(
                        "attribute '{}' collides with key prefix '{}'",
                        attribute, prefix
                    ),
                });
            }
        }
        Ok(())
    }

    /// Diff `new` against its predecessor (or against nothing)
    ///
    /// # Errors
    ///
    /// See [`compute_change_set`].
    pub fn compute(&self, old: Option<&Snapshot>, new: &Snapshot) -> Result<ChangeSet> {
        compute_change_set(old, new, &self.attributes, &self.associations)
    }

    /// Turn ISO date text into dates wherever this spec declares a date.
    ///
    /// Input files carry dates as strings; without coercion a date would
    /// compare as text against a stored date value.
    pub fn coerce_draft(&self, mut draft: SnapshotDraft) -> SnapshotDraft {
        for attribute in &self.attributes {
            if attribute.semantic == SemanticType::Date {
                coerce_in_place(draft.attributes.get_mut(&attribute.name));
            }
        }

        for association in &self.associations {
            let Some(records) = draft.associations.get_mut(&association.association) else {
                continue;
            };
            let date_attributes: Vec<&str> = association
                .attributes
                .iter()
                .filter(|a| a.semantic == SemanticType::Date)
                .map(|a| a.name.as_str())
                .collect();
            if date_attributes.is_empty() {
                continue;
            }
            for record in records.iter_mut() {
                *record = record
                    .attributes()
                    .iter()
                    .map(|(name, value)| {
                        let value = if date_attributes.contains(&name.as_str()) {
                            value.clone().coerce_date()
                        } else {
                            value.clone()
                        };
                        (name.clone(), value)
                    })
                    .collect();
            }
        }
        draft
    }
}

fn coerce_in_place(slot: Option<&mut Value>) {
    if let Some(value) = slot {
        *value = std::mem::replace(value, Value::Null).coerce_date();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{JournableRef, SubRecord};
    use chrono::NaiveDate;

    fn phases() -> AssociationSpec {
        AssociationSpec::new("phases", "phase_id", "project_phase")
            .multiplicity(Multiplicity::Single)
            .attribute(AttributeSpec::new("active", SemanticType::Boolean))
            .attribute(AttributeSpec::new("start_date", SemanticType::Date))
    }

    #[test]
    fn test_key_mode_follows_attribute_count() {
        let single = AssociationSpec::new("custom_values", "custom_field_id", "custom_field")
            .attribute(AttributeSpec::text("value"));
        assert_eq!(single.effective_key_mode(), KeyMode::Identifier);
        assert_eq!(single.key_for("9", "value"), "custom_field_9");

        assert_eq!(phases().effective_key_mode(), KeyMode::IdentifierAttribute);
        assert_eq!(phases().key_for("3", "active"), "project_phase_3_active");
    }

    #[test]
    fn test_explicit_key_mode_wins() {
        let spec = AssociationSpec::new("custom_values", "custom_field_id", "cf")
            .attribute(AttributeSpec::text("value"))
            .key_mode(KeyMode::IdentifierAttribute);
        assert_eq!(spec.key_for("9", "value"), "cf_9_value");
    }

    #[test]
    fn test_validate_rejects_identifier_keys_for_many_attributes() {
        let spec = DiffSpec::new().association(phases().key_mode(KeyMode::Identifier));
        assert!(matches!(
            spec.validate(),
            Err(DiffError::InvalidSpec { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_prefix_and_empty_attributes() {
        let duplicate = DiffSpec::new().association(phases()).association(
            AssociationSpec::new("other_phases", "phase_id", "project_phase")
                .attribute(AttributeSpec::text("x")),
        );
        assert!(duplicate.validate().is_err());

        let empty = DiffSpec::new().association(AssociationSpec::new("a", "id", "a"));
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_prefix_extending_another() {
        // GIVEN `cf_x_5` could be `cf` with identifier `x_5` or `cf_x` with `5`
        let text = AssociationSpec::new("a", "id", "cf").attribute(AttributeSpec::text("value"));
        let flag = AssociationSpec::new("b", "id", "cf_x")
            .attribute(AttributeSpec::new("value", SemanticType::Boolean));

        // THEN either declaration order is rejected
        for spec in [
            DiffSpec::new().association(text.clone()).association(flag.clone()),
            DiffSpec::new().association(flag).association(text.clone()),
        ] {
            match spec.validate() {
                Err(DiffError::InvalidSpec { reason }) => {
                    assert!(reason.contains("'cf_x' overlaps key prefix 'cf'"), "{}", reason)
                }
                other => panic!("expected InvalidSpec, got {:?}", other),
            }
        }

        // AND a prefix that merely shares leading letters is fine
        let distinct = DiffSpec::new()
            .association(text.clone())
            .association(AssociationSpec::new("c", "id", "cfx").attribute(AttributeSpec::text("v")));
        assert!(distinct.validate().is_ok());

        // AND an attribute shaped like an association key is rejected
        let shadowing = DiffSpec::new()
            .attribute(AttributeSpec::text("cf_9"))
            .association(text);
        assert!(matches!(
            shadowing.validate(),
            Err(DiffError::InvalidSpec { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_attribute() {
        let spec = DiffSpec::new()
            .attribute(AttributeSpec::text("subject"))
            .attribute(AttributeSpec::text("subject"));
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_reference_kind_parses_its_own_display() {
        for kind in [
            ReferenceKind::Status,
            ReferenceKind::CustomOption,
            ReferenceKind::ProjectPhase,
        ] {
            assert_eq!(kind.to_string().parse::<ReferenceKind>().unwrap(), kind);
        }
        assert!("colour".parse::<ReferenceKind>().is_err());
    }

    #[test]
    fn test_semantic_type_toml_forms() {
        #[derive(Deserialize)]
        struct Holder {
            a: SemanticType,
            b: SemanticType,
        }
        let holder: Holder =
            toml::from_str("a = \"date\"\nb = { reference = \"project_phase\" }").unwrap();
        assert_eq!(holder.a, SemanticType::Date);
        assert_eq!(
            holder.b,
            SemanticType::Reference(ReferenceKind::ProjectPhase)
        );
    }

    #[test]
    fn test_coerce_draft_only_touches_declared_dates() {
        let spec = DiffSpec::new()
            .attribute(AttributeSpec::new("due_date", SemanticType::Date))
            .attribute(AttributeSpec::text("subject"))
            .association(phases());
        let draft = SnapshotDraft::new(JournableRef::new("Project", "1"))
            .attribute("due_date", "2024-01-17")
            .attribute("subject", "2024-01-17")
            .push_record(
                "phases",
                SubRecord::new()
                    .with("phase_id", 3)
                    .with("start_date", "2024-02-01"),
            );

        let coerced = spec.coerce_draft(draft);
        let day = |s: &str| Value::Date(NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap());

        assert_eq!(coerced.attributes["due_date"], day("2024-01-17"));
        assert_eq!(coerced.attributes["subject"], Value::from("2024-01-17"));
        assert_eq!(
            coerced.associations["phases"][0].get("start_date"),
            Some(&day("2024-02-01"))
        );
    }
}
