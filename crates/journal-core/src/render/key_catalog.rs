//! Reverse mapping from stored change keys to their declared meaning.
//!
//! Keys are flat strings (`status_id`, `custom_field_9`,
//! `project_phase_3_start_date`), so the catalog has to parse them back
//! using the same diff spec that produced them. Lookup order: exact
//! attribute names, then association prefixes. A validated spec never has
//! one prefix extending another, so at most one prefix matches. Anything
//! left is rendered as text under a humanized label.

use crate::diff::spec::{AssociationSpec, DiffSpec, KeyMode, ReferenceKind, SemanticType};
use std::collections::BTreeMap;

/// Where a key came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOrigin {
    Attribute {
        name: String,
    },
    Association {
        association: String,
        key_prefix: String,
        identifier: String,
        /// Set for `{prefix}_{identifier}_{attribute}` keys
        attribute: Option<String>,
        identifier_reference: Option<ReferenceKind>,
    },
    Unknown,
}

/// Everything the renderer needs to know about one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInfo {
    pub key: String,
    pub semantic: SemanticType,
    pub origin: KeyOrigin,
}

#[derive(Debug, Clone, Default)]
pub struct KeyCatalog {
    attributes: BTreeMap<String, SemanticType>,
    associations: Vec<AssociationSpec>,
}

impl KeyCatalog {
    pub fn from_spec(spec: &DiffSpec) -> Self {
        let attributes = spec
            .attributes
            .iter()
            .map(|a| (a.name.clone(), a.semantic))
            .collect();

        Self {
            attributes,
            associations: spec.associations.clone(),
        }
    }

    pub fn lookup(&self, key: &str) -> KeyInfo {
        if let Some(semantic) = self.attributes.get(key) {
            return KeyInfo {
                key: key.to_string(),
                semantic: *semantic,
                origin: KeyOrigin::Attribute {
                    name: key.to_string(),
                },
            };
        }

        self.associations
            .iter()
            .find_map(|spec| parse_association_key(spec, key))
            .unwrap_or_else(|| KeyInfo {
                key: key.to_string(),
                semantic: SemanticType::Text,
                origin: KeyOrigin::Unknown,
            })
    }
}

fn parse_association_key(spec: &AssociationSpec, key: &str) -> Option<KeyInfo> {
    let rest = key
        .strip_prefix(spec.key_prefix.as_str())?
        .strip_prefix('_')
        .filter(|rest| !rest.is_empty())?;

    let (identifier, attribute) = match spec.effective_key_mode() {
        KeyMode::Identifier => (rest, spec.attributes.first()?),
        KeyMode::IdentifierAttribute => spec
            .attributes
            .iter()
            .filter_map(|attribute| {
                let identifier = rest
                    .strip_suffix(attribute.name.as_str())?
                    .strip_suffix('_')
                    .filter(|id| !id.is_empty())?;
                Some((identifier, attribute))
            })
            // `start_date` must beat `date` for `3_start_date`
            .max_by_key(|(_, attribute)| attribute.name.len())?,
    };

    let attribute_name = match spec.effective_key_mode() {
        KeyMode::Identifier => None,
        KeyMode::IdentifierAttribute => Some(attribute.name.clone()),
    };

    Some(KeyInfo {
        key: key.to_string(),
        semantic: attribute.semantic,
        origin: KeyOrigin::Association {
            association: spec.association.clone(),
            key_prefix: spec.key_prefix.clone(),
            identifier: identifier.to_string(),
            attribute: attribute_name,
            identifier_reference: spec.identifier_reference,
        },
    })
}
