//! TOML configuration: diff specs per journable type, labels, reference
//! tables and the logging profile.
//!
//! ```toml
//! [logging]
//! profile = "production"
//!
//! [labels]
//! date_format = "%d.%m.%Y"
//! [labels.attributes]
//! status_id = "Status"
//!
//! [references.status."1"]
//! name = "New"
//!
//! [journables.WorkPackage]
//! attributes = [
//!   { name = "subject" },
//!   { name = "status_id", semantic = { reference = "status" } },
//! ]
//!
//! [[journables.WorkPackage.associations]]
//! association = "custom_values"
//! id_attribute = "custom_field_id"
//! key_prefix = "custom_field"
//! identifier_reference = "custom_field"
//! attributes = [{ name = "value" }]
//! ```

use crate::diff::spec::{DiffSpec, ReferenceKind};
use crate::errors::{DiffError, Result};
use crate::logging_facility::Profile;
use crate::render::context::{EnglishLabels, InMemoryReferences, LabelsConfig, ReferenceRecord};
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub profile: Profile,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JournalConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub labels: LabelsConfig,
    /// Reference kind -> id -> record
    #[serde(default)]
    pub references: BTreeMap<String, BTreeMap<String, ReferenceRecord>>,
    /// Journable type -> diff spec
    #[serde(default)]
    pub journables: BTreeMap<String, DiffSpec>,
}

impl JournalConfig {
    /// Parse and validate configuration text
    ///
    /// # Errors
    ///
    /// `Config` on malformed TOML, `InvalidSpec` on a structurally invalid
    /// diff spec.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: JournalConfig = toml::from_str(text).map_err(|e| DiffError::Config {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a configuration file
    ///
    /// # Errors
    ///
    /// `Config` when the file cannot be read, otherwise as
    /// [`JournalConfig::from_toml_str`].
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| DiffError::Config {
            reason: format!("cannot read {}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&text)
    }

    /// # Errors
    ///
    /// The first problem found, as `Config` or `InvalidSpec`.
    pub fn validate(&self) -> Result<()> {
        for (journable_type, spec) in &self.journables {
            if journable_type.trim().is_empty() {
                return Err(DiffError::Config {
                    reason: "journable type name must not be empty".to_string(),
                });
            }
            spec.validate().map_err(|e| match e {
                DiffError::InvalidSpec { reason } => DiffError::InvalidSpec {
                    reason: format!("{}: {}", journable_type, reason),
                },
                other => other,
            })?;
        }

        for kind in self.references.keys() {
            kind.parse::<ReferenceKind>()?;
        }

        if let Some(format) = &self.labels.date_format {
            if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
                return Err(DiffError::Config {
                    reason: format!("invalid date format '{}'", format),
                });
            }
        }
        Ok(())
    }

    /// # Errors
    ///
    /// `Config` when no spec is configured for `journable_type`.
    pub fn spec_for(&self, journable_type: &str) -> Result<&DiffSpec> {
        self.journables
            .get(journable_type)
            .ok_or_else(|| DiffError::Config {
                reason: format!("no diff spec for journable type '{}'", journable_type),
            })
    }

    pub fn label_service(&self) -> EnglishLabels {
        EnglishLabels::from_config(&self.labels)
    }

    /// Reference tables as an in-memory resolver
    ///
    /// # Errors
    ///
    /// `InvalidSpec` for an unknown reference kind.
    pub fn reference_table(&self) -> Result<InMemoryReferences> {
        let mut table = InMemoryReferences::new();
        for (kind, records) in &self.references {
            let kind: ReferenceKind = kind.parse()?;
            for (id, record) in records {
                table.insert(kind, id.clone(), record.clone());
            }
        }
        Ok(table)
    }
}
