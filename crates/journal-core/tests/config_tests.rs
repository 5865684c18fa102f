#![allow(clippy::unwrap_used, clippy::expect_used)]

use journal_core::config::JournalConfig;
use journal_core::diff::{KeyMode, Multiplicity, ReferenceKind, SemanticType};
use journal_core::errors::DiffError;
use journal_core::logging_facility::Profile;
use journal_core::model::{JournableRef, SnapshotDraft, SubRecord};
use journal_core::render::{render, FormatterContext, FormatterRegistry, KeyCatalog};
use journal_core::Journal;
use std::io::Write;

const WORK_PACKAGES: &str = r#"
[logging]
profile = "production"

[labels]
date_format = "%d/%m/%Y"

[labels.attributes]
status_id = "Status"

[references.status."1"]
name = "New"

[references.status."2"]
name = "Closed"
active = false

[references.custom_field."9"]
name = "Colour"

[journables.WorkPackage]
attributes = [
  { name = "subject" },
  { name = "status_id", semantic = { reference = "status" } },
  { name = "due_date", semantic = "date" },
]

[[journables.WorkPackage.associations]]
association = "custom_values"
id_attribute = "custom_field_id"
key_prefix = "custom_field"
identifier_reference = "custom_field"
attributes = [{ name = "value" }]
"#;

fn write_config(text: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_from_file() {
    let file = write_config(WORK_PACKAGES);

    let config = JournalConfig::load(file.path()).unwrap();

    assert_eq!(config.logging.profile, Profile::Production);
    let spec = config.spec_for("WorkPackage").unwrap();
    assert_eq!(
        spec.attribute_spec("status_id").unwrap().semantic,
        SemanticType::Reference(ReferenceKind::Status)
    );
    let custom_values = spec.association_spec("custom_values").unwrap();
    assert_eq!(custom_values.multiplicity, Multiplicity::Joined);
    assert_eq!(custom_values.effective_key_mode(), KeyMode::Identifier);
}

#[test]
fn test_missing_file_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = JournalConfig::load(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, DiffError::Config { .. }));
}

#[test]
fn test_malformed_toml_is_config_error() {
    let file = write_config("[journables.WorkPackage\n");
    assert!(matches!(
        JournalConfig::load(file.path()),
        Err(DiffError::Config { .. })
    ));
}

#[test]
fn test_configured_journal_renders_end_to_end() {
    // GIVEN a configuration loaded from disk
    let file = write_config(WORK_PACKAGES);
    let config = JournalConfig::load(file.path()).unwrap();
    let spec = config.spec_for("WorkPackage").unwrap();
    let wp = JournableRef::new("WorkPackage", "42");

    // WHEN two versions are recorded
    let mut journal = Journal::new(wp.clone());
    let base = |status: i64| {
        SnapshotDraft::new(wp.clone())
            .attribute("subject", "Fix login")
            .attribute("status_id", status)
            .attribute("due_date", "2024-02-29")
            .push_record(
                "custom_values",
                SubRecord::new().with("custom_field_id", 9).with("value", "red"),
            )
    };
    journal.record(base(1), spec).unwrap();
    let entry = journal.record(base(2), spec).unwrap();

    // THEN the change renders with configured labels and references
    let catalog = KeyCatalog::from_spec(spec);
    let registry = FormatterRegistry::with_defaults();
    let labels = config.label_service();
    let references = config.reference_table().unwrap();
    let ctx = FormatterContext::new(&catalog, &registry, &labels, &references).with_scope(wp);

    let lines: Vec<String> = render(entry.changes(), &ctx).collect();
    assert_eq!(lines, vec!["Status changed from New to Closed (inactive)"]);

    let first = journal.entry(1).unwrap();
    let lines: Vec<String> = render(first.changes(), &ctx).collect();
    assert!(lines.contains(&"Due date set to 29/02/2024".to_string()));
    assert!(lines.contains(&"Colour set to red".to_string()));
}
