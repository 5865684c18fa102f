//! Subcommands and the helpers they share

use journal_core::config::JournalConfig;
use journal_core::diff::{ChangeSet, DiffSpec};
use journal_core::logging_facility;
use journal_core::model::{JournableRef, SnapshotDraft};
use journal_core::render::{render, FormatterContext, FormatterRegistry, KeyCatalog};
use std::path::Path;

pub mod diff;
pub mod history;
pub mod record;

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Load the configuration and start logging with its profile
pub fn load_config(path: &Path) -> Result<JournalConfig, Box<dyn std::error::Error>> {
    let config = JournalConfig::load(path)?;
    logging_facility::init(config.logging.profile);
    Ok(config)
}

/// Read a snapshot file (`attributes`, `associations`, `note`, `author`)
pub fn read_draft(
    path: &Path,
    journable: JournableRef,
) -> Result<SnapshotDraft, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read snapshot {}: {}", path.display(), e))?;
    let json: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| format!("snapshot {} is not valid JSON: {}", path.display(), e))?;
    if !json.is_object() {
        return Err(format!("snapshot {} must be a JSON object", path.display()).into());
    }
    Ok(SnapshotDraft::from_json(journable, &json))
}

/// Render `changes` with the configured labels and reference tables
pub fn render_lines(
    changes: &ChangeSet,
    config: &JournalConfig,
    spec: &DiffSpec,
    scope: &JournableRef,
) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let catalog = KeyCatalog::from_spec(spec);
    let registry = FormatterRegistry::with_defaults();
    let labels = config.label_service();
    let references = config.reference_table()?;
    let ctx = FormatterContext::new(&catalog, &registry, &labels, &references)
        .with_scope(scope.clone());
    Ok(render(changes, &ctx).collect())
}
