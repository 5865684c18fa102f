//! Collaborators a render call is given: labels, reference resolution,
//! locale and viewer visibility.
//!
//! A [`FormatterContext`] is built for one render call and dropped with it.
//! Nothing here is process-global, and resolution results are never cached
//! between calls, so a reference deleted since the last render shows up as
//! deleted.

use crate::diff::spec::ReferenceKind;
use crate::model::JournableRef;
use crate::render::formatter::{ChangeShape, FormatterRegistry};
use crate::render::key_catalog::{KeyCatalog, KeyInfo};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Locale tag (`en`, `de-CH`, ...) handed to the label service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locale(String);

impl Locale {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self::new("en")
    }
}

/// Source of every human-facing word in a rendered change
pub trait LabelService {
    /// Human label for an attribute (or key prefix) name
    fn attribute_label(&self, name: &str, locale: &Locale) -> String;

    /// Template for a change shape with `{label}`, `{old}` and `{new}` slots
    fn template(&self, shape: ChangeShape, locale: &Locale) -> String;

    fn boolean(&self, value: bool, locale: &Locale) -> String;

    /// Text shown in place of a reference that no longer resolves
    fn reference_placeholder(&self, locale: &Locale) -> String;

    /// Suffix appended to a reference that resolves but is not active here
    fn inactive_qualifier(&self, locale: &Locale) -> String;

    /// strftime-style pattern for dates
    fn date_format(&self, locale: &Locale) -> String;
}

/// Label overrides as they appear in configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelsConfig {
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub date_format: Option<String>,
}

pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// English labels with per-attribute overrides.
///
/// Attributes without an override are humanized: a trailing `_id` is
/// dropped, underscores become spaces and the first letter is capitalized
/// (`start_date` renders as "Start date").
#[derive(Debug, Clone, Default)]
pub struct EnglishLabels {
    overrides: BTreeMap<String, String>,
    date_format: Option<String>,
}

impl EnglishLabels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &LabelsConfig) -> Self {
        Self {
            overrides: config.attributes.clone(),
            date_format: config.date_format.clone(),
        }
    }

    pub fn with_label(mut self, attribute: impl Into<String>, label: impl Into<String>) -> Self {
        self.overrides.insert(attribute.into(), label.into());
        self
    }

    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = Some(format.into());
        self
    }
}

/// `status_id` -> `Status`, `start_date` -> `Start date`
pub fn humanize(name: &str) -> String {
    let trimmed = name.strip_suffix("_id").unwrap_or(name);
    let spaced = trimmed.replace('_', " ");
    let mut chars = spaced.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => name.to_string(),
    }
}

impl LabelService for EnglishLabels {
    fn attribute_label(&self, name: &str, _locale: &Locale) -> String {
        self.overrides
            .get(name)
            .cloned()
            .unwrap_or_else(|| humanize(name))
    }

    fn template(&self, shape: ChangeShape, _locale: &Locale) -> String {
        match shape {
            ChangeShape::SetTo => "{label} set to {new}",
            ChangeShape::Changed => "{label} changed from {old} to {new}",
            ChangeShape::Deleted => "{label} deleted (was {old})",
        }
        .to_string()
    }

    fn boolean(&self, value: bool, _locale: &Locale) -> String {
        if value { "yes" } else { "no" }.to_string()
    }

    fn reference_placeholder(&self, _locale: &Locale) -> String {
        "deleted reference".to_string()
    }

    fn inactive_qualifier(&self, _locale: &Locale) -> String {
        "(inactive)".to_string()
    }

    fn date_format(&self, _locale: &Locale) -> String {
        self.date_format
            .clone()
            .unwrap_or_else(|| DEFAULT_DATE_FORMAT.to_string())
    }
}

/// Outcome of looking up a referenced record at render time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Active(String),
    /// The record exists but is not active for the owning journable
    Inactive(String),
    Missing,
}

pub trait ReferenceResolver {
    /// Look up `id` of `kind`, including soft-deleted or inactive records.
    ///
    /// `scope` is the journable that owns the change; resolvers use it to
    /// decide whether a record is still active there.
    fn resolve(&self, kind: ReferenceKind, id: &str, scope: Option<&JournableRef>) -> Resolution;
}

fn default_active() -> bool {
    true
}

/// One reference table row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceRecord {
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
    /// Journable ids the record is active for; `None` means everywhere
    #[serde(default)]
    pub active_for: Option<BTreeSet<String>>,
}

impl ReferenceRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            active: true,
            active_for: None,
        }
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn active_for<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.active_for = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    fn is_active_in(&self, scope: Option<&JournableRef>) -> bool {
        if !self.active {
            return false;
        }
        match (&self.active_for, scope) {
            (Some(ids), Some(scope)) => ids.contains(&scope.journable_id),
            _ => true,
        }
    }
}

/// Reference tables held in memory, e.g. loaded from configuration
#[derive(Debug, Clone, Default)]
pub struct InMemoryReferences {
    records: HashMap<(ReferenceKind, String), ReferenceRecord>,
}

impl InMemoryReferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: ReferenceKind, id: impl Into<String>, record: ReferenceRecord) {
        self.records.insert((kind, id.into()), record);
    }

    pub fn with(mut self, kind: ReferenceKind, id: impl Into<String>, record: ReferenceRecord) -> Self {
        self.insert(kind, id, record);
        self
    }

    pub fn remove(&mut self, kind: ReferenceKind, id: &str) -> Option<ReferenceRecord> {
        self.records.remove(&(kind, id.to_string()))
    }
}

impl ReferenceResolver for InMemoryReferences {
    fn resolve(&self, kind: ReferenceKind, id: &str, scope: Option<&JournableRef>) -> Resolution {
        match self.records.get(&(kind, id.to_string())) {
            None => Resolution::Missing,
            Some(record) if record.is_active_in(scope) => Resolution::Active(record.name.clone()),
            Some(record) => Resolution::Inactive(record.name.clone()),
        }
    }
}

type Visibility<'a> = Box<dyn Fn(&KeyInfo) -> bool + 'a>;

/// Per-call rendering context
pub struct FormatterContext<'a> {
    catalog: &'a KeyCatalog,
    registry: &'a FormatterRegistry,
    labels: &'a dyn LabelService,
    references: &'a dyn ReferenceResolver,
    locale: Locale,
    scope: Option<JournableRef>,
    visibility: Option<Visibility<'a>>,
}

impl<'a> FormatterContext<'a> {
    pub fn new(
        catalog: &'a KeyCatalog,
        registry: &'a FormatterRegistry,
        labels: &'a dyn LabelService,
        references: &'a dyn ReferenceResolver,
    ) -> Self {
        Self {
            catalog,
            registry,
            labels,
            references,
            locale: Locale::default(),
            scope: None,
            visibility: None,
        }
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    /// The journable whose changes are rendered
    pub fn with_scope(mut self, scope: JournableRef) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Hide keys the viewer may not see; hidden keys are skipped entirely
    pub fn with_visibility(mut self, rule: impl Fn(&KeyInfo) -> bool + 'a) -> Self {
        self.visibility = Some(Box::new(rule));
        self
    }

    pub fn catalog(&self) -> &KeyCatalog {
        self.catalog
    }

    pub fn registry(&self) -> &FormatterRegistry {
        self.registry
    }

    pub fn labels(&self) -> &dyn LabelService {
        self.labels
    }

    pub fn references(&self) -> &dyn ReferenceResolver {
        self.references
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    pub fn scope(&self) -> Option<&JournableRef> {
        self.scope.as_ref()
    }

    pub fn is_visible(&self, info: &KeyInfo) -> bool {
        self.visibility.as_ref().map_or(true, |rule| rule(info))
    }

    /// Resolve a reference to display text, degrading instead of failing
    pub fn resolve_display(&self, kind: ReferenceKind, id: &str) -> String {
        match self.references.resolve(kind, id, self.scope.as_ref()) {
            Resolution::Active(name) => name,
            Resolution::Inactive(name) => {
                format!("{} {}", name, self.labels.inactive_qualifier(&self.locale))
            }
            Resolution::Missing => {
                tracing::warn!(
                    reference_kind = %kind,
                    reference_id = id,
                    scope = ?self.scope.as_ref().map(ToString::to_string),
                    "reference no longer resolves"
                );
                self.labels.reference_placeholder(&self.locale)
            }
        }
    }
}
