//! Change description rendering.
//!
//! Stored change sets are rendered on read, against whatever the referenced
//! records look like at that moment. A reference that no longer resolves is
//! shown with a placeholder and one that is no longer active carries a
//! qualifier; rendering itself never fails.

pub mod context;
pub mod formatter;
pub mod key_catalog;
pub mod renderer;

pub use context::{
    EnglishLabels, FormatterContext, InMemoryReferences, LabelService, LabelsConfig, Locale,
    ReferenceRecord, ReferenceResolver, Resolution,
};
pub use formatter::{ChangeFormatter, ChangeShape, FormatterRegistry};
pub use key_catalog::{KeyCatalog, KeyInfo, KeyOrigin};
pub use renderer::{render, render_entries, render_entry, RenderedChange};
