//! Turning stored change sets into sentences.
//!
//! Rendering is lazy: nothing is resolved until the iterator is advanced,
//! and each entry is resolved against the context it was rendered with.
//! Output follows change-key order.

use crate::diff::model::{ChangeEntry, ChangeSet};
use crate::render::context::FormatterContext;
use crate::render::formatter::ChangeShape;
use crate::render::key_catalog::{KeyInfo, KeyOrigin};
use serde::Serialize;

/// One rendered entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedChange {
    pub key: String,
    pub shape: ChangeShape,
    pub text: String,
}

/// Sentences for every visible entry of `changes`
pub fn render<'a>(
    changes: &'a ChangeSet,
    ctx: &'a FormatterContext<'a>,
) -> impl Iterator<Item = String> + 'a {
    render_entries(changes, ctx).map(|rendered| rendered.text)
}

/// Like [`render`], keeping the key and shape of each sentence
pub fn render_entries<'a>(
    changes: &'a ChangeSet,
    ctx: &'a FormatterContext<'a>,
) -> impl Iterator<Item = RenderedChange> + 'a {
    changes.iter().filter_map(move |entry| render_entry(entry, ctx))
}

/// Render a single entry; `None` when the viewer may not see its key
pub fn render_entry(entry: &ChangeEntry, ctx: &FormatterContext<'_>) -> Option<RenderedChange> {
    let info = ctx.catalog().lookup(entry.key());
    if !ctx.is_visible(&info) {
        return None;
    }

    let formatter = ctx.registry().get(info.semantic.tag());
    let shape = formatter.classify(entry.old(), entry.new_value())?;
    let label = label_for(&info, ctx);
    let text = formatter.render(entry, &label, &info, ctx)?;

    Some(RenderedChange {
        key: entry.key().to_string(),
        shape,
        text,
    })
}

/// The `<Label>` part of a sentence.
///
/// Association keys whose identifier is itself a reference are labelled
/// with the referenced record's name, degraded the same way values are.
pub fn label_for(info: &KeyInfo, ctx: &FormatterContext<'_>) -> String {
    let labels = ctx.labels();
    let locale = ctx.locale();
    match &info.origin {
        KeyOrigin::Attribute { name } => labels.attribute_label(name, locale),
        KeyOrigin::Unknown => labels.attribute_label(&info.key, locale),
        KeyOrigin::Association {
            key_prefix,
            identifier,
            attribute,
            identifier_reference,
            ..
        } => {
            let owner = match identifier_reference {
                Some(kind) => ctx.resolve_display(*kind, identifier),
                None => format!("{} {}", labels.attribute_label(key_prefix, locale), identifier),
            };
            match attribute {
                Some(attribute) => {
                    format!("{}: {}", owner, labels.attribute_label(attribute, locale))
                }
                None => owner,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::model::ChangeValue;
    use crate::diff::spec::{AssociationSpec, AttributeSpec, DiffSpec, ReferenceKind, SemanticType};
    use crate::model::Value;
    use crate::render::context::{EnglishLabels, InMemoryReferences, ReferenceRecord};
    use crate::render::formatter::FormatterRegistry;
    use crate::render::key_catalog::KeyCatalog;

    fn scalar(v: impl Into<Value>) -> Option<ChangeValue> {
        Some(ChangeValue::Scalar(v.into()))
    }

    fn set(entries: Vec<ChangeEntry>) -> ChangeSet {
        ChangeSet::try_from(entries).unwrap()
    }

    #[test]
    fn test_three_shapes() {
        let catalog = KeyCatalog::from_spec(&DiffSpec::new());
        let registry = FormatterRegistry::with_defaults();
        let labels = EnglishLabels::new();
        let refs = InMemoryReferences::new();
        let ctx = FormatterContext::new(&catalog, &registry, &labels, &refs);

        let changes = set(vec![
            ChangeEntry::new("a_field", None, scalar("3")).unwrap(),
            ChangeEntry::new("b_field", scalar("2"), scalar("22")).unwrap(),
            ChangeEntry::new("c_field", scalar("4"), None).unwrap(),
        ]);

        let lines: Vec<String> = render(&changes, &ctx).collect();
        assert_eq!(
            lines,
            vec![
                "A field set to 3",
                "B field changed from 2 to 22",
                "C field deleted (was 4)",
            ]
        );
    }

    #[test]
    fn test_visibility_rule_skips_keys() {
        let catalog = KeyCatalog::from_spec(&DiffSpec::new());
        let registry = FormatterRegistry::with_defaults();
        let labels = EnglishLabels::new();
        let refs = InMemoryReferences::new();
        let ctx = FormatterContext::new(&catalog, &registry, &labels, &refs)
            .with_visibility(|info| info.key != "secret");

        let changes = set(vec![
            ChangeEntry::new("secret", None, scalar("x")).unwrap(),
            ChangeEntry::new("subject", None, scalar("y")).unwrap(),
        ]);

        let rendered: Vec<RenderedChange> = render_entries(&changes, &ctx).collect();
        assert_eq!(rendered.len(), 1);
        assert_eq!(rendered[0].key, "subject");
        assert_eq!(rendered[0].shape, ChangeShape::SetTo);
    }

    #[test]
    fn test_association_label_uses_referenced_owner() {
        let spec = DiffSpec::new().association(
            AssociationSpec::new("phases", "phase_id", "project_phase")
                .attribute(AttributeSpec::new("active", SemanticType::Boolean))
                .attribute(AttributeSpec::new("start_date", SemanticType::Date))
                .identifier_reference(ReferenceKind::ProjectPhase),
        );
        let catalog = KeyCatalog::from_spec(&spec);
        let registry = FormatterRegistry::with_defaults();
        let labels = EnglishLabels::new();
        let refs = InMemoryReferences::new().with(
            ReferenceKind::ProjectPhase,
            "3",
            ReferenceRecord::new("Planning"),
        );
        let ctx = FormatterContext::new(&catalog, &registry, &labels, &refs);

        let changes = set(vec![ChangeEntry::new(
            "project_phase_3_active",
            scalar(true),
            scalar(false),
        )
        .unwrap()]);

        let lines: Vec<String> = render(&changes, &ctx).collect();
        assert_eq!(lines, vec!["Planning: Active changed from yes to no"]);
    }

    #[test]
    fn test_association_without_reference_labels_by_prefix() {
        let spec = DiffSpec::new().association(
            AssociationSpec::new("custom_values", "custom_field_id", "custom_field")
                .attribute(AttributeSpec::text("value")),
        );
        let catalog = KeyCatalog::from_spec(&spec);
        let registry = FormatterRegistry::with_defaults();
        let labels = EnglishLabels::new();
        let refs = InMemoryReferences::new();
        let ctx = FormatterContext::new(&catalog, &registry, &labels, &refs);

        let changes = set(vec![ChangeEntry::new(
            "custom_field_9",
            Some(ChangeValue::Joined("1,2".to_string())),
            Some(ChangeValue::Joined("2,3".to_string())),
        )
        .unwrap()]);

        let lines: Vec<String> = render(&changes, &ctx).collect();
        assert_eq!(lines, vec!["Custom field 9 changed from 1,2 to 2,3"]);
    }
}
