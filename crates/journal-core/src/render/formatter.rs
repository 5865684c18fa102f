//! Change formatters and their registry.
//!
//! A formatter is chosen by the semantic type declared for a key, never by
//! the shape of the stored value. Every formatter shares the three-way
//! template selection in [`ChangeShape::classify`]; they differ only in how
//! a single value is turned into text.

use crate::diff::model::{ChangeEntry, ChangeValue};
use crate::diff::spec::SemanticTag;
use crate::model::Value;
use crate::render::context::{FormatterContext, DEFAULT_DATE_FORMAT};
use crate::render::key_catalog::KeyInfo;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeShape {
    SetTo,
    Changed,
    Deleted,
}

impl ChangeShape {
    /// `None` only when both sides are absent, which a valid entry never is
    pub fn classify(old: Option<&ChangeValue>, new: Option<&ChangeValue>) -> Option<Self> {
        match (old, new) {
            (None, Some(_)) => Some(ChangeShape::SetTo),
            (Some(_), Some(_)) => Some(ChangeShape::Changed),
            (Some(_), None) => Some(ChangeShape::Deleted),
            (None, None) => None,
        }
    }
}

pub trait ChangeFormatter: Send + Sync {
    /// Text for one value of a key
    fn format_value(&self, value: &Value, info: &KeyInfo, ctx: &FormatterContext<'_>) -> String;

    fn classify(&self, old: Option<&ChangeValue>, new: Option<&ChangeValue>) -> Option<ChangeShape> {
        ChangeShape::classify(old, new)
    }

    /// Text for one side of an entry; joined parts stay comma separated
    fn format_change_value(
        &self,
        value: &ChangeValue,
        info: &KeyInfo,
        ctx: &FormatterContext<'_>,
    ) -> String {
        let parts = value
            .parts()
            .iter()
            .map(|part| self.format_value(part, info, ctx))
            .collect::<Vec<_>>();
        match value {
            ChangeValue::List(_) => parts.join(", "),
            _ => parts.join(","),
        }
    }

    /// Fill the label service's template for the entry's shape
    fn render(
        &self,
        entry: &ChangeEntry,
        label: &str,
        info: &KeyInfo,
        ctx: &FormatterContext<'_>,
    ) -> Option<String> {
        let shape = self.classify(entry.old(), entry.new_value())?;
        let side = |value: Option<&ChangeValue>| {
            value
                .map(|v| self.format_change_value(v, info, ctx))
                .unwrap_or_default()
        };
        Some(fill_template(
            ctx,
            shape,
            label,
            &side(entry.old()),
            &side(entry.new_value()),
        ))
    }
}

fn fill_template(
    ctx: &FormatterContext<'_>,
    shape: ChangeShape,
    label: &str,
    old: &str,
    new: &str,
) -> String {
    ctx.labels()
        .template(shape, ctx.locale())
        .replace("{label}", label)
        .replace("{old}", old)
        .replace("{new}", new)
}

/// Literal display form
#[derive(Debug, Default)]
pub struct TextFormatter;

impl ChangeFormatter for TextFormatter {
    fn format_value(&self, value: &Value, _info: &KeyInfo, _ctx: &FormatterContext<'_>) -> String {
        value.to_string()
    }
}

/// Floats are rounded to two decimals with trailing zeros trimmed.
///
/// A change whose sides round to the same text is shown at full precision
/// instead.
#[derive(Debug, Default)]
pub struct NumberFormatter;

impl ChangeFormatter for NumberFormatter {
    fn format_value(&self, value: &Value, _info: &KeyInfo, _ctx: &FormatterContext<'_>) -> String {
        match value {
            Value::Float(x) if x.is_finite() => {
                let rounded = format!("{:.2}", x);
                rounded
                    .trim_end_matches('0')
                    .trim_end_matches('.')
                    .to_string()
            }
            other => other.to_string(),
        }
    }

    fn render(
        &self,
        entry: &ChangeEntry,
        label: &str,
        info: &KeyInfo,
        ctx: &FormatterContext<'_>,
    ) -> Option<String> {
        let shape = self.classify(entry.old(), entry.new_value())?;
        let side = |value: Option<&ChangeValue>| {
            value
                .map(|v| self.format_change_value(v, info, ctx))
                .unwrap_or_default()
        };
        let (mut old, mut new) = (side(entry.old()), side(entry.new_value()));
        if shape == ChangeShape::Changed && old == new {
            let exact = |value: Option<&ChangeValue>| value.map(ToString::to_string).unwrap_or_default();
            old = exact(entry.old());
            new = exact(entry.new_value());
        }
        Some(fill_template(ctx, shape, label, &old, &new))
    }
}

#[derive(Debug, Default)]
pub struct BooleanFormatter;

impl ChangeFormatter for BooleanFormatter {
    fn format_value(&self, value: &Value, _info: &KeyInfo, ctx: &FormatterContext<'_>) -> String {
        let flag = match value {
            Value::Bool(b) => Some(*b),
            Value::Integer(0) => Some(false),
            Value::Integer(1) => Some(true),
            Value::Text(s) => match s.as_str() {
                "true" | "t" | "1" => Some(true),
                "false" | "f" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        };
        match flag {
            Some(b) => ctx.labels().boolean(b, ctx.locale()),
            None => value.to_string(),
        }
    }
}

/// Dates in the label service's pattern for the context locale
#[derive(Debug, Default)]
pub struct DateFormatter;

fn format_date(date: NaiveDate, pattern: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", date.format(pattern)).is_ok() {
        return out;
    }
    // An invalid pattern makes chrono's Display fail part way through
    date.format(DEFAULT_DATE_FORMAT).to_string()
}

impl ChangeFormatter for DateFormatter {
    fn format_value(&self, value: &Value, _info: &KeyInfo, ctx: &FormatterContext<'_>) -> String {
        match value.clone().coerce_date() {
            Value::Date(d) => format_date(d, &ctx.labels().date_format(ctx.locale())),
            other => other.to_string(),
        }
    }
}

/// Identifiers resolved through the context's reference resolver.
///
/// Each value is resolved on its own, so a joined `"3,7"` where 7 was
/// deleted renders as `"Planning,deleted reference"`.
#[derive(Debug, Default)]
pub struct ReferenceFormatter;

impl ChangeFormatter for ReferenceFormatter {
    fn format_value(&self, value: &Value, info: &KeyInfo, ctx: &FormatterContext<'_>) -> String {
        match info.semantic.reference_kind() {
            Some(kind) => ctx.resolve_display(kind, &value.to_string()),
            None => value.to_string(),
        }
    }
}

/// Semantic tag to formatter table.
///
/// Tags without a registered formatter fall back to [`TextFormatter`].
pub struct FormatterRegistry {
    formatters: HashMap<SemanticTag, Box<dyn ChangeFormatter>>,
    fallback: TextFormatter,
}

impl FormatterRegistry {
    /// A registry with no formatters; everything renders as text
    pub fn empty() -> Self {
        Self {
            formatters: HashMap::new(),
            fallback: TextFormatter,
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(SemanticTag::Text, Box::new(TextFormatter));
        registry.register(SemanticTag::Number, Box::new(NumberFormatter));
        registry.register(SemanticTag::Boolean, Box::new(BooleanFormatter));
        registry.register(SemanticTag::Date, Box::new(DateFormatter));
        registry.register(SemanticTag::Reference, Box::new(ReferenceFormatter));
        registry
    }

    /// Install `formatter` for `tag`, replacing any previous one
    pub fn register(&mut self, tag: SemanticTag, formatter: Box<dyn ChangeFormatter>) {
        self.formatters.insert(tag, formatter);
    }

    pub fn get(&self, tag: SemanticTag) -> &dyn ChangeFormatter {
        self.formatters
            .get(&tag)
            .map(|f| f.as_ref())
            .unwrap_or(&self.fallback)
    }
}

impl Default for FormatterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for FormatterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut tags: Vec<String> = self.formatters.keys().map(|t| format!("{:?}", t)).collect();
        tags.sort();
        f.debug_struct("FormatterRegistry").field("tags", &tags).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::spec::{DiffSpec, SemanticType};
    use crate::render::context::{EnglishLabels, InMemoryReferences};
    use crate::render::key_catalog::{KeyCatalog, KeyOrigin};

    fn info(semantic: SemanticType) -> KeyInfo {
        KeyInfo {
            key: "k".to_string(),
            semantic,
            origin: KeyOrigin::Unknown,
        }
    }

    fn with_ctx<F: FnOnce(&FormatterContext<'_>)>(labels: EnglishLabels, f: F) {
        let catalog = KeyCatalog::from_spec(&DiffSpec::new());
        let registry = FormatterRegistry::with_defaults();
        let refs = InMemoryReferences::new();
        let ctx = FormatterContext::new(&catalog, &registry, &labels, &refs);
        f(&ctx);
    }

    #[test]
    fn test_classification() {
        let v = ChangeValue::Scalar(Value::from("3"));
        assert_eq!(ChangeShape::classify(None, Some(&v)), Some(ChangeShape::SetTo));
        assert_eq!(
            ChangeShape::classify(Some(&v), Some(&v)),
            Some(ChangeShape::Changed)
        );
        assert_eq!(ChangeShape::classify(Some(&v), None), Some(ChangeShape::Deleted));
        assert_eq!(ChangeShape::classify(None, None), None);
    }

    #[test]
    fn test_number_trims_trailing_zeros() {
        with_ctx(EnglishLabels::new(), |ctx| {
            let info = info(SemanticType::Number);
            assert_eq!(NumberFormatter.format_value(&Value::from(1.5), &info, ctx), "1.5");
            assert_eq!(NumberFormatter.format_value(&Value::from(2.0), &info, ctx), "2");
            assert_eq!(NumberFormatter.format_value(&Value::from(1.239), &info, ctx), "1.24");
            assert_eq!(NumberFormatter.format_value(&Value::from(10), &info, ctx), "10");
        });
    }

    #[test]
    fn test_number_change_keeps_precision_when_rounding_collides() {
        with_ctx(EnglishLabels::new(), |ctx| {
            let info = info(SemanticType::Number);
            let change = |old: f64, new: f64| {
                ChangeEntry::new(
                    "estimated_hours",
                    Some(Value::from(old).into()),
                    Some(Value::from(new).into()),
                )
                .unwrap()
            };

            assert_eq!(
                NumberFormatter
                    .render(&change(1.234, 1.231), "Estimated time", &info, ctx)
                    .unwrap(),
                "Estimated time changed from 1.234 to 1.231"
            );
            assert_eq!(
                NumberFormatter
                    .render(&change(1.234, 2.5), "Estimated time", &info, ctx)
                    .unwrap(),
                "Estimated time changed from 1.23 to 2.5"
            );
        });
    }

    #[test]
    fn test_boolean_uses_label_words() {
        with_ctx(EnglishLabels::new(), |ctx| {
            let info = info(SemanticType::Boolean);
            assert_eq!(BooleanFormatter.format_value(&Value::from(true), &info, ctx), "yes");
            assert_eq!(BooleanFormatter.format_value(&Value::from("0"), &info, ctx), "no");
            assert_eq!(BooleanFormatter.format_value(&Value::from("maybe"), &info, ctx), "maybe");
        });
    }

    #[test]
    fn test_date_uses_configured_pattern() {
        with_ctx(EnglishLabels::new().with_date_format("%d.%m.%Y"), |ctx| {
            let info = info(SemanticType::Date);
            assert_eq!(
                DateFormatter.format_value(&Value::from("2024-01-17"), &info, ctx),
                "17.01.2024"
            );
            assert_eq!(DateFormatter.format_value(&Value::from("soon"), &info, ctx), "soon");
        });
    }

    #[test]
    fn test_invalid_date_pattern_falls_back() {
        with_ctx(EnglishLabels::new().with_date_format("%Q"), |ctx| {
            let info = info(SemanticType::Date);
            assert_eq!(
                DateFormatter.format_value(&Value::from("2024-01-17"), &info, ctx),
                "2024-01-17"
            );
        });
    }

    #[test]
    fn test_unregistered_tag_falls_back_to_text() {
        let registry = FormatterRegistry::empty();
        with_ctx(EnglishLabels::new(), |ctx| {
            let formatter = registry.get(SemanticTag::Boolean);
            assert_eq!(
                formatter.format_value(&Value::from(true), &info(SemanticType::Boolean), ctx),
                "true"
            );
        });
    }

    #[test]
    fn test_list_parts_are_comma_space_separated() {
        with_ctx(EnglishLabels::new(), |ctx| {
            let value = ChangeValue::List(vec![Value::from(true), Value::from(false)]);
            assert_eq!(
                BooleanFormatter.format_change_value(&value, &info(SemanticType::Boolean), ctx),
                "yes, no"
            );
        });
    }
}
