//! Category references and reconciliation against the canonical list.

use std::{
    collections::HashSet,
    hash::{Hash, Hasher},
};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Slug used when an item carries no category at all.
pub const UNCATEGORIZED_SLUG: &str = "uncategorized";

const ENVELOPE_KEYS: [&str; 3] = ["listOfCategories", "data", "categories"];
const MAX_ENVELOPE_DEPTH: usize = 4;

/// A category as referenced by articles and media. The slug is the identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryRef {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Stable identifier.
    #[serde(default)]
    pub slug: String,
}

impl CategoryRef {
    /// Category with the given display name and slug.
    pub fn new(name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slug: slug.into(),
        }
    }
}

impl PartialEq for CategoryRef {
    fn eq(&self, other: &Self) -> bool {
        self.slug == other.slug
    }
}

impl Eq for CategoryRef {}

impl Hash for CategoryRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.slug.hash(state);
    }
}

/// Maps a possibly stale category onto the canonical list.
///
/// An unset category becomes the first canonical entry; a slug match is
/// replaced by the canonical value; anything else is kept as is.
pub fn reconcile(current: Option<&CategoryRef>, canonical: &[CategoryRef]) -> Option<CategoryRef> {
    match current {
        None => canonical.first().cloned(),
        Some(candidate) if candidate.slug.is_empty() => canonical.first().cloned().or_else(|| Some(candidate.clone())),
        Some(candidate) => canonical
            .iter()
            .find(|entry| entry.slug == candidate.slug)
            .cloned()
            .or_else(|| Some(candidate.clone())),
    }
}

/// Resolves a bare category string (either a display name or a slug) to a
/// slug through the canonical list. Unknown strings are returned unchanged.
pub fn resolve_slug(raw: Option<&str>, canonical: &[CategoryRef]) -> String {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return UNCATEGORIZED_SLUG.to_string();
    };
    canonical
        .iter()
        .find(|entry| entry.slug == raw)
        .or_else(|| {
            canonical
                .iter()
                .find(|entry| entry.name.eq_ignore_ascii_case(raw))
        })
        .map(|entry| entry.slug.clone())
        .unwrap_or_else(|| raw.to_string())
}

/// Extracts the category list from the endpoint's response.
///
/// Accepts a bare array, `{listOfCategories: [...]}`, `{data: ...}` around
/// either, and arrays of such envelopes. Entries without a slug are skipped
/// and duplicates (by slug) keep their first occurrence.
pub fn unwrap_categories(payload: &Value) -> Vec<CategoryRef> {
    let mut out = Vec::new();
    collect_categories(payload, 0, &mut out);

    let mut seen = HashSet::new();
    out.retain(|category| seen.insert(category.slug.clone()));
    out
}

fn collect_categories(value: &Value, depth: usize, out: &mut Vec<CategoryRef>) {
    if depth > MAX_ENVELOPE_DEPTH {
        tracing::warn!("category payload nested deeper than {MAX_ENVELOPE_DEPTH} levels; ignoring rest");
        return;
    }
    match value {
        Value::Array(items) => {
            for item in items {
                if is_envelope(item) {
                    collect_categories(item, depth + 1, out);
                } else if let Some(category) = category_from_entry(item) {
                    out.push(category);
                }
            }
        },
        Value::Object(object) => {
            if let Some(inner) = ENVELOPE_KEYS.iter().find_map(|key| object.get(*key)) {
                collect_categories(inner, depth + 1, out);
            } else if let Some(category) = category_from_entry(value) {
                out.push(category);
            }
        },
        _ => {},
    }
}

fn is_envelope(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|object| ENVELOPE_KEYS.iter().any(|key| object.contains_key(*key)))
}

fn category_from_entry(value: &Value) -> Option<CategoryRef> {
    let object = value.as_object()?;
    let slug = object
        .get("slug")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|slug| !slug.is_empty())?;
    let name = object
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(slug);
    Some(CategoryRef::new(name, slug))
}
