//! Alias index: folded label text to canonical field name.
//!
//! Each category gets its own scope. A flattened global scope is consulted only when a label
//! is unknown to the target category; on collisions there the category that comes first in
//! the catalog's fallback order wins.

use std::collections::HashMap;
use tracing::{debug, info};
use unicode_normalization::UnicodeNormalization;

use crate::catalog::{CategoryCatalog, CategorySchema};
use crate::TARGET_NORMALIZE;

/// Where a label was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasScope {
    Category,
    Global,
}

#[derive(Debug, Clone, Default)]
pub struct AliasIndex {
    scoped: HashMap<String, HashMap<String, String>>,
    global: HashMap<String, String>,
}

impl AliasIndex {
    pub fn build(catalog: &CategoryCatalog) -> Self {
        let mut scoped = HashMap::with_capacity(catalog.len());
        let mut global: HashMap<String, String> = HashMap::new();

        for schema in catalog.categories() {
            let aliases = build_scope(schema);
            for (alias, canonical) in &aliases {
                global
                    .entry(alias.clone())
                    .or_insert_with(|| canonical.clone());
            }
            scoped.insert(schema.tag().to_string(), aliases);
        }

        info!(
            target: TARGET_NORMALIZE,
            "Built alias index: {} categories, {} global labels",
            scoped.len(),
            global.len()
        );

        AliasIndex { scoped, global }
    }

    /// Resolve a raw label within `category` only.
    pub fn resolve_scoped(&self, category: &str, label: &str) -> Option<&str> {
        self.scoped
            .get(category)
            .and_then(|aliases| aliases.get(&fold_label(label)))
            .map(String::as_str)
    }

    /// Resolve a raw label against every category.
    pub fn resolve_global(&self, label: &str) -> Option<&str> {
        self.global.get(&fold_label(label)).map(String::as_str)
    }

    /// Resolve a raw label for `category`, falling back to the global scope.
    pub fn resolve(&self, category: &str, label: &str) -> Option<(&str, AliasScope)> {
        let folded = fold_label(label);
        if let Some(canonical) = self
            .scoped
            .get(category)
            .and_then(|aliases| aliases.get(&folded))
        {
            return Some((canonical.as_str(), AliasScope::Category));
        }
        self.global
            .get(&folded)
            .map(|canonical| (canonical.as_str(), AliasScope::Global))
    }

    pub fn global_len(&self) -> usize {
        self.global.len()
    }
}

// Canonical names are registered before aliases so a field's own name can never be claimed
// as another field's alias. Among aliases, the first registration wins.
fn build_scope(schema: &CategorySchema) -> HashMap<String, String> {
    let mut aliases: HashMap<String, String> = HashMap::new();

    for field in schema.fields() {
        aliases.insert(fold_label(&field.name), field.name.clone());
    }

    for field in schema.fields() {
        for alias in &field.aliases {
            let folded = fold_label(alias);
            if folded.is_empty() {
                continue;
            }
            match aliases.get(&folded) {
                Some(existing) if existing != &field.name => {
                    debug!(
                        target: TARGET_NORMALIZE,
                        "Alias '{}' in category '{}' already maps to '{}'; ignoring it for '{}'",
                        alias,
                        schema.tag(),
                        existing,
                        field.name
                    );
                }
                Some(_) => {}
                None => {
                    aliases.insert(folded, field.name.clone());
                }
            }
        }
    }

    aliases
}

/// Fold a field label for lookup: compatibility-normalized, lowercase, single-spaced,
/// without a trailing colon.
pub fn fold_label(label: &str) -> String {
    label
        .nfkc()
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(':')
        .trim_end()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FieldSpec, ValueKind};

    fn catalog() -> CategoryCatalog {
        CategoryCatalog::new(vec![
            CategorySchema::new("rtu")
                .with_field(
                    FieldSpec::new("capacity_ton", ValueKind::Number)
                        .with_aliases(["tons", "Cooling Capacity"]),
                )
                .with_field(FieldSpec::new("eer", ValueKind::Number).with_aliases(["EER", "tons"]))
                .with_field(FieldSpec::new("refrigerant", ValueKind::Enum)),
            CategorySchema::new("chiller_air_cooled")
                .with_field(
                    FieldSpec::new("capacity_ton", ValueKind::Number)
                        .with_aliases(["nominal tons"]),
                )
                .with_field(FieldSpec::new("kw_per_ton", ValueKind::Number).with_aliases(["eff"])),
            CategorySchema::new("boiler")
                .with_field(FieldSpec::new("efficiency", ValueKind::Number).with_aliases(["eff"])),
        ])
        .unwrap()
    }

    #[test]
    fn test_fold_label() {
        assert_eq!(fold_label("  Cooling   Capacity: "), "cooling capacity");
        assert_eq!(fold_label("EER"), "eer");
        assert_eq!(fold_label("Ｖｏｌｔａｇｅ"), "voltage");
    }

    #[test]
    fn test_scoped_resolution_includes_canonical_names() {
        let index = AliasIndex::build(&catalog());
        assert_eq!(index.resolve_scoped("rtu", "Cooling Capacity"), Some("capacity_ton"));
        assert_eq!(index.resolve_scoped("rtu", "REFRIGERANT"), Some("refrigerant"));
        assert_eq!(index.resolve_scoped("rtu", "nominal tons"), None);
        assert_eq!(index.resolve_scoped("missing", "tons"), None);
    }

    #[test]
    fn test_alias_collision_within_category_is_stable() {
        let index = AliasIndex::build(&catalog());
        // Fields register in name order, so capacity_ton claims "tons" before eer does.
        assert_eq!(index.resolve_scoped("rtu", "tons"), Some("capacity_ton"));
    }

    #[test]
    fn test_global_fallback_uses_catalog_order() {
        let index = AliasIndex::build(&catalog());
        assert_eq!(
            index.resolve("rtu", "Nominal Tons"),
            Some(("capacity_ton", AliasScope::Global))
        );
        assert_eq!(index.resolve("rtu", "tons"), Some(("capacity_ton", AliasScope::Category)));
        // "eff" is declared by boiler and chiller_air_cooled; boiler sorts first.
        assert_eq!(index.resolve_global("eff"), Some("efficiency"));
        assert_eq!(index.resolve("rtu", "sound power"), None);
    }

    #[test]
    fn test_global_labels_are_deduplicated() {
        let index = AliasIndex::build(&catalog());
        // capacity_ton, eer, refrigerant, tons, cooling capacity, kw_per_ton, nominal tons,
        // eff, efficiency; shared labels count once.
        assert_eq!(index.global_len(), 9);
    }
}
