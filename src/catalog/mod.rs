//! Category catalog: the declarative schema of canonical fields per equipment category.
//!
//! A catalog is built once (usually from `specs/spec_catalog.json`) and never mutated
//! afterwards. It is shared by reference between the alias index, the classifier pipeline
//! and every normalization call.

mod error;
mod loader;
mod types;

pub use error::CatalogLoadError;
pub use loader::load_shared;
pub use types::*;

use std::collections::BTreeMap;

use crate::UNKNOWN_CATEGORY;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryCatalog {
    version: Option<String>,
    categories: BTreeMap<String, CategorySchema>,
    // Category tags by ascending priority, ties broken lexicographically.
    fallback_order: Vec<String>,
}

impl CategoryCatalog {
    /// Assemble a catalog from already-built schemas.
    pub fn new<I>(schemas: I) -> Result<Self, CatalogLoadError>
    where
        I: IntoIterator<Item = CategorySchema>,
    {
        let mut categories = BTreeMap::new();
        for schema in schemas {
            if schema.tag().trim().is_empty() {
                return Err(CatalogLoadError::EmptyCategoryTag);
            }
            if schema.tag() == UNKNOWN_CATEGORY && !schema.is_empty() {
                return Err(CatalogLoadError::ReservedCategory(schema.tag().to_string()));
            }
            if schema.field_names().any(|name| name.trim().is_empty()) {
                return Err(CatalogLoadError::EmptyFieldName(schema.tag().to_string()));
            }
            if categories.contains_key(schema.tag()) {
                return Err(CatalogLoadError::DuplicateCategory(schema.tag().to_string()));
            }
            categories.insert(schema.tag().to_string(), schema);
        }

        let mut ordered: Vec<&CategorySchema> = categories.values().collect();
        ordered.sort_by(|a, b| a.priority().cmp(&b.priority()).then_with(|| a.tag().cmp(b.tag())));
        let fallback_order = ordered.iter().map(|s| s.tag().to_string()).collect();

        Ok(CategoryCatalog {
            version: None,
            categories,
            fallback_order,
        })
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Schema for `tag`. Tags the catalog does not declare, including `"unknown"`, have none.
    pub fn schema(&self, tag: &str) -> Option<&CategorySchema> {
        self.categories.get(tag)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.categories.contains_key(tag)
    }

    /// Categories in fallback priority order.
    pub fn categories(&self) -> impl Iterator<Item = &CategorySchema> {
        self.fallback_order
            .iter()
            .filter_map(|tag| self.categories.get(tag))
    }

    pub fn fallback_order(&self) -> &[String] {
        &self.fallback_order
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(tag: &str) -> CategorySchema {
        CategorySchema::new(tag).with_field(FieldSpec::new("model", ValueKind::Text))
    }

    #[test]
    fn test_fallback_order_is_lexicographic_by_default() {
        let catalog =
            CategoryCatalog::new(vec![schema("rtu"), schema("boiler"), schema("chiller")]).unwrap();
        assert_eq!(catalog.fallback_order(), &["boiler", "chiller", "rtu"]);
    }

    #[test]
    fn test_fallback_order_honours_priority() {
        let catalog = CategoryCatalog::new(vec![
            schema("boiler"),
            schema("rtu").with_priority(1),
            schema("chiller").with_priority(1),
        ])
        .unwrap();
        assert_eq!(catalog.fallback_order(), &["chiller", "rtu", "boiler"]);
        let tags: Vec<&str> = catalog.categories().map(|s| s.tag()).collect();
        assert_eq!(tags, vec!["chiller", "rtu", "boiler"]);
    }

    #[test]
    fn test_unknown_category_must_be_empty() {
        assert!(matches!(
            CategoryCatalog::new(vec![schema(UNKNOWN_CATEGORY)]),
            Err(CatalogLoadError::ReservedCategory(tag)) if tag == "unknown"
        ));

        let catalog = CategoryCatalog::new(vec![CategorySchema::new(UNKNOWN_CATEGORY)]).unwrap();
        assert!(catalog.schema(UNKNOWN_CATEGORY).unwrap().is_empty());
    }

    #[test]
    fn test_rejects_duplicates_and_empty_tags() {
        assert!(matches!(
            CategoryCatalog::new(vec![schema("rtu"), schema("rtu")]),
            Err(CatalogLoadError::DuplicateCategory(_))
        ));
        assert!(matches!(
            CategoryCatalog::new(vec![schema("  ")]),
            Err(CatalogLoadError::EmptyCategoryTag)
        ));
    }
}
