//! Reading catalog documents.
//!
//! The document is a JSON object keyed by category tag. Each entry is either wrapped
//! (`{"fields": {...}, "priority": 10}`) or a bare map of canonical field name to field
//! declaration. Keys starting with `_` are metadata; `_version` is kept on the catalog.

use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

use super::{CatalogLoadError, CategoryCatalog, CategorySchema, FieldSpec, ValueKind};
use super::types::DEFAULT_PRIORITY;
use crate::TARGET_CATALOG;

const VERSION_KEY: &str = "_version";
const DEFAULT_VALUE_TYPE: &str = "string";

static SHARED_CATALOGS: Lazy<Mutex<HashMap<PathBuf, Arc<CategoryCatalog>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

#[derive(Debug, Deserialize)]
struct FieldDoc {
    #[serde(default)]
    aliases: Vec<String>,
    #[serde(default)]
    value_type: Option<String>,
    #[serde(default)]
    canonical_unit: Option<String>,
    #[serde(default)]
    allowed: Vec<Value>,
    // Descriptive keys ("description", "notes", ...) are accepted and ignored.
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CategoryDoc {
    Wrapped {
        fields: BTreeMap<String, FieldDoc>,
        #[serde(default)]
        priority: Option<i32>,
    },
    Bare(BTreeMap<String, FieldDoc>),
}

impl CategoryCatalog {
    /// Parse and validate a catalog document.
    pub fn from_json_str(document: &str) -> Result<Self, CatalogLoadError> {
        let root: BTreeMap<String, Value> = serde_json::from_str(document)?;

        let mut version = None;
        let mut schemas = Vec::with_capacity(root.len());
        for (tag, value) in root {
            if tag == VERSION_KEY {
                version = Some(match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                });
                continue;
            }
            if tag.starts_with('_') {
                debug!(target: TARGET_CATALOG, "Skipping catalog metadata key '{}'", tag);
                continue;
            }

            let doc: CategoryDoc =
                serde_json::from_value(value).map_err(|source| CatalogLoadError::InvalidCategory {
                    category: tag.clone(),
                    source,
                })?;
            schemas.push(build_schema(&tag, doc)?);
        }

        let catalog = CategoryCatalog::new(schemas)?;
        Ok(match version {
            Some(version) => catalog.with_version(&version),
            None => catalog,
        })
    }

    /// Read and validate the catalog at `path`. Every call reads the file; see [`load_shared`]
    /// for the load-once variant.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogLoadError> {
        let path = path.as_ref();
        let document = fs::read_to_string(path).map_err(|source| CatalogLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_json_str(&document)?;

        info!(
            target: TARGET_CATALOG,
            "Loaded catalog {} ({} categories, version {})",
            path.display(),
            catalog.len(),
            catalog.version().unwrap_or("unversioned")
        );
        Ok(catalog)
    }
}

/// Load the catalog at `path` at most once per process.
///
/// Later calls with the same path return the cached catalog without touching the file or
/// re-validating it. Failed loads are not cached.
pub fn load_shared(path: impl AsRef<Path>) -> Result<Arc<CategoryCatalog>, CatalogLoadError> {
    let path = path.as_ref();
    let mut cache = SHARED_CATALOGS
        .lock()
        .unwrap_or_else(PoisonError::into_inner);

    if let Some(catalog) = cache.get(path) {
        debug!(target: TARGET_CATALOG, "Reusing cached catalog {}", path.display());
        return Ok(Arc::clone(catalog));
    }

    let catalog = Arc::new(CategoryCatalog::load(path)?);
    cache.insert(path.to_path_buf(), Arc::clone(&catalog));
    Ok(catalog)
}

fn build_schema(tag: &str, doc: CategoryDoc) -> Result<CategorySchema, CatalogLoadError> {
    let (fields, priority) = match doc {
        CategoryDoc::Wrapped { fields, priority } => (fields, priority),
        CategoryDoc::Bare(fields) => (fields, None),
    };

    let mut schema = CategorySchema::new(tag).with_priority(priority.unwrap_or(DEFAULT_PRIORITY));
    for (name, field) in fields {
        if !field.extra.is_empty() {
            debug!(
                target: TARGET_CATALOG,
                "Ignoring keys {:?} on field '{}' in category '{}'",
                field.extra.keys().collect::<Vec<_>>(),
                name,
                tag
            );
        }
        let kind_text = field.value_type.as_deref().unwrap_or(DEFAULT_VALUE_TYPE);
        let value_kind =
            ValueKind::parse(kind_text).ok_or_else(|| CatalogLoadError::UnknownValueKind {
                category: tag.to_string(),
                field: name.clone(),
                kind: kind_text.to_string(),
            })?;

        let mut spec = FieldSpec::new(&name, value_kind)
            .with_aliases(field.aliases)
            .with_allowed(field.allowed.iter().filter_map(allowed_text));

        if let Some(unit) = field
            .canonical_unit
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
        {
            spec = spec.with_unit(unit);
            if spec.unit().is_none() {
                warn!(
                    target: TARGET_CATALOG,
                    "Field '{}' in category '{}' declares unit '{}' outside the unit table; values keep their bare magnitude",
                    name, tag, unit
                );
            }
        }

        schema = schema.with_field(spec);
    }

    Ok(schema)
}

fn allowed_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
