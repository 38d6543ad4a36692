use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::normalize::units::{self, Unit};

/// Fallback priority for categories that do not declare one.
pub const DEFAULT_PRIORITY: i32 = 100;

/// The kind a canonical field's raw text is coerced into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Number,
    Enum,
    Bool,
    Text,
}

impl ValueKind {
    /// Parse the `value_type` spelling used in catalog documents.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "number" => Some(ValueKind::Number),
            "enum" => Some(ValueKind::Enum),
            "bool" | "boolean" => Some(ValueKind::Bool),
            "string" | "text" => Some(ValueKind::Text),
            _ => None,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Number => write!(f, "number"),
            ValueKind::Enum => write!(f, "enum"),
            ValueKind::Bool => write!(f, "bool"),
            ValueKind::Text => write!(f, "string"),
        }
    }
}

/// Declaration of one canonical field within a category.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub aliases: Vec<String>,
    pub value_kind: ValueKind,
    pub canonical_unit: Option<String>,
    // Allowed enum values in declaration order; order breaks substring ties.
    pub allowed_values: Vec<String>,
    unit: Option<&'static Unit>,
}

impl FieldSpec {
    pub fn new(name: &str, value_kind: ValueKind) -> Self {
        FieldSpec {
            name: name.to_string(),
            aliases: Vec::new(),
            value_kind,
            canonical_unit: None,
            allowed_values: Vec::new(),
            unit: None,
        }
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    /// Declare the canonical unit. Spellings outside the unit table are kept but never convert.
    pub fn with_unit(mut self, canonical_unit: &str) -> Self {
        self.unit = units::lookup(canonical_unit);
        self.canonical_unit = Some(canonical_unit.to_string());
        self
    }

    pub fn with_allowed<I, S>(mut self, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_values = allowed.into_iter().map(Into::into).collect();
        self
    }

    /// The canonical unit resolved against the unit table, if it is known there.
    pub fn unit(&self) -> Option<&'static Unit> {
        self.unit
    }
}

/// The canonical fields of a single equipment category.
#[derive(Debug, Clone, PartialEq)]
pub struct CategorySchema {
    tag: String,
    priority: i32,
    fields: BTreeMap<String, FieldSpec>,
}

impl CategorySchema {
    pub fn new(tag: &str) -> Self {
        CategorySchema {
            tag: tag.to_string(),
            priority: DEFAULT_PRIORITY,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_field(mut self, field: FieldSpec) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.values()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
