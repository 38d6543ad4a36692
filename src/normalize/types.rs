use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::catalog::CategorySchema;

/// Label/value pairs scraped from one page, merged across HTML and PDF sources.
///
/// Keys are stored trimmed. The first value seen for a key wins; later sources never
/// overwrite it. Pairs with an empty key or value are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct RawRecord {
    pairs: BTreeMap<String, String>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge several sources in order, first source wins on key collision.
    pub fn from_sources<I>(sources: I) -> Self
    where
        I: IntoIterator<Item = RawRecord>,
    {
        let mut merged = RawRecord::new();
        for source in sources {
            merged.merge(source);
        }
        merged
    }

    /// Insert a pair unless the key is already set. Returns whether the pair was stored.
    pub fn insert(&mut self, key: &str, value: &str) -> bool {
        let key = key.trim();
        let value = value.trim();
        if key.is_empty() || value.is_empty() || self.pairs.contains_key(key) {
            return false;
        }
        self.pairs.insert(key.to_string(), value.to_string());
        true
    }

    pub fn merge(&mut self, other: RawRecord) {
        for (key, value) in other.pairs {
            self.insert(&key, &value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.get(key.trim()).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl From<BTreeMap<String, String>> for RawRecord {
    fn from(map: BTreeMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}

impl From<RawRecord> for BTreeMap<String, String> {
    fn from(record: RawRecord) -> Self {
        record.pairs
    }
}

impl<K, V> FromIterator<(K, V)> for RawRecord
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut record = RawRecord::new();
        for (key, value) in iter {
            record.insert(key.as_ref(), value.as_ref());
        }
        record
    }
}

/// A coerced field value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SpecValue {
    Number(f64),
    Enum(String),
    Bool(bool),
    Text(String),
}

impl fmt::Display for SpecValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecValue::Number(n) => write!(f, "{}", n),
            SpecValue::Enum(s) | SpecValue::Text(s) => write!(f, "{}", s),
            SpecValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// One value per canonical field of a category; `None` marks a field nothing resolved to.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NormalizedRecord {
    fields: BTreeMap<String, Option<SpecValue>>,
}

impl NormalizedRecord {
    /// A record with every field of `schema` present and absent.
    pub fn empty_for(schema: &CategorySchema) -> Self {
        NormalizedRecord {
            fields: schema.field_names().map(|name| (name.to_string(), None)).collect(),
        }
    }

    /// Set a value for a field of the record's schema. Names outside the schema are ignored.
    pub(crate) fn set(&mut self, field: &str, value: SpecValue) -> bool {
        match self.fields.get_mut(field) {
            Some(slot) => {
                *slot = Some(value);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, field: &str) -> Option<&SpecValue> {
        self.fields.get(field).and_then(Option::as_ref)
    }

    pub fn contains_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&SpecValue>)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    /// Number of fields holding a value.
    pub fn resolved_count(&self) -> usize {
        self.fields.values().filter(|v| v.is_some()).count()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Present values rendered back to text, keyed by canonical field name.
    pub fn to_raw(&self) -> RawRecord {
        self.fields
            .iter()
            .filter_map(|(k, v)| v.as_ref().map(|v| (k.as_str(), v.to_string())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FieldSpec, ValueKind};

    #[test]
    fn test_first_source_wins() {
        let html: RawRecord = [("Voltage", "460V"), ("Weight", "1,200 lb")].into_iter().collect();
        let pdf: RawRecord = [("Voltage", "208/230V"), ("Refrigerant", "R-410A")]
            .into_iter()
            .collect();

        let merged = RawRecord::from_sources(vec![html, pdf]);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.get("Voltage"), Some("460V"));
        assert_eq!(merged.get("Refrigerant"), Some("R-410A"));
    }

    #[test]
    fn test_insert_skips_blank_pairs() {
        let mut record = RawRecord::new();
        assert!(!record.insert("  ", "x"));
        assert!(!record.insert("Model", "   "));
        assert!(record.insert(" Model ", " 48FC "));
        assert!(!record.insert("Model", "other"));
        assert_eq!(record.get("Model"), Some("48FC"));
    }

    #[test]
    fn test_deserialize_filters_blank_values() {
        let record: RawRecord =
            serde_json::from_str(r#"{"Cooling Capacity": "20 Tons", "Notes": ""}"#).unwrap();
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn test_normalized_record_serializes_absent_as_null() {
        let schema = crate::catalog::CategorySchema::new("rtu")
            .with_field(FieldSpec::new("eer", ValueKind::Number))
            .with_field(FieldSpec::new("model", ValueKind::Text));
        let mut record = NormalizedRecord::empty_for(&schema);
        assert!(record.set("eer", SpecValue::Number(11.2)));
        assert!(!record.set("ieer", SpecValue::Number(14.0)));

        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"eer":11.2,"model":null}"#);
        assert_eq!(record.resolved_count(), 1);
        assert_eq!(record.to_raw().get("eer"), Some("11.2"));
    }
}
