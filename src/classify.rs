//! Page classification: decides which equipment category a scraped page describes.
//!
//! Rules are evaluated strictly in order against the lowercased title, URL and body text.
//! The first rule whose pattern matches anywhere wins; there is no scoring.

use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::{TARGET_CLASSIFY, UNKNOWN_CATEGORY};

/// Built-in rules, most specific equipment families first.
pub const DEFAULT_RULES: &[(&str, &str)] = &[
    (r"rtu|rooftop", "rtu"),
    (r"chiller|air[- ]cooled chiller", "chiller_air_cooled"),
    (r"doas|dedicated outdoor air|energy recovery|erv|hrv|ahu", "ahu_doas"),
    (r"vrf|vrv|mini[- ]split", "vrf_od"),
    (r"boiler|water heater", "boiler"),
    (r"pump|circulator", "pump"),
    (r"cooling tower|evapco|closed[- ]circuit", "cooling_tower"),
    (r"fan coil|fcu", "fcu"),
    (r"ptac|vtac", "ptac"),
    (r"heat exchanger|plate|sondex", "hx"),
    (r"vfd|drive|eaton", "vfd"),
    (r"filter|iaq|ion", "filter_iaq"),
];

lazy_static! {
    static ref DEFAULT_RULE_SET: Vec<ClassifierRule> = DEFAULT_RULES
        .iter()
        .map(|(pattern, category)| ClassifierRule::new(pattern, category).unwrap())
        .collect();
}

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("invalid pattern '{pattern}' for category '{category}': {source}")]
    InvalidPattern {
        pattern: String,
        category: String,
        #[source]
        source: regex::Error,
    },
    #[error("failed to read classifier rules '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed classifier rules: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct ClassifierRule {
    pattern: Regex,
    category: String,
}

impl ClassifierRule {
    pub fn new(pattern: &str, category: &str) -> Result<Self, ClassifierError> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|source| ClassifierError::InvalidPattern {
                pattern: pattern.to_string(),
                category: category.to_string(),
                source,
            })?;
        Ok(ClassifierRule {
            pattern: regex,
            category: category.to_string(),
        })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn category(&self) -> &str {
        &self.category
    }
}

#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<ClassifierRule>,
}

impl Default for Classifier {
    fn default() -> Self {
        Classifier {
            rules: DEFAULT_RULE_SET.clone(),
        }
    }
}

impl Classifier {
    /// Build a classifier from ordered `(pattern, category)` pairs.
    pub fn new<I, P, C>(rules: I) -> Result<Self, ClassifierError>
    where
        I: IntoIterator<Item = (P, C)>,
        P: AsRef<str>,
        C: AsRef<str>,
    {
        let rules = rules
            .into_iter()
            .map(|(pattern, category)| ClassifierRule::new(pattern.as_ref(), category.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Classifier { rules })
    }

    /// Load rules from a JSON array of `[pattern, category]` pairs.
    pub fn from_rules_file(path: impl AsRef<Path>) -> Result<Self, ClassifierError> {
        let path = path.as_ref();
        let document = fs::read_to_string(path).map_err(|source| ClassifierError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let rules: Vec<(String, String)> = serde_json::from_str(&document)?;
        Self::new(rules)
    }

    /// Category of the first rule matching the combined page text, or `"unknown"`.
    pub fn classify(&self, title: &str, url: &str, page_text: &str) -> &str {
        let combined = format!("{} {} {}", title, url, page_text).to_lowercase();

        match self.rules.iter().find(|rule| rule.pattern.is_match(&combined)) {
            Some(rule) => {
                debug!(
                    target: TARGET_CLASSIFY,
                    "Classified '{}' as '{}' (pattern '{}')",
                    url,
                    rule.category,
                    rule.pattern()
                );
                &rule.category
            }
            None => {
                debug!(target: TARGET_CLASSIFY, "No rule matched '{}'", url);
                UNKNOWN_CATEGORY
            }
        }
    }

    pub fn rules(&self) -> &[ClassifierRule] {
        &self.rules
    }
}
