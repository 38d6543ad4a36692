//! Per-page processing: classify (or take the caller's override), merge the scraped sources,
//! normalize against the catalog.

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::catalog::{self, CategoryCatalog};
use crate::classify::Classifier;
use crate::config::EngineConfig;
use crate::normalize::{self, AliasIndex, NormalizedRecord, RawRecord};
use crate::TARGET_NORMALIZE;

/// Canonical field that falls back to the model number guessed from the page text.
pub const MODEL_FIELD: &str = "model";

lazy_static! {
    static ref MODEL_LABEL: Regex =
        Regex::new(r"(?i)\bmodel(?:\s+(?:number|no\.?))?\s*[:#]?\s*([A-Z0-9][A-Z0-9\-/\.]*)").unwrap();
}

/// Everything the extraction collaborators hand over for one page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageInput {
    #[serde(default)]
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub text: String,
    /// Raw records in precedence order, typically HTML tables then PDF tables.
    #[serde(default)]
    pub sources: Vec<RawRecord>,
    #[serde(default)]
    pub category_override: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CategorySource {
    Override,
    Classifier,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessedPage {
    pub title: String,
    pub url: String,
    pub category: String,
    pub category_source: CategorySource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_guess: Option<String>,
    pub raw: RawRecord,
    pub normalized: NormalizedRecord,
}

/// Catalog, alias index and classifier, built once and shared read-only by every page.
#[derive(Debug, Clone)]
pub struct SpecPipeline {
    catalog: Arc<CategoryCatalog>,
    index: AliasIndex,
    classifier: Classifier,
}

impl SpecPipeline {
    pub fn new(catalog: Arc<CategoryCatalog>, classifier: Classifier) -> Self {
        let index = AliasIndex::build(&catalog);
        SpecPipeline {
            catalog,
            index,
            classifier,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let catalog = catalog::load_shared(&config.catalog_path).with_context(|| {
            format!("Failed to load catalog {}", config.catalog_path.display())
        })?;

        let classifier = match &config.classifier_rules_path {
            Some(path) => Classifier::from_rules_file(path)
                .with_context(|| format!("Failed to load classifier rules {}", path.display()))?,
            None => Classifier::default(),
        };

        info!(
            target: TARGET_NORMALIZE,
            "Pipeline ready: {} categories, {} classifier rules",
            catalog.len(),
            classifier.rules().len()
        );
        Ok(Self::new(catalog, classifier))
    }

    pub fn catalog(&self) -> &CategoryCatalog {
        &self.catalog
    }

    pub fn index(&self) -> &AliasIndex {
        &self.index
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// The page's category: a non-blank override if given, otherwise the classifier's verdict.
    pub fn categorize(&self, page: &PageInput) -> (String, CategorySource) {
        match page
            .category_override
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
        {
            Some(category) => (category.to_string(), CategorySource::Override),
            None => (
                self.classifier
                    .classify(&page.title, &page.url, &page.text)
                    .to_string(),
                CategorySource::Classifier,
            ),
        }
    }

    pub fn normalize(&self, raw: &RawRecord, category: &str) -> NormalizedRecord {
        normalize::normalize(raw, category, &self.catalog, &self.index)
    }

    pub fn process(&self, page: &PageInput) -> ProcessedPage {
        let (category, category_source) = self.categorize(page);
        let raw = RawRecord::from_sources(page.sources.iter().cloned());
        let mut normalized = self.normalize(&raw, &category);

        let model_guess = guess_model(&page.title).or_else(|| guess_model(&page.text));
        if let Some(guess) = &model_guess {
            self.fill_model(&mut normalized, &category, guess);
        }

        ProcessedPage {
            title: page.title.clone(),
            url: page.url.clone(),
            category,
            category_source,
            model_guess,
            raw,
            normalized,
        }
    }

    // Only a schema that declares a model field gets one, and a value from the spec tables wins.
    fn fill_model(&self, normalized: &mut NormalizedRecord, category: &str, guess: &str) {
        if normalized.get(MODEL_FIELD).is_some() {
            return;
        }
        let Some(spec) = self
            .catalog
            .schema(category)
            .and_then(|schema| schema.field(MODEL_FIELD))
        else {
            return;
        };
        if let Some(value) = normalize::coerce(guess, spec) {
            debug!(
                target: TARGET_NORMALIZE,
                "Filling '{}' for '{}' from the page text", MODEL_FIELD, category
            );
            normalized.set(MODEL_FIELD, value);
        }
    }
}

/// Pull a model number out of text such as "Model: 48FC-D12" or "Model # RTU-20".
///
/// Candidates without a digit are skipped, so prose like "model the airflow" is ignored.
pub fn guess_model(text: &str) -> Option<String> {
    MODEL_LABEL
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim_end_matches(['.', '-', '/']))
        .find(|candidate| candidate.chars().any(|c| c.is_ascii_digit()))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CategorySchema, FieldSpec, ValueKind};
    use crate::normalize::SpecValue;
    use crate::UNKNOWN_CATEGORY;

    fn pipeline() -> SpecPipeline {
        let catalog = CategoryCatalog::new(vec![
            CategorySchema::new("rtu")
                .with_field(
                    FieldSpec::new("capacity_ton", ValueKind::Number)
                        .with_aliases(["cooling capacity"])
                        .with_unit("ton"),
                )
                .with_field(FieldSpec::new("voltage_v", ValueKind::Number).with_aliases(["voltage"]))
                .with_field(FieldSpec::new("model", ValueKind::Text).with_aliases(["model number"])),
            CategorySchema::new("boiler").with_field(
                FieldSpec::new("input_mbh", ValueKind::Number)
                    .with_aliases(["input"])
                    .with_unit("MBH"),
            ),
        ])
        .unwrap();
        SpecPipeline::new(Arc::new(catalog), Classifier::default())
    }

    fn page(title: &str, override_category: Option<&str>) -> PageInput {
        PageInput {
            title: title.to_string(),
            url: "https://example.com/products/48fc".to_string(),
            text: "Model: 48FC-D12. Packaged unit.".to_string(),
            sources: vec![
                [("Cooling Capacity", "20 Tons"), ("Voltage", "460V")]
                    .into_iter()
                    .collect(),
                [("Voltage", "208V"), ("Input", "399 MBH")].into_iter().collect(),
            ],
            category_override: override_category.map(str::to_string),
        }
    }

    #[test]
    fn test_process_classifies_and_normalizes() {
        let processed = pipeline().process(&page("48FC Rooftop Unit", None));
        assert_eq!(processed.category, "rtu");
        assert_eq!(processed.category_source, CategorySource::Classifier);
        assert_eq!(processed.model_guess.as_deref(), Some("48FC-D12"));
        assert_eq!(processed.raw.get("Voltage"), Some("460V"));
        assert_eq!(
            processed.normalized.get("capacity_ton"),
            Some(&SpecValue::Number(20.0))
        );
        assert_eq!(processed.normalized.get("voltage_v"), Some(&SpecValue::Number(460.0)));
        assert_eq!(processed.normalized.len(), 3);
    }

    #[test]
    fn test_override_bypasses_classifier() {
        let processed = pipeline().process(&page("48FC Rooftop Unit", Some("boiler")));
        assert_eq!(processed.category, "boiler");
        assert_eq!(processed.category_source, CategorySource::Override);
        assert!(processed.normalized.contains_field("input_mbh"));
        assert!(!processed.normalized.contains_field("capacity_ton"));

        let blank = pipeline().process(&page("48FC Rooftop Unit", Some("  ")));
        assert_eq!(blank.category_source, CategorySource::Classifier);
    }

    #[test]
    fn test_unclassified_page_has_empty_record() {
        let mut input = page("Contact us", None);
        input.url = "http://example.com".to_string();
        input.text = String::new();
        let processed = pipeline().process(&input);
        assert_eq!(processed.category, UNKNOWN_CATEGORY);
        assert!(processed.normalized.is_empty());
        assert_eq!(processed.raw.len(), 3);
    }

    #[test]
    fn test_page_input_from_json() {
        let input: PageInput = serde_json::from_str(
            r#"{"url": "https://example.com/b", "sources": [{"Input": "399 MBH"}], "category_override": "boiler"}"#,
        )
        .unwrap();
        let processed = pipeline().process(&input);
        assert_eq!(processed.normalized.get("input_mbh"), Some(&SpecValue::Number(399.0)));
        assert!(processed.model_guess.is_none());
    }

    #[test]
    fn test_model_guess_fills_missing_model() {
        let processed = pipeline().process(&page("48FC Rooftop Unit", None));
        assert_eq!(
            processed.normalized.get(MODEL_FIELD),
            Some(&SpecValue::Text("48FC-D12".to_string()))
        );

        let mut input = page("48FC Rooftop Unit", None);
        input.sources[0].insert("Model Number", "48FCDA12A2A5");
        let processed = pipeline().process(&input);
        assert_eq!(processed.model_guess.as_deref(), Some("48FC-D12"));
        assert_eq!(
            processed.normalized.get(MODEL_FIELD),
            Some(&SpecValue::Text("48FCDA12A2A5".to_string()))
        );

        // Schemas without a model field are left closed.
        let processed = pipeline().process(&page("48FC Rooftop Unit", Some("boiler")));
        assert!(!processed.normalized.contains_field(MODEL_FIELD));
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_shared_state_is_send_and_sync() {
        assert_send_sync::<CategoryCatalog>();
        assert_send_sync::<AliasIndex>();
        assert_send_sync::<Classifier>();
        assert_send_sync::<SpecPipeline>();
    }

    #[test]
    fn test_concurrent_readers_match_single_threaded_results() {
        let pipeline = Arc::new(pipeline());
        let records: Vec<RawRecord> = vec![
            [("Cooling Capacity", "240,000 Btu/h"), ("Voltage", "460V")]
                .into_iter()
                .collect(),
            [("Cooling Capacity", "20 Tons"), ("Model Number", "48FC")]
                .into_iter()
                .collect(),
            [("Input", "399 MBH"), ("Voltage", "208V")].into_iter().collect(),
        ];
        let expected: Vec<NormalizedRecord> = records
            .iter()
            .map(|raw| pipeline.normalize(raw, "rtu"))
            .collect();

        std::thread::scope(|scope| {
            let workers: Vec<_> = (0..8)
                .map(|_| {
                    let pipeline = Arc::clone(&pipeline);
                    let records = &records;
                    scope.spawn(move || {
                        (0..50)
                            .flat_map(|_| records.iter().map(|raw| pipeline.normalize(raw, "rtu")))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            for worker in workers {
                let results = worker.join().unwrap();
                for chunk in results.chunks(records.len()) {
                    assert_eq!(chunk, expected.as_slice());
                }
            }
        });
    }

    #[test]
    fn test_guess_model() {
        assert_eq!(guess_model("Model: 48FC-D12"), Some("48FC-D12".to_string()));
        assert_eq!(guess_model("MODEL # RTU-20."), Some("RTU-20".to_string()));
        assert_eq!(guess_model("Model Number 30XV140"), Some("30XV140".to_string()));
        assert_eq!(guess_model("Use the model the airflow. Model: ZX9"), Some("ZX9".to_string()));
        assert_eq!(guess_model("No identifiers here"), None);
    }
}
