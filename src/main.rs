use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use specharvest::catalog::{self, CategoryCatalog};
use specharvest::config::EngineConfig;
use specharvest::normalize::{AliasIndex, RawRecord};
use specharvest::pipeline::{PageInput, SpecPipeline};
use specharvest::{Classifier, TARGET_NORMALIZE};

#[derive(Parser)]
#[command(author, version, about = "Classify and normalize scraped equipment specifications", long_about = None)]
struct Cli {
    /// Catalog document (overrides SPEC_CATALOG_PATH)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Classifier rules, a JSON list of [pattern, category] (overrides CLASSIFIER_RULES_PATH)
    #[arg(long, global = true)]
    rules: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the catalog and list its categories
    Catalog,

    /// Print the category for a page
    Classify {
        /// Page title
        #[arg(short, long, default_value = "")]
        title: String,

        /// Page URL
        #[arg(short, long)]
        url: String,

        /// File holding the extracted body text
        #[arg(long)]
        text_file: Option<PathBuf>,
    },

    /// Normalize a raw record (a JSON object, or an array of objects merged first-wins)
    Normalize {
        /// Target category tag
        #[arg(short, long)]
        category: String,

        /// Raw record JSON file
        #[arg(short, long)]
        raw: PathBuf,
    },

    /// Classify and normalize a page JSON file (title, url, text, sources, category_override)
    Process {
        /// Page JSON file
        #[arg(short, long)]
        page: PathBuf,
    },
}

struct CategorySummary<'a> {
    category: &'a str,
    priority: i32,
    fields: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = EngineConfig::from_env();
    if let Some(path) = cli.catalog {
        config.catalog_path = path;
    }
    if let Some(path) = cli.rules {
        config.classifier_rules_path = Some(path);
    }

    fs::create_dir_all(&config.log_dir)
        .with_context(|| format!("Failed to create log directory {}", config.log_dir.display()))?;
    specharvest::logging::configure_logging(&config.log_dir);

    match cli.command {
        Commands::Catalog => {
            let catalog = catalog::load_shared(&config.catalog_path).with_context(|| {
                format!("Failed to load catalog {}", config.catalog_path.display())
            })?;
            print_catalog(&catalog)?;
        }

        Commands::Classify {
            title,
            url,
            text_file,
        } => {
            let classifier = match &config.classifier_rules_path {
                Some(path) => Classifier::from_rules_file(path)?,
                None => Classifier::default(),
            };
            let text = match text_file {
                Some(path) => read_file(&path)?,
                None => String::new(),
            };
            println!("{}", classifier.classify(&title, &url, &text));
        }

        Commands::Normalize { category, raw } => {
            let catalog: Arc<CategoryCatalog> = catalog::load_shared(&config.catalog_path)
                .with_context(|| {
                    format!("Failed to load catalog {}", config.catalog_path.display())
                })?;
            let pipeline = SpecPipeline::new(catalog, Classifier::default());
            let record = read_raw_record(&raw)?;

            let normalized = pipeline.normalize(&record, &category);
            info!(
                target: TARGET_NORMALIZE,
                "Resolved {} of {} fields for '{}' from {} raw pairs",
                normalized.resolved_count(),
                normalized.len(),
                category,
                record.len()
            );
            println!("{}", serde_json::to_string_pretty(&normalized)?);
        }

        Commands::Process { page } => {
            let pipeline = SpecPipeline::from_config(&config)?;
            let input: PageInput = serde_json::from_str(&read_file(&page)?)
                .with_context(|| format!("Malformed page file {}", page.display()))?;

            let processed = pipeline.process(&input);
            info!(
                target: TARGET_NORMALIZE,
                "{} -> {} ({} of {} fields resolved)",
                processed.url,
                processed.category,
                processed.normalized.resolved_count(),
                processed.normalized.len()
            );
            println!("{}", serde_json::to_string_pretty(&processed)?);
        }
    }

    Ok(())
}

fn print_catalog(catalog: &CategoryCatalog) -> Result<()> {
    let summary: Vec<CategorySummary> = catalog
        .categories()
        .map(|schema| CategorySummary {
            category: schema.tag(),
            priority: schema.priority(),
            fields: schema.len(),
        })
        .collect();

    let index = AliasIndex::build(catalog);

    println!(
        "Catalog version: {}",
        catalog.version().unwrap_or("unversioned")
    );
    println!("Global labels: {}", index.global_len());
    println!("{:<24} | {:>8} | {:>6}", "Category", "Priority", "Fields");
    println!("{}", "-".repeat(44));
    for row in &summary {
        println!(
            "{:<24} | {:>8} | {:>6}",
            row.category, row.priority, row.fields
        );
    }
    Ok(())
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Accept either a single object or an array of objects in source precedence order.
fn read_raw_record(path: &Path) -> Result<RawRecord> {
    let value: serde_json::Value = serde_json::from_str(&read_file(path)?)
        .with_context(|| format!("Malformed raw record {}", path.display()))?;

    let record = match value {
        serde_json::Value::Array(sources) => {
            let sources = sources
                .into_iter()
                .map(serde_json::from_value::<RawRecord>)
                .collect::<Result<Vec<_>, _>>()
                .with_context(|| format!("Malformed raw record source in {}", path.display()))?;
            RawRecord::from_sources(sources)
        }
        other => serde_json::from_value(other)
            .with_context(|| format!("Malformed raw record {}", path.display()))?,
    };
    Ok(record)
}
