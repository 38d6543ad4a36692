pub mod catalog;
pub mod classify;
pub mod config;
pub mod logging;
pub mod normalize;
pub mod pipeline;

pub use catalog::{CatalogLoadError, CategoryCatalog, CategorySchema, FieldSpec, ValueKind};
pub use classify::Classifier;
pub use normalize::{AliasIndex, NormalizedRecord, RawRecord, SpecValue};
pub use pipeline::{PageInput, ProcessedPage, SpecPipeline};

pub const TARGET_CATALOG: &str = "catalog";
pub const TARGET_CLASSIFY: &str = "classify";
pub const TARGET_NORMALIZE: &str = "normalize";

/// Category tag returned when no classifier rule matches. Its schema is always empty.
pub const UNKNOWN_CATEGORY: &str = "unknown";
