use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure to load the category catalog. The catalog is required configuration, so callers
/// are expected to treat any of these as fatal.
#[derive(Debug, Error)]
pub enum CatalogLoadError {
    #[error("failed to read catalog '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed catalog document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("category '{category}' is malformed: {source}")]
    InvalidCategory {
        category: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("field '{field}' in category '{category}' declares unknown value kind '{kind}'")]
    UnknownValueKind {
        category: String,
        field: String,
        kind: String,
    },
    #[error("reserved category '{0}' must not declare fields")]
    ReservedCategory(String),
    #[error("catalog contains an empty category tag")]
    EmptyCategoryTag,
    #[error("category '{0}' contains an empty field name")]
    EmptyFieldName(String),
    #[error("category '{0}' is declared more than once")]
    DuplicateCategory(String),
}
