use std::path::PathBuf;
use thiserror::Error;

/// Failures surfaced by the rule store and its storage backends.
///
/// None of these roll back the in-memory rule list.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize rules: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("malformed rule import: {0}")]
    MalformedImport(String),
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}
