//! Error types for differential expression computations

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the differential expression engine
#[derive(Error, Debug)]
pub enum DiffExprError {
    #[error("Selection {name} is empty")]
    EmptySelection { name: String },

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Row index {index} is out of bounds for a dataset with {num_rows} rows")]
    IndexOutOfBounds { index: usize, num_rows: usize },

    #[error("None of the clusters in selection {name} are present in the average expression matrix")]
    NoMatchingClusters { name: String },

    #[error("Empty data: {reason}")]
    EmptyData { reason: String },

    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for differential expression operations
pub type Result<T> = std::result::Result<T, DiffExprError>;
