//! Error types for mvbench-ld

use thiserror::Error;

/// Loader result type
pub type LoadResult<T> = std::result::Result<T, LoadError>;

/// Errors that end a load run
///
/// Per-record transform failures and per-document insert rejections are not
/// errors at this level; they are counted in the load summary.
#[derive(Debug, Error)]
pub enum LoadError {
    /// CSV input could not be read
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A JSON Lines row is not a JSON object
    #[error("Invalid JSON on line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// Input file extension not recognized
    #[error("Unsupported input format: {0} (expected .csv, .jsonl or .ndjson)")]
    UnsupportedFormat(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Store or configuration error from mvbench-common
    #[error("Common error: {0}")]
    Common(#[from] mvbench_common::Error),

    /// Nothing loadable in the input
    #[error("No valid input: {0}")]
    NoValidInput(String),

    /// Background task failure
    #[error("Internal error: {0}")]
    Internal(String),
}
