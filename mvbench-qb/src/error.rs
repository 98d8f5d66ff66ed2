//! Error types for mvbench-qb

use thiserror::Error;

pub type BenchResult<T> = std::result::Result<T, BenchError>;

/// Errors that end a benchmark or validation run
///
/// A failing query execution is not one of them: it becomes a failed timing
/// sample and the run continues.
#[derive(Debug, Error)]
pub enum BenchError {
    /// Store, query or configuration error from mvbench-common
    #[error("Common error: {0}")]
    Common(#[from] mvbench_common::Error),

    /// A collection to benchmark is missing or empty
    #[error("Preflight failed: {0}")]
    Preflight(String),

    /// Report could not be written or read
    #[error("Report IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Report JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
