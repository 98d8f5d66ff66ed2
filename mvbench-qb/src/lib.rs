//! # mvbench Query Benchmark
//!
//! Times the V1 and V2 variants of each catalog query against their
//! collections, checks that both variants return the same rows, and writes
//! a comparison report.

pub mod catalog;
pub mod error;
pub mod report;
pub mod runner;
pub mod validate;

pub use catalog::{catalog, QueryPair};
pub use error::{BenchError, BenchResult};
pub use report::{AggregateStats, CliFormatter, ComparisonReport, QueryStatus, REPORT_FILE_NAME};
pub use runner::{preflight, run_benchmark, QueryOutcome, RunOptions};
pub use validate::{validate_v2, ValidationReport};
