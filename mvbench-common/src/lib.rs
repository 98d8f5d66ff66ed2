//! # mvbench Common Library
//!
//! Shared code for the movie schema benchmark tools:
//! - Raw record and document models (V1 nested, V2 denormalized)
//! - Field parsers and derived-field calculations
//! - Record-to-document transformation and duplicate selection
//! - Timing statistics for repeated query measurements
//! - Aggregation pipeline engine and the SQLite-backed document store
//! - Configuration loading

pub mod config;
pub mod db;
pub mod dedup;
pub mod derived;
pub mod error;
pub mod models;
pub mod parsers;
pub mod query;
pub mod timing;
pub mod transform;

pub use error::{Error, Result};
pub use models::{MovieDocument, RawMovieRecord, RawValue, SchemaVersion};
pub use transform::{transform, TransformError};
