//! # mvbench Loader
//!
//! Reads a movie dataset, keeps the most complete record per source id,
//! transforms the survivors into V1 or V2 documents and inserts them into
//! the document store.

pub mod error;
pub mod input;
pub mod loader;
pub mod verify;

pub use error::{LoadError, LoadResult};
pub use input::{read_records, DatasetDiagnostics, InputFormat};
pub use loader::{run_load, LoadSummary, LoaderOptions};
pub use verify::{verify_collection, VerificationReport};
