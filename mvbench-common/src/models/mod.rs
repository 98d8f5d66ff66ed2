//! Record and document models

pub mod document;
pub mod raw;

pub use document::*;
pub use raw::{DateInput, RawMovieRecord, RawValue, StructuredDate};
