//! Load pipeline: deduplicate → transform → replace collection → insert
//!
//! Transformation is CPU-bound and runs on the rayon pool inside
//! `spawn_blocking`. Insertion is I/O-bound and runs as concurrent batches
//! via `futures::stream::buffer_unordered`; documents are independent, so
//! batch completion order does not matter.
//!
//! Recoverable problems (malformed records, duplicate keys, rejected
//! documents) become counters in [`LoadSummary`]. Only store failures and
//! the absence of any valid input end the run.

use crate::error::{LoadError, LoadResult};
use crate::input::DatasetDiagnostics;
use futures::stream::{self, StreamExt};
use mvbench_common::db::{DocumentStore, InsertOutcome};
use mvbench_common::dedup::select_most_complete;
use mvbench_common::{transform, RawMovieRecord, SchemaVersion};
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, warn};

/// Progress is logged every this many completed batches
const PROGRESS_INTERVAL: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderOptions {
    pub schema: SchemaVersion,
    pub collection: String,
    pub batch_size: usize,
    pub workers: usize,
}

impl LoaderOptions {
    /// Options with the schema's default collection name
    pub fn new(schema: SchemaVersion, batch_size: usize, workers: usize) -> Self {
        Self {
            schema,
            collection: schema.default_collection().to_string(),
            batch_size,
            workers,
        }
    }
}

/// Counters reported at the end of a load
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub rows_read: usize,
    pub duplicates_removed: usize,
    pub transform_errors: usize,
    pub inserted: u64,
    pub duplicate_keys: u64,
    pub other_errors: u64,
}

/// Transformed documents of one batch plus its failure count
#[derive(Debug, Default)]
struct TransformedBatch {
    documents: Vec<Value>,
    errors: usize,
}

/// Transform records in parallel, keeping input order
fn transform_records(records: &[RawMovieRecord], schema: SchemaVersion) -> TransformedBatch {
    let results: Vec<Option<Value>> = records
        .par_iter()
        .map(|record| match transform(record, schema) {
            Ok(document) => match document.to_value() {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(error = %e, "Failed to encode document");
                    None
                }
            },
            Err(e) => {
                debug!(error = %e, "Skipping record");
                None
            }
        })
        .collect();

    let errors = results.iter().filter(|r| r.is_none()).count();
    TransformedBatch {
        documents: results.into_iter().flatten().collect(),
        errors,
    }
}

/// Run a full load into `options.collection`
///
/// The target collection is dropped only once at least one record has
/// transformed successfully, so an unusable input never wipes existing data.
pub async fn run_load<S>(
    store: &S,
    records: Vec<RawMovieRecord>,
    options: &LoaderOptions,
) -> LoadResult<LoadSummary>
where
    S: DocumentStore + ?Sized,
{
    let rows_read = records.len();
    if rows_read == 0 {
        return Err(LoadError::NoValidInput("input contains no records".to_string()));
    }

    DatasetDiagnostics::from_records(&records).log();

    let dedup = select_most_complete(records);
    info!(
        original = rows_read,
        after = dedup.records.len(),
        removed = dedup.removed_count,
        "Deduplicated records"
    );

    let schema = options.schema;
    let records = dedup.records;
    let transformed = tokio::task::spawn_blocking(move || transform_records(&records, schema))
        .await
        .map_err(|e| LoadError::Internal(format!("Transform task failed: {}", e)))?;

    info!(
        schema = %schema,
        documents = transformed.documents.len(),
        errors = transformed.errors,
        "Transformed records"
    );

    if transformed.documents.is_empty() {
        return Err(LoadError::NoValidInput(format!(
            "none of {} records could be transformed",
            rows_read
        )));
    }

    store.drop_collection(&options.collection).await?;
    info!(collection = %options.collection, "Dropped existing collection");

    let outcome = insert_batches(store, transformed.documents, options).await?;

    let summary = LoadSummary {
        rows_read,
        duplicates_removed: dedup.removed_count,
        transform_errors: transformed.errors,
        inserted: outcome.inserted,
        duplicate_keys: outcome.duplicates,
        other_errors: outcome.other_errors,
    };

    info!(
        collection = %options.collection,
        inserted = summary.inserted,
        duplicate_keys = summary.duplicate_keys,
        other_errors = summary.other_errors,
        "Load complete"
    );

    Ok(summary)
}

async fn insert_batches<S>(
    store: &S,
    documents: Vec<Value>,
    options: &LoaderOptions,
) -> LoadResult<InsertOutcome>
where
    S: DocumentStore + ?Sized,
{
    let batch_size = options.batch_size.max(1);
    let workers = options.workers.max(1);

    let mut batches = Vec::with_capacity(documents.len() / batch_size + 1);
    let mut iter = documents.into_iter().peekable();
    while iter.peek().is_some() {
        batches.push(iter.by_ref().take(batch_size).collect::<Vec<_>>());
    }

    let total_batches = batches.len();
    let completed = AtomicUsize::new(0);
    let collection = options.collection.as_str();

    info!(batches = total_batches, batch_size, workers, "Inserting documents");

    let results: Vec<LoadResult<InsertOutcome>> = stream::iter(batches)
        .map(|batch| {
            let completed = &completed;
            async move {
                let outcome = store.insert_many_unordered(collection, batch).await?;

                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                if done % PROGRESS_INTERVAL == 0 || done == total_batches {
                    info!(progress = format!("{}/{}", done, total_batches), "Insert progress");
                }
                Ok(outcome)
            }
        })
        .buffer_unordered(workers)
        .collect()
        .await;

    let mut total = InsertOutcome::default();
    for result in results {
        total.absorb(result?);
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mvbench_common::RawValue;

    fn record(id: &str) -> RawMovieRecord {
        RawMovieRecord::new().with("id", RawValue::Text(id.to_string()))
    }

    #[test]
    fn test_transform_records_counts_failures() {
        let batch = transform_records(&[record("1"), record("x"), record("2")], SchemaVersion::V2);

        assert_eq!(batch.documents.len(), 2);
        assert_eq!(batch.errors, 1);
        assert_eq!(batch.documents[0]["_id"], serde_json::json!(1));
        assert_eq!(batch.documents[1]["_id"], serde_json::json!(2));
    }

    #[test]
    fn test_default_collection_names() {
        assert_eq!(LoaderOptions::new(SchemaVersion::V1, 10, 1).collection, "movies");
        assert_eq!(LoaderOptions::new(SchemaVersion::V2, 10, 1).collection, "movies_optimized");
    }
}
