//! Benchmark runner
//!
//! Queries run strictly one after another: V1 `iterations` times, then V2,
//! then the next query. Nothing else touches the store during a run, so
//! each sample measures one query alone.

use crate::catalog::QueryPair;
use crate::error::{BenchError, BenchResult};
use mvbench_common::db::{AggregateOutput, DocumentStore};
use mvbench_common::query::value::values_equal;
use mvbench_common::query::Pipeline;
use mvbench_common::timing::{measure, MeasuredBatch, MeasurementError, QueryMeasurement, QuerySummary};
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub iterations: u32,
    pub sample_timeout: Duration,
    pub v1_collection: String,
    pub v2_collection: String,
}

/// Outcome of one query pair
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    pub key: String,
    pub description: String,
    pub summary: QuerySummary,
    /// `None` when either side never succeeded
    pub results_match: Option<bool>,
}

/// Document counts of both collections, checked before any measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionSizes {
    pub v1: u64,
    pub v2: u64,
}

/// Both collections must exist and hold documents
pub async fn preflight<S>(store: &S, options: &RunOptions) -> BenchResult<CollectionSizes>
where
    S: DocumentStore + ?Sized,
{
    let existing = store.list_collections().await?;

    let mut sizes = [0u64; 2];
    for (slot, name) in sizes
        .iter_mut()
        .zip([&options.v1_collection, &options.v2_collection])
    {
        if !existing.iter().any(|c| c == name) {
            return Err(BenchError::Preflight(format!(
                "collection '{}' does not exist; load it with mvbench-ld first",
                name
            )));
        }
        *slot = store.count(name).await?;
        if *slot == 0 {
            return Err(BenchError::Preflight(format!("collection '{}' is empty", name)));
        }
    }

    info!(
        v1_collection = %options.v1_collection,
        v1_documents = sizes[0],
        v2_collection = %options.v2_collection,
        v2_documents = sizes[1],
        "Preflight passed"
    );

    Ok(CollectionSizes {
        v1: sizes[0],
        v2: sizes[1],
    })
}

/// Measure every query pair in order
pub async fn run_benchmark<S>(
    store: &S,
    queries: &[QueryPair],
    options: &RunOptions,
) -> BenchResult<Vec<QueryOutcome>>
where
    S: DocumentStore + ?Sized,
{
    let mut outcomes = Vec::with_capacity(queries.len());

    for query in queries {
        let (v1_pipeline, v2_pipeline) = query.pipelines()?;
        info!(query = query.key, name = query.name, "Measuring query");

        let v1 = measure_side(store, &options.v1_collection, &v1_pipeline, options).await;
        let v2 = measure_side(store, &options.v2_collection, &v2_pipeline, options).await;

        let results_match = match (&v1.last_output, &v2.last_output) {
            (Some(a), Some(b)) => {
                let matched = results_match(&a.documents, &b.documents);
                if !matched {
                    warn!(
                        query = query.key,
                        v1_rows = a.documents.len(),
                        v2_rows = b.documents.len(),
                        "V1 and V2 results differ"
                    );
                }
                Some(matched)
            }
            _ => None,
        };

        let mut measurement = QueryMeasurement::new(query.name);
        measurement.record_v1(v1.samples);
        measurement.record_v2(v2.samples);
        let summary = measurement.finalize();

        match &summary.comparison {
            Some(comparison) => info!(
                query = query.key,
                v1_avg_ms = summary.v1.avg_ms(),
                v2_avg_ms = summary.v2.avg_ms(),
                improvement_percent = comparison.improvement_percent,
                speedup = comparison.speedup_factor,
                "Query measured"
            ),
            None => warn!(
                query = query.key,
                v1_failed = summary.v1.failed_samples(),
                v2_failed = summary.v2.failed_samples(),
                "Query unmeasurable"
            ),
        }

        outcomes.push(QueryOutcome {
            key: query.key.to_string(),
            description: query.description.to_string(),
            summary,
            results_match,
        });
    }

    Ok(outcomes)
}

async fn measure_side<S>(
    store: &S,
    collection: &str,
    pipeline: &Pipeline,
    options: &RunOptions,
) -> MeasuredBatch<AggregateOutput>
where
    S: DocumentStore + ?Sized,
{
    measure(options.iterations, options.sample_timeout, move || async move {
        store
            .aggregate(collection, pipeline)
            .await
            .map_err(|e| MeasurementError::Failed(e.to_string()))
    })
    .await
}

/// Whether two result sets list the same `_id`s in the same order
pub fn results_match(v1: &[Value], v2: &[Value]) -> bool {
    v1.len() == v2.len()
        && v1.iter().zip(v2).all(|(a, b)| {
            let a_id = a.get("_id").unwrap_or(&Value::Null);
            let b_id = b.get("_id").unwrap_or(&Value::Null);
            values_equal(a_id, b_id)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_results_match_compares_ids_in_order() {
        let a = vec![json!({"_id": "Drama", "avg": 1.5}), json!({"_id": 1990})];
        let b = vec![json!({"_id": "Drama", "avg": 9.0}), json!({"_id": 1990.0})];
        assert!(results_match(&a, &b));

        let reversed: Vec<_> = b.iter().rev().cloned().collect();
        assert!(!results_match(&a, &reversed));
        assert!(!results_match(&a, &b[..1]));
    }

    #[test]
    fn test_results_match_empty() {
        assert!(results_match(&[], &[]));
    }
}
