//! Timing statistics for repeated query executions
//!
//! **Purpose:** Run one query variant `n` times, record each execution as a
//! [`TimingSample`], reduce the samples to a [`TimingSummary`], and compare
//! the V1 and V2 summaries of the same logical query.
//!
//! # Lifecycle
//!
//! ```text
//! QueryMeasurement::new(name)      (empty, one per query per run)
//!     ↓ record_v1(samples) / record_v2(samples)
//! QueryMeasurement::finalize()     (consumes the measurement)
//!     ↓
//! QuerySummary                     (immutable, serialized by the report)
//! ```
//!
//! # Failed samples
//!
//! A failed or timed-out execution is recorded without an elapsed time and is
//! excluded from every statistic; it is never counted as zero. When no sample
//! of a side succeeded the side is [`TimingSummary::Unmeasurable`] and the
//! query has no [`Comparison`].
//!
//! # Totals
//!
//! Cross-query totals are plain sums of per-query averages over measured
//! queries, not sample-weighted means.

use crate::derived::round_to;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::pin;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

/// Value reported for avg/min/max of an unmeasurable side
pub const UNMEASURABLE_SENTINEL_MS: f64 = -1.0;

// ============================================================================
// Samples
// ============================================================================

/// Why one execution produced no timing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeasurementError {
    /// The operation returned an error
    #[error("execution failed: {0}")]
    Failed(String),

    /// The operation did not finish within the per-sample timeout
    #[error("execution timed out after {0:?}")]
    TimedOut(Duration),
}

/// Secondary cost figures reported by a successful execution
pub trait SampleOutput {
    /// Documents the store had to scan, when it reports it
    fn docs_examined(&self) -> Option<u64>;

    /// Number of result rows
    fn result_count(&self) -> usize;
}

/// One execution of one query variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TimingSample {
    Succeeded {
        elapsed_ms: f64,
        docs_examined: Option<u64>,
        result_count: usize,
    },
    Failed {
        reason: String,
    },
}

impl TimingSample {
    pub fn is_success(&self) -> bool {
        matches!(self, TimingSample::Succeeded { .. })
    }

    pub fn elapsed_ms(&self) -> Option<f64> {
        match self {
            TimingSample::Succeeded { elapsed_ms, .. } => Some(*elapsed_ms),
            TimingSample::Failed { .. } => None,
        }
    }

    pub fn docs_examined(&self) -> Option<u64> {
        match self {
            TimingSample::Succeeded { docs_examined, .. } => *docs_examined,
            TimingSample::Failed { .. } => None,
        }
    }
}

/// Samples of one variant plus the output of its last successful execution
#[derive(Debug)]
pub struct MeasuredBatch<T> {
    pub samples: Vec<TimingSample>,
    pub last_output: Option<T>,
}

/// Execute `operation` exactly `iterations` times, one after another
///
/// Each execution is bounded by `sample_timeout`. An error or timeout becomes
/// a failed sample and the loop continues with the next execution. A timed-out
/// execution is still driven to completion, untimed, before the next one
/// starts, so work handed off to a blocking thread never overlaps a later
/// sample.
pub async fn measure<F, Fut, T>(
    iterations: u32,
    sample_timeout: Duration,
    mut operation: F,
) -> MeasuredBatch<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, MeasurementError>>,
    T: SampleOutput,
{
    let mut samples = Vec::with_capacity(iterations as usize);
    let mut last_output = None;

    for iteration in 0..iterations {
        let start = Instant::now();
        let mut execution = pin!(operation());
        let timed = tokio::time::timeout(sample_timeout, &mut execution).await;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        let outcome = match timed {
            Ok(result) => result,
            Err(_) => {
                let drain_start = Instant::now();
                // Result of a timed-out execution is discarded
                let _ = execution.await;
                debug!(
                    iteration,
                    drain_ms = drain_start.elapsed().as_secs_f64() * 1000.0,
                    "Timed-out sample drained"
                );
                Err(MeasurementError::TimedOut(sample_timeout))
            }
        };

        match outcome {
            Ok(output) => {
                debug!(iteration, elapsed_ms, "Sample succeeded");
                samples.push(TimingSample::Succeeded {
                    elapsed_ms,
                    docs_examined: output.docs_examined(),
                    result_count: output.result_count(),
                });
                last_output = Some(output);
            }
            Err(e) => {
                warn!(iteration, error = %e, "Sample failed");
                samples.push(TimingSample::Failed {
                    reason: e.to_string(),
                });
            }
        }
    }

    MeasuredBatch {
        samples,
        last_output,
    }
}

// ============================================================================
// Summaries
// ============================================================================

/// avg/min/max over the succeeded samples of one side
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TimingSummary {
    Measured {
        avg_ms: f64,
        min_ms: f64,
        max_ms: f64,
        succeeded: usize,
        failed: usize,
    },
    /// Every sample failed (or there were none)
    Unmeasurable { failed: usize },
}

impl TimingSummary {
    pub fn is_measurable(&self) -> bool {
        matches!(self, TimingSummary::Measured { .. })
    }

    /// Average, or the sentinel when unmeasurable
    pub fn avg_ms(&self) -> f64 {
        match self {
            TimingSummary::Measured { avg_ms, .. } => *avg_ms,
            TimingSummary::Unmeasurable { .. } => UNMEASURABLE_SENTINEL_MS,
        }
    }

    pub fn min_ms(&self) -> f64 {
        match self {
            TimingSummary::Measured { min_ms, .. } => *min_ms,
            TimingSummary::Unmeasurable { .. } => UNMEASURABLE_SENTINEL_MS,
        }
    }

    pub fn max_ms(&self) -> f64 {
        match self {
            TimingSummary::Measured { max_ms, .. } => *max_ms,
            TimingSummary::Unmeasurable { .. } => UNMEASURABLE_SENTINEL_MS,
        }
    }

    pub fn failed_samples(&self) -> usize {
        match self {
            TimingSummary::Measured { failed, .. } | TimingSummary::Unmeasurable { failed } => {
                *failed
            }
        }
    }
}

/// Reduce samples to a summary, ignoring failed samples
pub fn summarize(samples: &[TimingSample]) -> TimingSummary {
    let elapsed: Vec<f64> = samples.iter().filter_map(TimingSample::elapsed_ms).collect();
    let failed = samples.len() - elapsed.len();

    if elapsed.is_empty() {
        return TimingSummary::Unmeasurable { failed };
    }

    let sum: f64 = elapsed.iter().sum();
    let min_ms = elapsed.iter().copied().fold(f64::INFINITY, f64::min);
    let max_ms = elapsed.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    TimingSummary::Measured {
        avg_ms: sum / elapsed.len() as f64,
        min_ms,
        max_ms,
        succeeded: elapsed.len(),
        failed,
    }
}

/// Mean `docs_examined` over succeeded samples that reported it
pub fn average_docs_examined(samples: &[TimingSample]) -> Option<f64> {
    let docs: Vec<u64> = samples.iter().filter_map(TimingSample::docs_examined).collect();
    if docs.is_empty() {
        None
    } else {
        Some(docs.iter().sum::<u64>() as f64 / docs.len() as f64)
    }
}

// ============================================================================
// Comparison
// ============================================================================

/// `(v1 - v2) / v1 * 100`, or 0 when `v1` is not positive
pub fn improvement_percent(v1: f64, v2: f64) -> f64 {
    if v1 > 0.0 {
        (v1 - v2) / v1 * 100.0
    } else {
        0.0
    }
}

/// `v1 / v2`, or 0 ("incomparable") when `v2` is not positive
pub fn speedup_factor(v1: f64, v2: f64) -> f64 {
    if v2 > 0.0 {
        v1 / v2
    } else {
        0.0
    }
}

/// V2 relative to V1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub improvement_percent: f64,
    pub speedup_factor: f64,
}

impl Comparison {
    pub fn from_averages(v1_avg_ms: f64, v2_avg_ms: f64) -> Self {
        Self {
            improvement_percent: improvement_percent(v1_avg_ms, v2_avg_ms),
            speedup_factor: speedup_factor(v1_avg_ms, v2_avg_ms),
        }
    }
}

/// Compare two summaries; `None` when either side is unmeasurable
pub fn compare(v1: &TimingSummary, v2: &TimingSummary) -> Option<Comparison> {
    match (v1, v2) {
        (
            TimingSummary::Measured { avg_ms: v1_avg, .. },
            TimingSummary::Measured { avg_ms: v2_avg, .. },
        ) => Some(Comparison::from_averages(*v1_avg, *v2_avg)),
        _ => None,
    }
}

// ============================================================================
// Per-query lifecycle
// ============================================================================

/// Samples collected for one logical query during a run
#[derive(Debug, Clone, Default)]
pub struct QueryMeasurement {
    name: String,
    v1_samples: Vec<TimingSample>,
    v2_samples: Vec<TimingSample>,
}

impl QueryMeasurement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn record_v1(&mut self, samples: impl IntoIterator<Item = TimingSample>) {
        self.v1_samples.extend(samples);
    }

    pub fn record_v2(&mut self, samples: impl IntoIterator<Item = TimingSample>) {
        self.v2_samples.extend(samples);
    }

    /// Reduce the collected samples into an immutable summary
    pub fn finalize(self) -> QuerySummary {
        let v1 = summarize(&self.v1_samples);
        let v2 = summarize(&self.v2_samples);
        let comparison = compare(&v1, &v2);

        let v1_avg_docs = average_docs_examined(&self.v1_samples);
        let v2_avg_docs = average_docs_examined(&self.v2_samples);
        let docs_improvement_percent = match (v1_avg_docs, v2_avg_docs) {
            (Some(v1_docs), Some(v2_docs)) => Some(improvement_percent(v1_docs, v2_docs)),
            _ => None,
        };

        QuerySummary {
            name: self.name,
            v1,
            v2,
            comparison,
            v1_avg_docs,
            v2_avg_docs,
            docs_improvement_percent,
            v1_result_count: last_result_count(&self.v1_samples),
            v2_result_count: last_result_count(&self.v2_samples),
        }
    }
}

fn last_result_count(samples: &[TimingSample]) -> Option<usize> {
    samples.iter().rev().find_map(|sample| match sample {
        TimingSample::Succeeded { result_count, .. } => Some(*result_count),
        TimingSample::Failed { .. } => None,
    })
}

/// Finalized statistics for one logical query
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySummary {
    pub name: String,
    pub v1: TimingSummary,
    pub v2: TimingSummary,
    /// `None` when either side is unmeasurable
    pub comparison: Option<Comparison>,
    pub v1_avg_docs: Option<f64>,
    pub v2_avg_docs: Option<f64>,
    pub docs_improvement_percent: Option<f64>,
    pub v1_result_count: Option<usize>,
    pub v2_result_count: Option<usize>,
}

impl QuerySummary {
    pub fn is_measurable(&self) -> bool {
        self.comparison.is_some()
    }
}

// ============================================================================
// Totals
// ============================================================================

/// Sums over the measured queries of a run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunTotals {
    pub measured_queries: usize,
    pub unmeasurable_queries: usize,
    pub total_v1_ms: f64,
    pub total_v2_ms: f64,
    /// `None` when no query was measured
    pub comparison: Option<Comparison>,
    pub total_v1_docs: f64,
    pub total_v2_docs: f64,
    pub docs_improvement_percent: Option<f64>,
}

impl RunTotals {
    pub fn from_summaries(summaries: &[QuerySummary]) -> Self {
        let measured: Vec<&QuerySummary> = summaries.iter().filter(|s| s.is_measurable()).collect();

        let total_v1_ms: f64 = measured.iter().map(|s| s.v1.avg_ms()).sum();
        let total_v2_ms: f64 = measured.iter().map(|s| s.v2.avg_ms()).sum();
        let total_v1_docs: f64 = measured.iter().filter_map(|s| s.v1_avg_docs).sum();
        let total_v2_docs: f64 = measured.iter().filter_map(|s| s.v2_avg_docs).sum();

        let any_measured = !measured.is_empty();
        let any_docs = measured
            .iter()
            .any(|s| s.v1_avg_docs.is_some() && s.v2_avg_docs.is_some());

        Self {
            measured_queries: measured.len(),
            unmeasurable_queries: summaries.len() - measured.len(),
            total_v1_ms,
            total_v2_ms,
            comparison: any_measured.then(|| Comparison::from_averages(total_v1_ms, total_v2_ms)),
            total_v1_docs,
            total_v2_docs,
            docs_improvement_percent: any_docs
                .then(|| improvement_percent(total_v1_docs, total_v2_docs)),
        }
    }
}

// ============================================================================
// Report rounding
// ============================================================================

/// Milliseconds are reported with two decimals
pub fn round_ms(value: f64) -> f64 {
    round_to(value, 2)
}

/// Percentages are reported with one decimal
pub fn round_percent(value: f64) -> f64 {
    round_to(value, 1)
}

/// Speedup factors are reported with two decimals
pub fn round_speedup(value: f64) -> f64 {
    round_to(value, 2)
}

/// Document counts are reported as whole numbers
pub fn round_docs(value: f64) -> f64 {
    value.round()
}

#[cfg(test)]
#[path = "timing_tests.rs"]
mod tests;
