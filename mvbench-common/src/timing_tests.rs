//! Unit tests for timing statistics
//!
//! Covers sequential measurement with failures and timeouts, summaries over
//! succeeded samples only, guarded comparison arithmetic, and run totals.

use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct FakeOutput {
    docs: Option<u64>,
    rows: usize,
}

impl SampleOutput for FakeOutput {
    fn docs_examined(&self) -> Option<u64> {
        self.docs
    }

    fn result_count(&self) -> usize {
        self.rows
    }
}

fn ok(elapsed_ms: f64) -> TimingSample {
    TimingSample::Succeeded {
        elapsed_ms,
        docs_examined: None,
        result_count: 0,
    }
}

fn ok_with_docs(elapsed_ms: f64, docs: u64) -> TimingSample {
    TimingSample::Succeeded {
        elapsed_ms,
        docs_examined: Some(docs),
        result_count: 1,
    }
}

fn failed() -> TimingSample {
    TimingSample::Failed {
        reason: "boom".to_string(),
    }
}

// ============================================================================
// Test Group 1: Measurement
// ============================================================================

#[tokio::test]
async fn test_measure_runs_exactly_n_times() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let batch = measure(5, Duration::from_secs(5), || {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(FakeOutput { docs: Some(10), rows: 3 })
        }
    })
    .await;

    assert_eq!(calls.load(Ordering::SeqCst), 5);
    assert_eq!(batch.samples.len(), 5);
    assert!(batch.samples.iter().all(TimingSample::is_success));
    assert_eq!(batch.last_output.map(|o| o.rows), Some(3));
}

#[tokio::test]
async fn test_measure_failure_does_not_abort_batch() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let batch = measure(4, Duration::from_secs(5), || {
        let counter = counter.clone();
        async move {
            let call = counter.fetch_add(1, Ordering::SeqCst);
            if call == 1 {
                Err(MeasurementError::Failed("connection reset".to_string()))
            } else {
                Ok(FakeOutput { docs: None, rows: 0 })
            }
        }
    })
    .await;

    assert_eq!(batch.samples.len(), 4);
    assert!(!batch.samples[1].is_success());
    assert_eq!(batch.samples.iter().filter(|s| s.is_success()).count(), 3);
}

#[tokio::test]
async fn test_measure_is_sequential() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let (in_flight_ref, peak_ref) = (in_flight.clone(), peak.clone());

    measure(4, Duration::from_secs(5), || {
        let in_flight = in_flight_ref.clone();
        let peak = peak_ref.clone();
        async move {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(FakeOutput { docs: None, rows: 0 })
        }
    })
    .await;

    assert_eq!(peak.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_measure_timeout_is_failed_sample() {
    let batch = measure(2, Duration::from_millis(20), || async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok(FakeOutput { docs: None, rows: 0 })
    })
    .await;

    assert_eq!(batch.samples.len(), 2);
    assert!(batch.samples.iter().all(|s| !s.is_success()));
    assert!(batch.last_output.is_none());
    match &batch.samples[0] {
        TimingSample::Failed { reason } => assert!(reason.contains("timed out")),
        other => panic!("expected failed sample, got {:?}", other),
    }
}

#[tokio::test]
async fn test_timed_out_blocking_work_never_overlaps_next_sample() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let (in_flight_ref, peak_ref) = (in_flight.clone(), peak.clone());

    let batch = measure(3, Duration::from_millis(20), || {
        let in_flight = in_flight_ref.clone();
        let peak = peak_ref.clone();
        async move {
            tokio::task::spawn_blocking(move || {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(150));
                in_flight.fetch_sub(1, Ordering::SeqCst);
            })
            .await
            .map_err(|e| MeasurementError::Failed(e.to_string()))?;
            Ok::<_, MeasurementError>(FakeOutput { docs: None, rows: 0 })
        }
    })
    .await;

    assert_eq!(batch.samples.len(), 3);
    assert!(batch.samples.iter().all(|s| !s.is_success()));
    assert_eq!(peak.load(Ordering::SeqCst), 1);
    assert_eq!(in_flight.load(Ordering::SeqCst), 0);
}

// ============================================================================
// Test Group 2: Summaries
// ============================================================================

#[test]
fn test_summarize_ignores_failed_samples() {
    let summary = summarize(&[ok(10.0), failed(), ok(30.0), ok(20.0)]);

    assert_eq!(
        summary,
        TimingSummary::Measured {
            avg_ms: 20.0,
            min_ms: 10.0,
            max_ms: 30.0,
            succeeded: 3,
            failed: 1,
        }
    );
}

#[test]
fn test_summarize_empty_is_unmeasurable() {
    let summary = summarize(&[]);

    assert!(!summary.is_measurable());
    assert_eq!(summary.avg_ms(), UNMEASURABLE_SENTINEL_MS);
    assert_eq!(summary.min_ms(), UNMEASURABLE_SENTINEL_MS);
    assert_eq!(summary.max_ms(), UNMEASURABLE_SENTINEL_MS);
}

#[test]
fn test_summarize_all_failed_is_unmeasurable() {
    let summary = summarize(&[failed(), failed(), failed()]);
    assert_eq!(summary, TimingSummary::Unmeasurable { failed: 3 });
    assert_eq!(summary.failed_samples(), 3);
}

#[test]
fn test_average_docs_examined() {
    assert_eq!(average_docs_examined(&[ok(1.0), failed()]), None);
    assert_eq!(
        average_docs_examined(&[ok_with_docs(1.0, 100), ok_with_docs(1.0, 300)]),
        Some(200.0)
    );
}

// ============================================================================
// Test Group 3: Comparison
// ============================================================================

#[test]
fn test_comparison_arithmetic() {
    let comparison = Comparison::from_averages(100.0, 25.0);
    assert_eq!(comparison.improvement_percent, 75.0);
    assert_eq!(comparison.speedup_factor, 4.0);

    let slower = Comparison::from_averages(10.0, 20.0);
    assert_eq!(slower.improvement_percent, -100.0);
    assert_eq!(slower.speedup_factor, 0.5);
}

#[test]
fn test_comparison_zero_guards() {
    let zero_v1 = Comparison::from_averages(0.0, 5.0);
    assert_eq!(zero_v1.improvement_percent, 0.0);
    assert_eq!(zero_v1.speedup_factor, 0.0);

    let zero_v2 = Comparison::from_averages(5.0, 0.0);
    assert_eq!(zero_v2.improvement_percent, 100.0);
    assert_eq!(zero_v2.speedup_factor, 0.0);

    assert!(zero_v1.improvement_percent.is_finite());
}

#[test]
fn test_compare_unmeasurable_side_has_no_comparison() {
    let measured = summarize(&[ok(10.0)]);
    let unmeasurable = summarize(&[failed()]);

    assert!(compare(&measured, &unmeasurable).is_none());
    assert!(compare(&unmeasurable, &measured).is_none());
    assert!(compare(&measured, &measured).is_some());
}

// ============================================================================
// Test Group 4: Lifecycle and totals
// ============================================================================

#[test]
fn test_query_measurement_finalize() {
    let mut measurement = QueryMeasurement::new("query_1");
    measurement.record_v1(vec![ok_with_docs(40.0, 1000), ok_with_docs(60.0, 1000)]);
    measurement.record_v2(vec![ok_with_docs(10.0, 250), failed()]);

    let summary = measurement.finalize();

    assert_eq!(summary.name, "query_1");
    assert_eq!(summary.v1.avg_ms(), 50.0);
    assert_eq!(summary.v2.avg_ms(), 10.0);
    assert_eq!(summary.v2.failed_samples(), 1);
    let comparison = summary.comparison.unwrap();
    assert_eq!(comparison.improvement_percent, 80.0);
    assert_eq!(comparison.speedup_factor, 5.0);
    assert_eq!(summary.docs_improvement_percent, Some(75.0));
    assert_eq!(summary.v1_result_count, Some(1));
}

#[test]
fn test_totals_sum_measured_queries_only() {
    let mut q1 = QueryMeasurement::new("query_1");
    q1.record_v1(vec![ok(100.0)]);
    q1.record_v2(vec![ok(50.0)]);

    let mut q2 = QueryMeasurement::new("query_2");
    q2.record_v1(vec![ok(20.0), ok(40.0)]);
    q2.record_v2(vec![ok(10.0)]);

    let mut q3 = QueryMeasurement::new("query_3");
    q3.record_v1(vec![ok(500.0)]);
    q3.record_v2(vec![failed()]);

    let totals = RunTotals::from_summaries(&[q1.finalize(), q2.finalize(), q3.finalize()]);

    assert_eq!(totals.measured_queries, 2);
    assert_eq!(totals.unmeasurable_queries, 1);
    assert_eq!(totals.total_v1_ms, 130.0);
    assert_eq!(totals.total_v2_ms, 60.0);
    let comparison = totals.comparison.unwrap();
    assert_eq!(round_speedup(comparison.speedup_factor), 2.17);
    assert_eq!(round_percent(comparison.improvement_percent), 53.8);
    assert_eq!(totals.docs_improvement_percent, None);
}

#[test]
fn test_totals_without_measured_queries_have_no_comparison() {
    let mut q1 = QueryMeasurement::new("query_1");
    q1.record_v1(vec![failed(), failed()]);
    q1.record_v2(vec![ok(5.0)]);

    let mut q2 = QueryMeasurement::new("query_2");
    q2.record_v1(vec![failed()]);
    q2.record_v2(vec![failed()]);

    let totals = RunTotals::from_summaries(&[q1.finalize(), q2.finalize()]);

    assert_eq!(totals.measured_queries, 0);
    assert_eq!(totals.unmeasurable_queries, 2);
    assert_eq!(totals.total_v1_ms, 0.0);
    assert!(totals.comparison.is_none());
    assert!(totals.docs_improvement_percent.is_none());
}

#[test]
fn test_rounding_helpers() {
    assert_eq!(round_ms(12.3456), 12.35);
    assert_eq!(round_percent(53.846), 53.8);
    assert_eq!(round_speedup(2.1666), 2.17);
    assert_eq!(round_docs(249.6), 250.0);
}
