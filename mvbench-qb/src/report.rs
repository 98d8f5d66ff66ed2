//! Comparison report generation and formatting
//!
//! The JSON report is the durable output of a run; the CLI formatter renders
//! the same data as a table for the terminal.

use crate::runner::QueryOutcome;
use mvbench_common::timing::{
    round_docs, round_ms, round_percent, round_speedup, QuerySummary, RunTotals, TimingSummary,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use uuid::Uuid;

/// File name of the report inside the output folder
pub const REPORT_FILE_NAME: &str = "performance_comparison.json";

/// Complete benchmark run report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub run_id: Uuid,

    /// Run start (RFC 3339)
    pub timestamp: String,

    /// Samples per query and side
    pub iterations: u32,

    /// Per-query results keyed by `query_N`
    pub queries: BTreeMap<String, QueryReport>,

    pub totals: TotalsReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    Measured,
    /// At least one side had no successful sample
    Unmeasurable,
}

/// Report entry of one query pair
///
/// Unmeasurable sides carry `-1` for avg/min/max; improvement and speedup
/// are then `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryReport {
    pub name: String,
    pub description: String,
    pub status: QueryStatus,
    pub v1_avg_ms: f64,
    pub v1_min_ms: f64,
    pub v1_max_ms: f64,
    pub v1_failed_samples: usize,
    pub v2_avg_ms: f64,
    pub v2_min_ms: f64,
    pub v2_max_ms: f64,
    pub v2_failed_samples: usize,
    pub improvement_percent: Option<f64>,
    pub speedup_factor: Option<f64>,
    pub v1_avg_docs: Option<f64>,
    pub v2_avg_docs: Option<f64>,
    pub docs_improvement_percent: Option<f64>,
    pub v1_result_count: Option<usize>,
    pub v2_result_count: Option<usize>,
    pub results_match: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TotalsReport {
    pub measured_queries: usize,
    pub unmeasurable_queries: usize,
    pub total_v1_time_ms: f64,
    pub total_v2_time_ms: f64,
    /// `null` when no query was measured
    pub total_improvement_percent: Option<f64>,
    pub total_speedup: Option<f64>,
    pub total_v1_docs: f64,
    pub total_v2_docs: f64,
    pub total_docs_improvement_percent: Option<f64>,
}

impl QueryReport {
    fn from_outcome(outcome: &QueryOutcome) -> Self {
        let summary: &QuerySummary = &outcome.summary;
        let status = if summary.is_measurable() {
            QueryStatus::Measured
        } else {
            QueryStatus::Unmeasurable
        };

        Self {
            name: summary.name.clone(),
            description: outcome.description.clone(),
            status,
            v1_avg_ms: side_ms(&summary.v1, TimingSummary::avg_ms),
            v1_min_ms: side_ms(&summary.v1, TimingSummary::min_ms),
            v1_max_ms: side_ms(&summary.v1, TimingSummary::max_ms),
            v1_failed_samples: summary.v1.failed_samples(),
            v2_avg_ms: side_ms(&summary.v2, TimingSummary::avg_ms),
            v2_min_ms: side_ms(&summary.v2, TimingSummary::min_ms),
            v2_max_ms: side_ms(&summary.v2, TimingSummary::max_ms),
            v2_failed_samples: summary.v2.failed_samples(),
            improvement_percent: summary.comparison.map(|c| round_percent(c.improvement_percent)),
            speedup_factor: summary.comparison.map(|c| round_speedup(c.speedup_factor)),
            v1_avg_docs: summary.v1_avg_docs.map(round_docs),
            v2_avg_docs: summary.v2_avg_docs.map(round_docs),
            docs_improvement_percent: summary.docs_improvement_percent.map(round_percent),
            v1_result_count: summary.v1_result_count,
            v2_result_count: summary.v2_result_count,
            results_match: outcome.results_match,
        }
    }
}

/// Round measured values; the unmeasurable sentinel passes through as is
fn side_ms(summary: &TimingSummary, value: fn(&TimingSummary) -> f64) -> f64 {
    if summary.is_measurable() {
        round_ms(value(summary))
    } else {
        value(summary)
    }
}

impl TotalsReport {
    fn from_totals(totals: &RunTotals) -> Self {
        Self {
            measured_queries: totals.measured_queries,
            unmeasurable_queries: totals.unmeasurable_queries,
            total_v1_time_ms: round_ms(totals.total_v1_ms),
            total_v2_time_ms: round_ms(totals.total_v2_ms),
            total_improvement_percent: totals.comparison.map(|c| round_percent(c.improvement_percent)),
            total_speedup: totals.comparison.map(|c| round_speedup(c.speedup_factor)),
            total_v1_docs: round_docs(totals.total_v1_docs),
            total_v2_docs: round_docs(totals.total_v2_docs),
            total_docs_improvement_percent: totals.docs_improvement_percent.map(round_percent),
        }
    }
}

impl ComparisonReport {
    /// Build the report of a finished run
    pub fn new(iterations: u32, outcomes: &[QueryOutcome]) -> Self {
        let summaries: Vec<QuerySummary> = outcomes.iter().map(|o| o.summary.clone()).collect();
        let totals = RunTotals::from_summaries(&summaries);

        Self {
            run_id: Uuid::new_v4(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            iterations,
            queries: outcomes
                .iter()
                .map(|o| (o.key.clone(), QueryReport::from_outcome(o)))
                .collect(),
            totals: TotalsReport::from_totals(&totals),
        }
    }

    /// Export report to JSON file
    pub fn export_json<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }

    /// Import report from JSON file
    pub fn import_json<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let file = File::open(path)?;
        let report: ComparisonReport = serde_json::from_reader(file)?;
        Ok(report)
    }

    /// Improvement percentages of the measured queries
    fn measured_improvements(&self) -> Vec<f64> {
        self.queries
            .values()
            .filter_map(|q| q.improvement_percent)
            .collect()
    }
}

/// Aggregate statistics over the measured queries
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateStats {
    pub mean_improvement: f64,
    pub min_improvement: f64,
    pub max_improvement: f64,
    pub mean_speedup: f64,
}

impl AggregateStats {
    /// `None` when no query was measured
    pub fn from_report(report: &ComparisonReport) -> Option<Self> {
        let improvements = report.measured_improvements();
        if improvements.is_empty() {
            return None;
        }
        let speedups: Vec<f64> = report.queries.values().filter_map(|q| q.speedup_factor).collect();

        let mean = |values: &[f64]| values.iter().sum::<f64>() / values.len() as f64;
        Some(Self {
            mean_improvement: round_percent(mean(&improvements)),
            min_improvement: improvements.iter().copied().fold(f64::INFINITY, f64::min),
            max_improvement: improvements.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            mean_speedup: round_speedup(mean(&speedups)),
        })
    }
}

/// CLI formatter for benchmark results
pub struct CliFormatter;

impl CliFormatter {
    /// Per-query results table
    pub fn format_results_table(report: &ComparisonReport) -> String {
        let mut output = String::new();

        output.push_str("\nQuery Results:\n");
        output.push_str("┌──────────┬────────────┬────────────┬─────────────┬─────────┬───────┐\n");
        output.push_str("│ Query    │      V1 ms │      V2 ms │ Improvement │ Speedup │ Match │\n");
        output.push_str("├──────────┼────────────┼────────────┼─────────────┼─────────┼───────┤\n");

        for (key, query) in &report.queries {
            let (v1, v2) = match query.status {
                QueryStatus::Measured => (
                    format!("{:10.2}", query.v1_avg_ms),
                    format!("{:10.2}", query.v2_avg_ms),
                ),
                QueryStatus::Unmeasurable => (format!("{:>10}", "n/a"), format!("{:>10}", "n/a")),
            };
            let improvement = query
                .improvement_percent
                .map(|p| format!("{:10.1}%", p))
                .unwrap_or_else(|| format!("{:>11}", "-"));
            let speedup = query
                .speedup_factor
                .map(|s| format!("{:6.2}x", s))
                .unwrap_or_else(|| format!("{:>7}", "-"));
            let matched = match query.results_match {
                Some(true) => "yes",
                Some(false) => "NO",
                None => "-",
            };

            output.push_str(&format!(
                "│ {:<8} │ {} │ {} │ {} │ {} │ {:<5} │\n",
                key, v1, v2, improvement, speedup, matched
            ));
        }

        output.push_str("└──────────┴────────────┴────────────┴─────────────┴─────────┴───────┘\n");

        output
    }

    /// Totals and aggregate statistics
    pub fn format_summary(report: &ComparisonReport) -> String {
        let totals = &report.totals;
        let mut output = String::new();

        output.push_str("\nSummary:\n");
        output.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
        output.push_str(&format!(
            "Measured queries: {} ({} unmeasurable)\n",
            totals.measured_queries, totals.unmeasurable_queries
        ));
        output.push_str(&format!(
            "Total V1 time: {:.2} ms, total V2 time: {:.2} ms\n",
            totals.total_v1_time_ms, totals.total_v2_time_ms
        ));
        match (totals.total_improvement_percent, totals.total_speedup) {
            (Some(improvement), Some(speedup)) => output.push_str(&format!(
                "Total improvement: {:.1}% ({:.2}x)\n",
                improvement, speedup
            )),
            _ => output.push_str("Total improvement: n/a\n"),
        }
        if let Some(docs_improvement) = totals.total_docs_improvement_percent {
            output.push_str(&format!(
                "Documents examined: {} (V1) vs {} (V2), {:.1}% fewer\n",
                totals.total_v1_docs, totals.total_v2_docs, docs_improvement
            ));
        }

        match AggregateStats::from_report(report) {
            Some(stats) => {
                output.push_str(&format!(
                    "Improvement per query: mean {:.1}%, min {:.1}%, max {:.1}%\n",
                    stats.mean_improvement, stats.min_improvement, stats.max_improvement
                ));
                output.push_str(&format!("Mean speedup: {:.2}x\n", stats.mean_speedup));
            }
            None => output.push_str("No query could be measured\n"),
        }

        output.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mvbench_common::timing::{Comparison, TimingSummary};

    fn outcome(key: &str, v1_ms: f64, v2_ms: f64) -> QueryOutcome {
        let v1 = TimingSummary::Measured {
            avg_ms: v1_ms,
            min_ms: v1_ms,
            max_ms: v1_ms,
            succeeded: 3,
            failed: 0,
        };
        let v2 = TimingSummary::Measured {
            avg_ms: v2_ms,
            min_ms: v2_ms,
            max_ms: v2_ms,
            succeeded: 3,
            failed: 0,
        };
        QueryOutcome {
            key: key.to_string(),
            description: "test".to_string(),
            summary: QuerySummary {
                name: key.to_string(),
                v1,
                v2,
                comparison: Some(Comparison::from_averages(v1_ms, v2_ms)),
                v1_avg_docs: Some(1000.0),
                v2_avg_docs: Some(250.0),
                docs_improvement_percent: Some(75.0),
                v1_result_count: Some(5),
                v2_result_count: Some(5),
            },
            results_match: Some(true),
        }
    }

    fn unmeasurable(key: &str) -> QueryOutcome {
        let mut outcome = outcome(key, 10.0, 10.0);
        outcome.summary.v2 = TimingSummary::Unmeasurable { failed: 3 };
        outcome.summary.comparison = None;
        outcome.summary.v2_avg_docs = None;
        outcome.summary.docs_improvement_percent = None;
        outcome.summary.v2_result_count = None;
        outcome.results_match = None;
        outcome
    }

    #[test]
    fn test_create_report() {
        let report = ComparisonReport::new(3, &[outcome("query_1", 100.0, 40.0)]);

        assert_eq!(report.iterations, 3);
        assert!(!report.timestamp.is_empty());
        let query = &report.queries["query_1"];
        assert_eq!(query.status, QueryStatus::Measured);
        assert_eq!(query.improvement_percent, Some(60.0));
        assert_eq!(query.speedup_factor, Some(2.5));
    }

    #[test]
    fn test_unmeasurable_side_reports_sentinel() {
        let report = ComparisonReport::new(3, &[unmeasurable("query_2")]);

        let query = &report.queries["query_2"];
        assert_eq!(query.status, QueryStatus::Unmeasurable);
        assert_eq!(query.v2_avg_ms, -1.0);
        assert_eq!(query.v2_min_ms, -1.0);
        assert_eq!(query.v2_failed_samples, 3);
        assert_eq!(query.improvement_percent, None);
        assert_eq!(report.totals.measured_queries, 0);
        assert_eq!(report.totals.unmeasurable_queries, 1);
        assert_eq!(report.totals.total_improvement_percent, None);
        assert_eq!(report.totals.total_speedup, None);

        let json = serde_json::to_value(&report).unwrap();
        assert!(json["totals"]["total_improvement_percent"].is_null());
        assert!(json["totals"]["total_speedup"].is_null());
        assert!(json["totals"]["total_docs_improvement_percent"].is_null());
    }

    #[test]
    fn test_json_uses_report_key_names() {
        let report = ComparisonReport::new(3, &[outcome("query_1", 100.0, 40.0), unmeasurable("query_2")]);
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["queries"]["query_1"]["status"], "measured");
        assert_eq!(json["queries"]["query_2"]["status"], "unmeasurable");
        assert!(json["queries"]["query_2"]["speedup_factor"].is_null());
        assert_eq!(json["totals"]["total_v1_time_ms"], 100.0);
        assert_eq!(json["totals"]["total_speedup"], 2.5);
        assert_eq!(json["totals"]["total_docs_improvement_percent"], 75.0);
    }

    #[test]
    fn test_json_export_import() {
        let report = ComparisonReport::new(5, &[outcome("query_1", 12.3456, 6.789)]);
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(REPORT_FILE_NAME);

        report.export_json(&path).unwrap();
        let imported = ComparisonReport::import_json(&path).unwrap();

        assert_eq!(imported, report);
        assert_eq!(imported.queries["query_1"].v1_avg_ms, 12.35);
    }

    #[test]
    fn test_aggregate_stats() {
        let report = ComparisonReport::new(
            3,
            &[
                outcome("query_1", 100.0, 50.0),
                outcome("query_2", 100.0, 80.0),
                unmeasurable("query_3"),
            ],
        );

        let stats = AggregateStats::from_report(&report).unwrap();
        assert_eq!(stats.mean_improvement, 35.0);
        assert_eq!(stats.min_improvement, 20.0);
        assert_eq!(stats.max_improvement, 50.0);
        assert_eq!(stats.mean_speedup, 1.63);
    }

    #[test]
    fn test_format_results_table() {
        let report = ComparisonReport::new(3, &[outcome("query_1", 100.0, 40.0), unmeasurable("query_2")]);

        let formatted = CliFormatter::format_results_table(&report);
        assert!(formatted.contains("query_1"));
        assert!(formatted.contains("100.00"));
        assert!(formatted.contains("2.50x"));
        assert!(formatted.contains("n/a"));
    }

    #[test]
    fn test_format_summary_without_measured_queries() {
        let report = ComparisonReport::new(3, &[unmeasurable("query_1")]);

        let formatted = CliFormatter::format_summary(&report);
        assert!(formatted.contains("No query could be measured"));
        assert!(formatted.contains("Total improvement: n/a"));
    }
}
