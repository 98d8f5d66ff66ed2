//! V2 layout validation
//!
//! Checks that one stored document carries every precomputed field the V2
//! queries read (a `null` date part still counts as present), then reports how the derived categories are distributed
//! across the collection.

use crate::error::{BenchError, BenchResult};
use mvbench_common::db::DocumentStore;
use mvbench_common::models::SCHEMA_VERSION_V2;
use mvbench_common::query::value::lookup;
use mvbench_common::query::Pipeline;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};

/// Fields every V2 document must carry
pub const REQUIRED_V2_FIELDS: &[&str] = &[
    "schema_version",
    "release_info.decade",
    "release_info.year",
    "release_info.month",
    "financial.budget_category",
    "financial.profit",
    "financial.roi",
    "financial.is_profitable",
    "ratings.quality_tier",
    "content_info.genre_pairs",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldCheck {
    pub field: String,
    pub present: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub collection: String,
    pub sample_id: Value,
    pub schema_version_ok: bool,
    pub fields: Vec<FieldCheck>,
    pub document_count: u64,
    pub with_genre_pairs: u64,
    pub profitable: u64,
    /// `(category, count)` in descending count order
    pub budget_categories: Vec<(String, u64)>,
    pub quality_tiers: Vec<(String, u64)>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.schema_version_ok && self.fields.iter().all(|f| f.present)
    }

    pub fn missing_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| !f.present)
            .map(|f| f.field.as_str())
            .collect()
    }

    pub fn format(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("\nV2 validation of '{}'\n", self.collection));
        output.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
        output.push_str(&format!("Sample document: {}\n", self.sample_id));
        for check in &self.fields {
            let symbol = if check.present { "✓" } else { "✗" };
            output.push_str(&format!("[{}] {}\n", symbol, check.field));
        }
        if !self.schema_version_ok {
            output.push_str(&format!("[✗] schema_version is not {}\n", SCHEMA_VERSION_V2));
        }

        output.push_str(&format!("\nDocuments: {}\n", self.document_count));
        output.push_str(&format!("With genre pairs: {}\n", self.with_genre_pairs));
        output.push_str(&format!("Profitable: {}\n", self.profitable));

        output.push_str("\nBudget categories:\n");
        for (category, count) in &self.budget_categories {
            output.push_str(&format!("  {:<12} {}\n", category, count));
        }
        output.push_str("\nQuality tiers:\n");
        for (tier, count) in &self.quality_tiers {
            output.push_str(&format!("  {:<12} {}\n", tier, count));
        }

        output.push_str(&format!(
            "\nResult: {}\n",
            if self.is_valid() { "VALID" } else { "INVALID" }
        ));

        output
    }
}

/// Validate the V2 collection
pub async fn validate_v2<S>(store: &S, collection: &str) -> BenchResult<ValidationReport>
where
    S: DocumentStore + ?Sized,
{
    let sample = store
        .find_one(collection)
        .await?
        .ok_or_else(|| BenchError::Preflight(format!("collection '{}' is empty", collection)))?;

    let fields: Vec<FieldCheck> = REQUIRED_V2_FIELDS
        .iter()
        .map(|field| FieldCheck {
            field: field.to_string(),
            present: lookup(&sample, field).is_some(),
        })
        .collect();
    let schema_version_ok = sample["schema_version"].as_u64() == Some(u64::from(SCHEMA_VERSION_V2));

    for check in fields.iter().filter(|f| !f.present) {
        warn!(collection, field = %check.field, "Missing V2 field");
    }

    let report = ValidationReport {
        collection: collection.to_string(),
        sample_id: sample["_id"].clone(),
        schema_version_ok,
        fields,
        document_count: store.count(collection).await?,
        with_genre_pairs: count_matching(
            store,
            collection,
            json!({"content_info.genre_pairs": {"$exists": true, "$ne": []}}),
        )
        .await?,
        profitable: count_matching(store, collection, json!({"financial.is_profitable": true})).await?,
        budget_categories: distribution(store, collection, "financial.budget_category").await?,
        quality_tiers: distribution(store, collection, "ratings.quality_tier").await?,
    };

    info!(
        collection,
        valid = report.is_valid(),
        documents = report.document_count,
        "V2 validation finished"
    );

    Ok(report)
}

async fn count_matching<S>(store: &S, collection: &str, filter: Value) -> BenchResult<u64>
where
    S: DocumentStore + ?Sized,
{
    let pipeline = Pipeline::from_value(&json!([
        {"$match": filter},
        {"$group": {"_id": null, "n": {"$sum": 1}}}
    ]))?;
    let output = store.aggregate(collection, &pipeline).await?;
    Ok(output
        .documents
        .first()
        .and_then(|d| d["n"].as_u64())
        .unwrap_or(0))
}

async fn distribution<S>(store: &S, collection: &str, path: &str) -> BenchResult<Vec<(String, u64)>>
where
    S: DocumentStore + ?Sized,
{
    let pipeline = Pipeline::from_value(&json!([
        {"$group": {"_id": format!("${}", path), "count": {"$sum": 1}}},
        {"$sort": {"count": -1, "_id": 1}}
    ]))?;
    let output = store.aggregate(collection, &pipeline).await?;

    Ok(output
        .documents
        .iter()
        .map(|row| {
            let label = match &row["_id"] {
                Value::String(s) => s.clone(),
                Value::Null => "(missing)".to_string(),
                other => other.to_string(),
            };
            (label, row["count"].as_u64().unwrap_or(0))
        })
        .collect())
}
