//! Post-load verification of a collection

use crate::error::LoadResult;
use mvbench_common::db::DocumentStore;
use mvbench_common::query::value::lookup;
use mvbench_common::query::Pipeline;
use mvbench_common::SchemaVersion;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

/// Key fields of one stored document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleDocument {
    pub id: Value,
    pub title: Value,
    pub year: Value,
    pub budget: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationReport {
    pub collection: String,
    pub total: u64,
    /// Documents with a non-empty IMDB id
    pub with_imdb: u64,
    pub min_year: Option<i64>,
    pub max_year: Option<i64>,
    pub sample: Option<SampleDocument>,
}

impl VerificationReport {
    pub fn log(&self) {
        info!(
            collection = %self.collection,
            total = self.total,
            with_imdb = self.with_imdb,
            min_year = ?self.min_year,
            max_year = ?self.max_year,
            "Verification"
        );
        if let Some(sample) = &self.sample {
            info!(
                id = %sample.id,
                title = %sample.title,
                year = %sample.year,
                budget = %sample.budget,
                "Sample document"
            );
        }
    }
}

pub async fn verify_collection<S>(
    store: &S,
    collection: &str,
    schema: SchemaVersion,
) -> LoadResult<VerificationReport>
where
    S: DocumentStore + ?Sized,
{
    let total = store.count(collection).await?;

    let imdb = Pipeline::from_value(&json!([
        {"$match": {"media.imdb_id": {"$exists": true, "$ne": ""}}},
        {"$group": {"_id": null, "n": {"$sum": 1}}}
    ]))?;
    let with_imdb = store
        .aggregate(collection, &imdb)
        .await?
        .documents
        .first()
        .and_then(|d| d["n"].as_u64())
        .unwrap_or(0);

    let year_field = format!("${}", schema.year_path());
    let years = Pipeline::from_value(&json!([
        {"$match": {schema.year_path(): {"$exists": true, "$ne": null}}},
        {"$group": {"_id": null, "min_year": {"$min": year_field}, "max_year": {"$max": year_field}}}
    ]))?;
    let range = store.aggregate(collection, &years).await?.documents;
    let (min_year, max_year) = match range.first() {
        Some(row) => (row["min_year"].as_i64(), row["max_year"].as_i64()),
        None => (None, None),
    };

    let sample = store.find_one(collection).await?.map(|doc| SampleDocument {
        id: doc["_id"].clone(),
        title: doc["title"].clone(),
        year: lookup(&doc, schema.year_path())
            .cloned()
            .unwrap_or(Value::Null),
        budget: doc["financial"]["budget"].clone(),
    });

    Ok(VerificationReport {
        collection: collection.to_string(),
        total,
        with_imdb,
        min_year,
        max_year,
        sample,
    })
}
