//! Document store
//!
//! Components receive an explicit store handle; nothing holds a global
//! connection. [`SqliteDocumentStore`] keeps each document as a JSON body in
//! the `documents` table and evaluates aggregation pipelines in-process.

use crate::query::Pipeline;
use crate::timing::SampleOutput;
use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::{debug, warn};

/// Outcome of an unordered bulk insert
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertOutcome {
    pub inserted: u64,
    /// Documents rejected because their `_id` already exists
    pub duplicates: u64,
    /// Documents rejected for any other reason
    pub other_errors: u64,
}

impl InsertOutcome {
    pub fn absorb(&mut self, other: InsertOutcome) {
        self.inserted += other.inserted;
        self.duplicates += other.duplicates;
        self.other_errors += other.other_errors;
    }
}

/// Result rows of an aggregation plus its scan cost
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateOutput {
    pub documents: Vec<Value>,
    /// Documents read from the collection before the first stage
    pub docs_examined: u64,
}

impl SampleOutput for AggregateOutput {
    fn docs_examined(&self) -> Option<u64> {
        Some(self.docs_examined)
    }

    fn result_count(&self) -> usize {
        self.documents.len()
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Names of collections holding at least one document
    async fn list_collections(&self) -> Result<Vec<String>>;

    /// Remove every document of a collection; no-op when absent
    async fn drop_collection(&self, collection: &str) -> Result<()>;

    /// Insert each document independently; a rejected document never stops
    /// the rest of the batch
    async fn insert_many_unordered(&self, collection: &str, docs: Vec<Value>) -> Result<InsertOutcome>;

    async fn count(&self, collection: &str) -> Result<u64>;

    /// First document in insertion order
    async fn find_one(&self, collection: &str) -> Result<Option<Value>>;

    async fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> Result<AggregateOutput>;
}

/// SQLite-backed document store
#[derive(Debug, Clone)]
pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn load_collection(&self, collection: &str) -> Result<Vec<Value>> {
        let bodies: Vec<String> =
            sqlx::query_scalar("SELECT body FROM documents WHERE collection = ? ORDER BY rowid")
                .bind(collection)
                .fetch_all(&self.pool)
                .await?;

        bodies
            .iter()
            .map(|body| serde_json::from_str(body).map_err(Error::from))
            .collect()
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn list_collections(&self) -> Result<Vec<String>> {
        let names: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT collection FROM documents ORDER BY collection")
                .fetch_all(&self.pool)
                .await?;
        Ok(names)
    }

    async fn drop_collection(&self, collection: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = ?")
            .bind(collection)
            .execute(&self.pool)
            .await?;
        debug!(collection, removed = result.rows_affected(), "Dropped collection");
        Ok(())
    }

    async fn insert_many_unordered(&self, collection: &str, docs: Vec<Value>) -> Result<InsertOutcome> {
        let mut outcome = InsertOutcome::default();
        let mut tx = self.pool.begin().await?;

        for doc in docs {
            let Some(id) = doc.get("_id") else {
                warn!(collection, "Rejecting document without _id");
                outcome.other_errors += 1;
                continue;
            };
            let doc_id = id.to_string();
            let body = serde_json::to_string(&doc)?;

            let result = sqlx::query("INSERT INTO documents (collection, doc_id, body) VALUES (?, ?, ?)")
                .bind(collection)
                .bind(&doc_id)
                .bind(&body)
                .execute(&mut *tx)
                .await;

            match result {
                Ok(_) => outcome.inserted += 1,
                Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                    debug!(collection, doc_id = %doc_id, "Duplicate key");
                    outcome.duplicates += 1;
                }
                Err(e) => {
                    warn!(collection, doc_id = %doc_id, error = %e, "Insert failed");
                    outcome.other_errors += 1;
                }
            }
        }

        tx.commit().await?;
        Ok(outcome)
    }

    async fn count(&self, collection: &str) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE collection = ?")
            .bind(collection)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn find_one(&self, collection: &str) -> Result<Option<Value>> {
        let body: Option<String> = sqlx::query_scalar(
            "SELECT body FROM documents WHERE collection = ? ORDER BY rowid LIMIT 1",
        )
        .bind(collection)
        .fetch_optional(&self.pool)
        .await?;

        body.map(|b| serde_json::from_str(&b).map_err(Error::from))
            .transpose()
    }

    async fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> Result<AggregateOutput> {
        let docs = self.load_collection(collection).await?;
        let docs_examined = docs.len() as u64;

        // Pipeline evaluation is CPU-bound
        let pipeline = pipeline.clone();
        let documents = tokio::task::spawn_blocking(move || pipeline.execute(docs))
            .await
            .map_err(|e| Error::Internal(format!("Pipeline task failed: {}", e)))?;

        Ok(AggregateOutput {
            documents,
            docs_examined,
        })
    }
}
