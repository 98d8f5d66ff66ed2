//! Integration tests for database initialization and the SQLite document store

use mvbench_common::db::{init_database, DocumentStore, SqliteDocumentStore};
use mvbench_common::query::Pipeline;
use serde_json::json;
use tempfile::TempDir;

async fn open_store(dir: &TempDir) -> SqliteDocumentStore {
    let pool = init_database(&dir.path().join("mvbench.db")).await.unwrap();
    SqliteDocumentStore::new(pool)
}

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("nested").join("mvbench.db");

    let result = init_database(&db_path).await;

    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists());
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("mvbench.db");

    let first = init_database(&db_path).await.unwrap();
    SqliteDocumentStore::new(first.clone())
        .insert_many_unordered("movies", vec![json!({"_id": 1})])
        .await
        .unwrap();
    first.close().await;

    let second = SqliteDocumentStore::new(init_database(&db_path).await.unwrap());
    assert_eq!(second.count("movies").await.unwrap(), 1);
}

#[tokio::test]
async fn test_insert_counts_duplicates_without_aborting() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let outcome = store
        .insert_many_unordered(
            "movies",
            vec![
                json!({"_id": "tmdb_1", "title": "A"}),
                json!({"_id": "tmdb_1", "title": "A again"}),
                json!({"title": "no id"}),
                json!({"_id": "tmdb_2", "title": "B"}),
            ],
        )
        .await
        .unwrap();

    assert_eq!(outcome.inserted, 2);
    assert_eq!(outcome.duplicates, 1);
    assert_eq!(outcome.other_errors, 1);
    assert_eq!(store.count("movies").await.unwrap(), 2);

    let first = store.find_one("movies").await.unwrap().unwrap();
    assert_eq!(first["title"], json!("A"));
}

#[tokio::test]
async fn test_string_and_numeric_ids_are_distinct() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let outcome = store
        .insert_many_unordered("movies", vec![json!({"_id": 603}), json!({"_id": "603"})])
        .await
        .unwrap();

    assert_eq!(outcome.inserted, 2);
}

#[tokio::test]
async fn test_collections_are_isolated_and_droppable() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    store
        .insert_many_unordered("movies", vec![json!({"_id": 1})])
        .await
        .unwrap();
    store
        .insert_many_unordered("movies_optimized", vec![json!({"_id": 1}), json!({"_id": 2})])
        .await
        .unwrap();

    assert_eq!(
        store.list_collections().await.unwrap(),
        vec!["movies".to_string(), "movies_optimized".to_string()]
    );

    store.drop_collection("movies").await.unwrap();
    store.drop_collection("never_existed").await.unwrap();

    assert_eq!(store.list_collections().await.unwrap(), vec!["movies_optimized".to_string()]);
    assert_eq!(store.count("movies").await.unwrap(), 0);
    assert!(store.find_one("movies").await.unwrap().is_none());
    assert_eq!(store.count("movies_optimized").await.unwrap(), 2);
}

#[tokio::test]
async fn test_aggregate_reports_docs_examined() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let docs = (1..=5)
        .map(|i| json!({"_id": i, "financial": {"budget": i * 10}}))
        .collect();
    store.insert_many_unordered("movies", docs).await.unwrap();

    let pipeline = Pipeline::from_value(&json!([
        {"$match": {"financial.budget": {"$gte": 30}}},
        {"$sort": {"_id": -1}}
    ]))
    .unwrap();

    let output = store.aggregate("movies", &pipeline).await.unwrap();

    assert_eq!(output.docs_examined, 5);
    let ids: Vec<_> = output.documents.iter().map(|d| d["_id"].clone()).collect();
    assert_eq!(ids, vec![json!(5), json!(4), json!(3)]);
}
