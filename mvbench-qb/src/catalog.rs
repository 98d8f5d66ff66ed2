//! Query catalog
//!
//! Five analytical questions, each written twice: the V1 pipeline works on
//! raw fields and computes in the pipeline, the V2 pipeline reads the
//! precomputed fields. Both sides of a pair answer the same question, so
//! their result `_id` sequences must match. Every `$sort` ends on `_id` so
//! that `$limit` cuts at a deterministic point.

use mvbench_common::query::Pipeline;
use mvbench_common::Result;
use serde_json::{json, Value};

/// One logical question in both layouts
#[derive(Debug, Clone)]
pub struct QueryPair {
    /// Report key, e.g. `query_1`
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub v1: Value,
    pub v2: Value,
}

impl QueryPair {
    /// Parse both pipelines
    pub fn pipelines(&self) -> Result<(Pipeline, Pipeline)> {
        Ok((Pipeline::from_value(&self.v1)?, Pipeline::from_value(&self.v2)?))
    }
}

/// The benchmark queries in report order
pub fn catalog() -> Vec<QueryPair> {
    vec![
        revenue_by_company(),
        rating_by_genre_and_decade(),
        blockbusters_by_month(),
        profitable_genre_combinations(),
        runtime_by_country(),
    ]
}

/// Look up a query by its report key
pub fn find(key: &str) -> Option<QueryPair> {
    catalog().into_iter().find(|q| q.key == key)
}

fn revenue_by_company() -> QueryPair {
    let tail = json!([
        {"$unwind": "$production.companies"},
        {"$group": {
            "_id": "$production.companies",
            "avg_revenue": {"$avg": "$financial.revenue"},
            "total_movies": {"$sum": 1},
            "total_revenue": {"$sum": "$financial.revenue"}
        }},
        {"$sort": {"avg_revenue": -1, "_id": 1}},
        {"$limit": 20}
    ]);

    QueryPair {
        key: "query_1",
        name: "Top companies by average revenue (budget >= 50M)",
        description: "Average revenue per movie of production companies whose movies had a budget of at least 50M",
        v1: with_match(
            json!({"financial.budget": {"$gte": 50_000_000}, "financial.revenue": {"$gt": 0}}),
            &tail,
        ),
        v2: with_match(
            json!({
                "financial.budget_category": {"$in": ["high", "blockbuster"]},
                "financial.revenue": {"$gt": 0}
            }),
            &tail,
        ),
    }
}

fn rating_by_genre_and_decade() -> QueryPair {
    QueryPair {
        key: "query_2",
        name: "Average rating by genre and decade",
        description: "Average vote of rated movies per genre across release decades",
        v1: json!([
            {"$match": {
                "release_info.release_date.year": {"$exists": true, "$ne": null},
                "ratings.vote_average": {"$gt": 0}
            }},
            {"$unwind": "$content_info.genres"},
            {"$addFields": {
                "decade": {"$multiply": [
                    {"$floor": {"$divide": ["$release_info.release_date.year", 10]}},
                    10
                ]}
            }},
            {"$group": {
                "_id": {"genre": "$content_info.genres", "decade": "$decade"},
                "avg_rating": {"$avg": "$ratings.vote_average"},
                "movie_count": {"$sum": 1}
            }},
            {"$sort": {"_id.genre": 1, "_id.decade": 1}}
        ]),
        v2: json!([
            {"$match": {
                "release_info.decade": {"$exists": true, "$ne": null},
                "ratings.vote_average": {"$gt": 0}
            }},
            {"$unwind": "$content_info.genres"},
            {"$group": {
                "_id": {"genre": "$content_info.genres", "decade": "$release_info.decade"},
                "avg_rating": {"$avg": "$ratings.vote_average"},
                "movie_count": {"$sum": 1}
            }},
            {"$sort": {"_id.genre": 1, "_id.decade": 1}}
        ]),
    }
}

fn blockbusters_by_month() -> QueryPair {
    let tail = |month: &str| {
        json!([
            {"$group": {
                "_id": format!("${}", month),
                "blockbuster_count": {"$sum": 1},
                "avg_budget": {"$avg": "$financial.budget"},
                "total_revenue": {"$sum": "$financial.revenue"}
            }},
            {"$sort": {"blockbuster_count": -1, "_id": 1}}
        ])
    };

    QueryPair {
        key: "query_3",
        name: "Blockbuster releases by month",
        description: "Months with the most premieres of movies budgeted at 100M or more",
        v1: with_match(
            json!({
                "financial.budget": {"$gte": 100_000_000},
                "release_info.release_date.month": {"$exists": true, "$ne": null}
            }),
            &tail("release_info.release_date.month"),
        ),
        v2: with_match(
            json!({
                "financial.budget_category": "blockbuster",
                "release_info.month": {"$exists": true, "$ne": null}
            }),
            &tail("release_info.month"),
        ),
    }
}

fn profitable_genre_combinations() -> QueryPair {
    let tail = json!([
        {"$match": {"movie_count": {"$gte": 10}}},
        {"$sort": {"avg_profit": -1, "_id": 1}},
        {"$limit": 20}
    ]);

    let v1 = with_match(
        json!({
            "financial.revenue": {"$gt": 0},
            "financial.budget": {"$gt": 0},
            "content_info.genres": {"$exists": true, "$ne": []}
        }),
        &json!([
            {"$addFields": {
                "profit": {"$subtract": ["$financial.revenue", "$financial.budget"]},
                "roi": {"$multiply": [
                    {"$divide": [
                        {"$subtract": ["$financial.revenue", "$financial.budget"]},
                        "$financial.budget"
                    ]},
                    100
                ]},
                "sorted_genres": {"$sortArray": {"input": "$content_info.genres", "sortBy": 1}}
            }},
            {"$group": {
                "_id": "$sorted_genres",
                "avg_profit": {"$avg": "$profit"},
                "avg_roi": {"$avg": "$roi"},
                "total_profit": {"$sum": "$profit"},
                "movie_count": {"$sum": 1}
            }}
        ]),
    );

    let v2 = with_match(
        json!({
            "financial.revenue": {"$gt": 0},
            "financial.budget": {"$gt": 0},
            "content_info.sorted_genres": {"$exists": true, "$ne": []}
        }),
        &json!([
            {"$group": {
                "_id": "$content_info.sorted_genres",
                "avg_profit": {"$avg": "$financial.profit"},
                "avg_roi": {"$avg": "$financial.roi"},
                "total_profit": {"$sum": "$financial.profit"},
                "movie_count": {"$sum": 1}
            }}
        ]),
    );

    QueryPair {
        key: "query_4",
        name: "Most profitable genre combinations",
        description: "Genre combinations with at least 10 movies ranked by average profit",
        v1: concat(&v1, &tail),
        v2: concat(&v2, &tail),
    }
}

fn runtime_by_country() -> QueryPair {
    let tail = json!([
        {"$group": {
            "_id": "$production.countries",
            "avg_runtime": {"$avg": "$content_info.runtime"},
            "movie_count": {"$sum": 1},
            "avg_rating": {"$avg": "$ratings.vote_average"}
        }},
        {"$match": {"movie_count": {"$gte": 100}}},
        {"$sort": {"avg_runtime": -1, "_id": 1}},
        {"$limit": 20}
    ]);

    QueryPair {
        key: "query_5",
        name: "Average runtime by country (rating >= 7)",
        description: "Average runtime per production country of well-rated movies, countries with at least 100 movies",
        v1: concat(
            &json!([
                {"$unwind": "$production.countries"},
                {"$match": {
                    "production.countries": {"$ne": ""},
                    "content_info.runtime": {"$gt": 0},
                    "ratings.vote_average": {"$gte": 7.0}
                }}
            ]),
            &tail,
        ),
        v2: concat(
            &json!([
                {"$match": {
                    "ratings.quality_tier": "excellent",
                    "content_info.runtime": {"$gt": 0},
                    "production.countries": {"$exists": true, "$ne": []}
                }},
                {"$unwind": "$production.countries"},
                {"$match": {"production.countries": {"$ne": ""}}}
            ]),
            &tail,
        ),
    }
}

/// `[{"$match": filter}, ..stages]`
fn with_match(filter: Value, stages: &Value) -> Value {
    concat(&json!([{ "$match": filter }]), stages)
}

fn concat(head: &Value, tail: &Value) -> Value {
    let stages = [head, tail]
        .into_iter()
        .filter_map(Value::as_array)
        .flatten()
        .cloned()
        .collect();
    Value::Array(stages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_keys_in_order() {
        let keys: Vec<_> = catalog().iter().map(|q| q.key).collect();
        assert_eq!(keys, vec!["query_1", "query_2", "query_3", "query_4", "query_5"]);
    }

    #[test]
    fn test_every_pipeline_parses() {
        for query in catalog() {
            let result = query.pipelines();
            assert!(result.is_ok(), "{} failed to parse: {:?}", query.key, result.err());
        }
    }

    #[test]
    fn test_find() {
        assert_eq!(find("query_3").unwrap().key, "query_3");
        assert!(find("query_9").is_none());
    }

    #[test]
    fn test_decade_pair_agrees_on_documents() {
        let (v1, v2) = find("query_2").unwrap().pipelines().unwrap();

        let v1_docs = vec![
            json!({"_id": "tmdb_1", "ratings": {"vote_average": 8.0},
                   "release_info": {"release_date": {"year": 1994}},
                   "content_info": {"genres": ["Drama", "Crime"]}}),
            json!({"_id": "tmdb_2", "ratings": {"vote_average": 6.0},
                   "release_info": {"release_date": {"year": 1999}},
                   "content_info": {"genres": ["Drama"]}}),
            json!({"_id": "tmdb_3", "ratings": {"vote_average": 7.0},
                   "release_info": {"release_date": {}},
                   "content_info": {"genres": ["Drama"]}}),
        ];
        let v2_docs = vec![
            json!({"_id": 1, "ratings": {"vote_average": 8.0},
                   "release_info": {"year": 1994, "decade": 1990},
                   "content_info": {"genres": ["Drama", "Crime"]}}),
            json!({"_id": 2, "ratings": {"vote_average": 6.0},
                   "release_info": {"year": 1999, "decade": 1990},
                   "content_info": {"genres": ["Drama"]}}),
            json!({"_id": 3, "ratings": {"vote_average": 7.0},
                   "release_info": {},
                   "content_info": {"genres": ["Drama"]}}),
        ];

        let expected = vec![
            json!({"_id": {"genre": "Crime", "decade": 1990}, "avg_rating": 8, "movie_count": 1}),
            json!({"_id": {"genre": "Drama", "decade": 1990}, "avg_rating": 7, "movie_count": 2}),
        ];
        assert_eq!(v1.execute(v1_docs), expected);
        assert_eq!(v2.execute(v2_docs), expected);
    }
}
