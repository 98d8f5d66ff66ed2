//! Raw record → document transformation
//!
//! Pure mapping from one [`RawMovieRecord`] to one document of the requested
//! layout: parse → derive → assemble, no I/O and no cross-record state, so
//! batches can be transformed in parallel in any order.
//!
//! Every output field has a default when the source field is absent (`""`,
//! `0`, `false`, `[]`). The only exception is the release date, whose parts
//! are omitted when unknown (see [`crate::parsers::ParsedDate`]).

use crate::derived::{
    calculate_profit, calculate_roi, categorize_budget, categorize_quality,
    generate_genre_pairs, sort_genres,
};
use crate::models::{
    ContentInfoV1, ContentInfoV2, FinancialV1, FinancialV2, Media, MovieDocument,
    MovieDocumentV1, MovieDocumentV2, ProductionV1, ProductionV2, RatingsV1, RatingsV2,
    RawMovieRecord, ReleaseDateV1, ReleaseInfoV1, ReleaseInfoV2, SchemaVersion,
    SCHEMA_VERSION_V2,
};
use crate::parsers::{parse_date, parse_delimited_list};
use thiserror::Error;

/// Record-level transform failure; the record is skipped and counted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    /// The record has no `id` value
    #[error("record has no source id")]
    MissingId,

    /// The `id` value is present but not an integer
    #[error("record has a non-numeric source id: {0}")]
    InvalidId(String),
}

/// Transform one raw record into the requested layout
pub fn transform(raw: &RawMovieRecord, schema: SchemaVersion) -> Result<MovieDocument, TransformError> {
    match schema {
        SchemaVersion::V1 => transform_v1(raw).map(MovieDocument::V1),
        SchemaVersion::V2 => transform_v2(raw).map(MovieDocument::V2),
    }
}

/// Nested layout; `_id` is `"tmdb_<id>"`
pub fn transform_v1(raw: &RawMovieRecord) -> Result<MovieDocumentV1, TransformError> {
    let source_id = require_source_id(raw)?;
    let release_date = parse_date(raw.date("release_date"));

    Ok(MovieDocumentV1 {
        id: format!("tmdb_{}", source_id),
        tmdb_id: source_id,
        title: text_or_default(raw, "title"),
        original_title: text_or_default(raw, "original_title"),
        overview: text_or_default(raw, "overview"),
        tagline: text_or_default(raw, "tagline"),
        ratings: RatingsV1 {
            vote_average: raw.number("vote_average").unwrap_or(0.0),
            vote_count: raw.integer("vote_count").unwrap_or(0),
            popularity: raw.number("popularity").unwrap_or(0.0),
        },
        release_info: ReleaseInfoV1 {
            status: text_or_default(raw, "status"),
            release_date: ReleaseDateV1::from(&release_date),
            original_language: text_or_default(raw, "original_language"),
            spoken_languages: list_field(raw, "spoken_languages"),
        },
        content_info: ContentInfoV1 {
            adult: raw.flag("adult").unwrap_or(false),
            runtime: raw.integer("runtime").unwrap_or(0),
            genres: list_field(raw, "genres"),
        },
        financial: FinancialV1 {
            budget: raw.integer("budget").unwrap_or(0),
            revenue: raw.integer("revenue").unwrap_or(0),
        },
        production: ProductionV1 {
            companies: list_field(raw, "production_companies"),
            countries: list_field(raw, "production_countries"),
        },
        media: media(raw),
        keywords: list_field(raw, "keywords"),
    })
}

/// Denormalized layout; `_id` is the raw source id
pub fn transform_v2(raw: &RawMovieRecord) -> Result<MovieDocumentV2, TransformError> {
    let source_id = require_source_id(raw)?;
    let release_date = parse_date(raw.date("release_date"));

    let budget = raw.integer("budget").unwrap_or(0);
    let revenue = raw.integer("revenue").unwrap_or(0);
    let profit = calculate_profit(budget, revenue);

    let vote_average = raw.number("vote_average").unwrap_or(0.0);

    let genres = list_field(raw, "genres");
    let sorted_genres = sort_genres(&genres);
    let genre_pairs = generate_genre_pairs(&genres);

    let companies = list_field(raw, "production_companies");
    let countries = list_field(raw, "production_countries");

    Ok(MovieDocumentV2 {
        id: source_id,
        schema_version: SCHEMA_VERSION_V2,
        title: text_or_default(raw, "title"),
        original_title: text_or_default(raw, "original_title"),
        overview: text_or_default(raw, "overview"),
        tagline: text_or_default(raw, "tagline"),
        ratings: RatingsV2 {
            vote_average,
            vote_count: raw.integer("vote_count").unwrap_or(0),
            popularity: raw.number("popularity").unwrap_or(0.0),
            quality_tier: categorize_quality(vote_average),
        },
        release_info: ReleaseInfoV2 {
            status: text_or_default(raw, "status"),
            year: release_date.year(),
            month: release_date.month(),
            day: release_date.day(),
            decade: release_date.decade(),
            full_date: release_date.full_date().map(str::to_string),
            original_language: text_or_default(raw, "original_language"),
            spoken_languages: list_field(raw, "spoken_languages"),
        },
        content_info: ContentInfoV2 {
            adult: raw.flag("adult").unwrap_or(false),
            runtime: raw.integer("runtime").unwrap_or(0),
            genres,
            sorted_genres,
            genre_pairs,
        },
        financial: FinancialV2 {
            budget,
            revenue,
            profit,
            roi: calculate_roi(budget, revenue),
            is_profitable: profit > 0,
            budget_category: categorize_budget(budget),
        },
        production: ProductionV2 {
            company_count: companies.len(),
            country_count: countries.len(),
            companies,
            countries,
        },
        media: media(raw),
        keywords: list_field(raw, "keywords"),
    })
}

fn require_source_id(raw: &RawMovieRecord) -> Result<i64, TransformError> {
    if !raw.is_present("id") {
        return Err(TransformError::MissingId);
    }
    raw.source_id().ok_or_else(|| {
        TransformError::InvalidId(
            raw.get("id")
                .map(|v| format!("{:?}", v))
                .unwrap_or_default(),
        )
    })
}

fn text_or_default(raw: &RawMovieRecord, key: &str) -> String {
    raw.text(key).unwrap_or_default()
}

fn list_field(raw: &RawMovieRecord, key: &str) -> Vec<String> {
    parse_delimited_list(raw.text(key).as_deref())
}

fn media(raw: &RawMovieRecord) -> Media {
    Media {
        poster_path: text_or_default(raw, "poster_path"),
        backdrop_path: text_or_default(raw, "backdrop_path"),
        homepage: text_or_default(raw, "homepage"),
        imdb_id: text_or_default(raw, "imdb_id"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derived::{BudgetCategory, QualityTier};
    use crate::models::RawValue;
    use serde_json::json;

    fn text(value: &str) -> RawValue {
        RawValue::Text(value.to_string())
    }

    fn matrix() -> RawMovieRecord {
        RawMovieRecord::new()
            .with("id", text("603"))
            .with("title", text("The Matrix"))
            .with("original_title", text("The Matrix"))
            .with("budget", text("63000000"))
            .with("revenue", text("463517383"))
            .with("genres", text("Action, Science Fiction"))
            .with("production_companies", text("Warner Bros. Pictures, Village Roadshow Pictures"))
            .with("production_countries", text("United States of America"))
            .with("spoken_languages", text("English"))
            .with("keywords", text("saving the world, artificial intelligence"))
            .with("release_date", text("1999-03-30"))
            .with("vote_average", text("8.2"))
            .with("vote_count", text("24000"))
            .with("popularity", text("80.5"))
            .with("runtime", text("136"))
            .with("adult", text("False"))
            .with("status", text("Released"))
            .with("original_language", text("en"))
            .with("imdb_id", text("tt0133093"))
    }

    #[test]
    fn test_v1_shape() {
        let doc = transform(&matrix(), SchemaVersion::V1).unwrap();
        let value = doc.to_value().unwrap();

        assert_eq!(value["_id"], json!("tmdb_603"));
        assert_eq!(value["tmdb_id"], json!(603));
        assert_eq!(
            value["release_info"]["release_date"],
            json!({"year": 1999, "month": 3, "day": 30, "full_date": "1999-03-30"})
        );
        assert_eq!(value["financial"], json!({"budget": 63000000, "revenue": 463517383}));
        assert_eq!(value["content_info"]["genres"], json!(["Action", "Science Fiction"]));
        assert_eq!(value["media"]["imdb_id"], json!("tt0133093"));
        assert!(value["ratings"].get("quality_tier").is_none());
        assert!(value["release_info"].get("decade").is_none());
    }

    #[test]
    fn test_v2_derived_fields() {
        let doc = transform_v2(&matrix()).unwrap();

        assert_eq!(doc.id, 603);
        assert_eq!(doc.schema_version, 2);
        assert_eq!(doc.release_info.year, Some(1999));
        assert_eq!(doc.release_info.decade, Some(1990));
        assert_eq!(doc.financial.profit, 400_517_383);
        assert_eq!(doc.financial.roi, 635.74);
        assert!(doc.financial.is_profitable);
        assert_eq!(doc.financial.budget_category, BudgetCategory::High);
        assert_eq!(doc.ratings.quality_tier, QualityTier::Excellent);
        assert_eq!(doc.content_info.genre_pairs, vec!["Action+Science Fiction".to_string()]);
        assert_eq!(doc.production.company_count, 2);
        assert_eq!(doc.production.country_count, 1);
    }

    #[test]
    fn test_v2_release_info_is_flat() {
        let value = transform(&matrix(), SchemaVersion::V2).unwrap().to_value().unwrap();
        let release_info = &value["release_info"];

        assert!(release_info.get("release_date").is_none());
        assert_eq!(release_info["month"], json!(3));
        assert_eq!(release_info["full_date"], json!("1999-03-30"));
        assert_eq!(value["_id"], json!(603));
    }

    #[test]
    fn test_missing_fields_default() {
        let raw = RawMovieRecord::new().with("id", RawValue::Integer(1));
        let doc = transform_v2(&raw).unwrap();

        assert_eq!(doc.title, "");
        assert_eq!(doc.financial.budget, 0);
        assert_eq!(doc.financial.roi, 0.0);
        assert!(!doc.financial.is_profitable);
        assert_eq!(doc.financial.budget_category, BudgetCategory::Low);
        assert_eq!(doc.ratings.quality_tier, QualityTier::Poor);
        assert!(doc.content_info.genres.is_empty());
        assert!(doc.content_info.genre_pairs.is_empty());
        assert!(!doc.content_info.adult);
        assert_eq!(doc.release_info.year, None);

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["keywords"], json!([]));
        assert_eq!(value["media"]["homepage"], json!(""));
        for key in ["year", "month", "day", "decade", "full_date"] {
            assert_eq!(value["release_info"].get(key), Some(&json!(null)), "{}", key);
        }
    }

    #[test]
    fn test_missing_and_invalid_id() {
        let no_id = RawMovieRecord::new().with("title", text("Untitled"));
        assert_eq!(transform(&no_id, SchemaVersion::V1), Err(TransformError::MissingId));

        let empty_id = RawMovieRecord::new().with("id", text(""));
        assert_eq!(transform(&empty_id, SchemaVersion::V2), Err(TransformError::MissingId));

        let bad_id = RawMovieRecord::new().with("id", text("abc"));
        assert!(matches!(
            transform(&bad_id, SchemaVersion::V2),
            Err(TransformError::InvalidId(_))
        ));

        let fractional_id = RawMovieRecord::new().with("id", text("603.7"));
        assert!(matches!(
            transform(&fractional_id, SchemaVersion::V1),
            Err(TransformError::InvalidId(_))
        ));
    }

    #[test]
    fn test_transform_is_deterministic() {
        for schema in [SchemaVersion::V1, SchemaVersion::V2] {
            let first = serde_json::to_string(&transform(&matrix(), schema).unwrap()).unwrap();
            let second = serde_json::to_string(&transform(&matrix(), schema).unwrap()).unwrap();
            assert_eq!(first, second);
        }
    }
}
