//! Stored document shapes
//!
//! Field grouping (ratings / release_info / content_info / financial /
//! production / media / keywords) is addressed by dotted path from the query
//! catalog, so renaming or regrouping a field here breaks the benchmark
//! queries.

use crate::derived::{BudgetCategory, QualityTier};
use serde::{Deserialize, Serialize};

/// Which document layout to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVersion {
    /// Nested layout mirroring the source columns
    V1,
    /// Flattened layout with precomputed analytics fields
    V2,
}

impl SchemaVersion {
    /// Default collection name for this layout
    pub fn default_collection(&self) -> &'static str {
        match self {
            SchemaVersion::V1 => "movies",
            SchemaVersion::V2 => "movies_optimized",
        }
    }

    /// Dotted path of the release year in this layout
    pub fn year_path(&self) -> &'static str {
        match self {
            SchemaVersion::V1 => "release_info.release_date.year",
            SchemaVersion::V2 => "release_info.year",
        }
    }
}

impl std::fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaVersion::V1 => write!(f, "v1"),
            SchemaVersion::V2 => write!(f, "v2"),
        }
    }
}

impl std::str::FromStr for SchemaVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "v1" | "1" => Ok(SchemaVersion::V1),
            "v2" | "2" => Ok(SchemaVersion::V2),
            other => Err(format!("unknown schema version '{}' (expected v1 or v2)", other)),
        }
    }
}

// ============================================================================
// V1: nested layout
// ============================================================================

/// V1 document: mirrors the source structure with light nesting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDocumentV1 {
    /// `"tmdb_<id>"`
    #[serde(rename = "_id")]
    pub id: String,
    pub tmdb_id: i64,
    pub title: String,
    pub original_title: String,
    pub overview: String,
    pub tagline: String,
    pub ratings: RatingsV1,
    pub release_info: ReleaseInfoV1,
    pub content_info: ContentInfoV1,
    pub financial: FinancialV1,
    pub production: ProductionV1,
    pub media: Media,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingsV1 {
    pub vote_average: f64,
    pub vote_count: i64,
    pub popularity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseInfoV1 {
    pub status: String,
    pub release_date: ReleaseDateV1,
    pub original_language: String,
    pub spoken_languages: Vec<String>,
}

/// Release date one level below `release_info`
///
/// Unknown parts are omitted rather than zeroed: `{}` when there was no
/// date, `{full_date}` when the source value could not be parsed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReleaseDateV1 {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentInfoV1 {
    pub adult: bool,
    pub runtime: i64,
    pub genres: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialV1 {
    pub budget: i64,
    pub revenue: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionV1 {
    pub companies: Vec<String>,
    pub countries: Vec<String>,
}

/// Media links, identical in both layouts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Media {
    pub poster_path: String,
    pub backdrop_path: String,
    pub homepage: String,
    pub imdb_id: String,
}

// ============================================================================
// V2: denormalized layout
// ============================================================================

/// Current V2 layout marker, checked by schema validation
pub const SCHEMA_VERSION_V2: u32 = 2;

/// V2 document: flattened release date plus precomputed derived fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDocumentV2 {
    /// Raw source id
    #[serde(rename = "_id")]
    pub id: i64,
    pub schema_version: u32,
    pub title: String,
    pub original_title: String,
    pub overview: String,
    pub tagline: String,
    pub ratings: RatingsV2,
    pub release_info: ReleaseInfoV2,
    pub content_info: ContentInfoV2,
    pub financial: FinancialV2,
    pub production: ProductionV2,
    pub media: Media,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingsV2 {
    pub vote_average: f64,
    pub vote_count: i64,
    pub popularity: f64,
    pub quality_tier: QualityTier,
}

/// Release information with the date parts at a single nesting level
///
/// Unknown date parts are stored as `null`; every key is always written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseInfoV2 {
    pub status: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub month: Option<u32>,
    #[serde(default)]
    pub day: Option<u32>,
    #[serde(default)]
    pub decade: Option<i32>,
    #[serde(default)]
    pub full_date: Option<String>,
    pub original_language: String,
    pub spoken_languages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentInfoV2 {
    pub adult: bool,
    pub runtime: i64,
    pub genres: Vec<String>,
    pub sorted_genres: Vec<String>,
    pub genre_pairs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialV2 {
    pub budget: i64,
    pub revenue: i64,
    pub profit: i64,
    pub roi: f64,
    pub is_profitable: bool,
    pub budget_category: BudgetCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionV2 {
    pub companies: Vec<String>,
    pub countries: Vec<String>,
    pub company_count: usize,
    pub country_count: usize,
}

// ============================================================================
// Either layout
// ============================================================================

/// A transformed document of either layout
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MovieDocument {
    V1(MovieDocumentV1),
    V2(MovieDocumentV2),
}

impl MovieDocument {
    pub fn schema(&self) -> SchemaVersion {
        match self {
            MovieDocument::V1(_) => SchemaVersion::V1,
            MovieDocument::V2(_) => SchemaVersion::V2,
        }
    }

    /// Render as a JSON document for the store
    pub fn to_value(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}
