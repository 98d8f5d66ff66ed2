//! Derived analytics fields for the V2 layout
//!
//! All functions here are total: callers default missing raw fields (0, empty
//! list) before calling. Every derived value depends only on the record it is
//! computed from.
//!
//! **Thresholds** (inclusive on the lower bound of each tier):
//!
//! | Budget            | Category      | Vote average | Tier        |
//! |-------------------|---------------|--------------|-------------|
//! | ≥ 100,000,000     | `blockbuster` | ≥ 7.0        | `excellent` |
//! | ≥ 50,000,000      | `high`        | ≥ 6.0        | `good`      |
//! | ≥ 10,000,000      | `medium`      | ≥ 5.0        | `average`   |
//! | below             | `low`         | below        | `poor`      |

use serde::{Deserialize, Serialize};

pub const BLOCKBUSTER_BUDGET: i64 = 100_000_000;
pub const HIGH_BUDGET: i64 = 50_000_000;
pub const MEDIUM_BUDGET: i64 = 10_000_000;

pub const EXCELLENT_RATING: f64 = 7.0;
pub const GOOD_RATING: f64 = 6.0;
pub const AVERAGE_RATING: f64 = 5.0;

/// Budget classification, ordered from smallest to largest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetCategory {
    Low,
    Medium,
    High,
    Blockbuster,
}

impl BudgetCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetCategory::Low => "low",
            BudgetCategory::Medium => "medium",
            BudgetCategory::High => "high",
            BudgetCategory::Blockbuster => "blockbuster",
        }
    }
}

/// Rating classification, ordered from worst to best
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Poor,
    Average,
    Good,
    Excellent,
}

impl QualityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityTier::Poor => "poor",
            QualityTier::Average => "average",
            QualityTier::Good => "good",
            QualityTier::Excellent => "excellent",
        }
    }
}

/// Classify a budget
pub fn categorize_budget(budget: i64) -> BudgetCategory {
    if budget >= BLOCKBUSTER_BUDGET {
        BudgetCategory::Blockbuster
    } else if budget >= HIGH_BUDGET {
        BudgetCategory::High
    } else if budget >= MEDIUM_BUDGET {
        BudgetCategory::Medium
    } else {
        BudgetCategory::Low
    }
}

/// Classify a vote average
pub fn categorize_quality(vote_average: f64) -> QualityTier {
    if vote_average >= EXCELLENT_RATING {
        QualityTier::Excellent
    } else if vote_average >= GOOD_RATING {
        QualityTier::Good
    } else if vote_average >= AVERAGE_RATING {
        QualityTier::Average
    } else {
        QualityTier::Poor
    }
}

/// Genres in lexicographic order
pub fn sort_genres(genres: &[String]) -> Vec<String> {
    let mut sorted = genres.to_vec();
    sorted.sort();
    sorted
}

/// Every unordered pair of genres rendered as `"A+B"` with `A < B`
///
/// Empty for fewer than two genres; otherwise `n * (n - 1) / 2` pairs in
/// sorted-index order. Input lists are assumed to hold distinct genres.
pub fn generate_genre_pairs(genres: &[String]) -> Vec<String> {
    if genres.len() < 2 {
        return Vec::new();
    }

    let sorted = sort_genres(genres);
    let mut pairs = Vec::with_capacity(sorted.len() * (sorted.len() - 1) / 2);
    for (i, first) in sorted.iter().enumerate() {
        for second in &sorted[i + 1..] {
            pairs.push(format!("{}+{}", first, second));
        }
    }
    pairs
}

/// Revenue minus budget
pub fn calculate_profit(budget: i64, revenue: i64) -> i64 {
    revenue.saturating_sub(budget)
}

/// Return on investment in percent, rounded to two decimals
///
/// Zero when the budget is not positive.
pub fn calculate_roi(budget: i64, revenue: i64) -> f64 {
    if budget > 0 {
        let roi = ((revenue as f64 - budget as f64) / budget as f64) * 100.0;
        round_to(roi, 2)
    } else {
        0.0
    }
}

/// Round half away from zero to `decimals` places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
