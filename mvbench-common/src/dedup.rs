//! Duplicate source-id resolution
//!
//! The source dataset carries several rows for some movie ids. Before a
//! batch is transformed, rows sharing an id are collapsed to the single most
//! complete one so that each id produces exactly one document.
//!
//! # Completeness score
//!
//! | Signal                     | Weight                 |
//! |----------------------------|------------------------|
//! | `imdb_id` present          | 10                     |
//! | `release_date` present     | 5                      |
//! | `overview` present         | 3                      |
//! | `revenue` non-zero         | 2                      |
//! | `vote_count`               | `vote_count / 100`     |
//!
//! The vote bonus is fractional and uncapped. Ties go to the record seen
//! first.

use crate::models::RawMovieRecord;
use std::collections::HashMap;
use tracing::debug;

const IMDB_ID_WEIGHT: f64 = 10.0;
const RELEASE_DATE_WEIGHT: f64 = 5.0;
const OVERVIEW_WEIGHT: f64 = 3.0;
const REVENUE_WEIGHT: f64 = 2.0;
const VOTE_COUNT_DIVISOR: f64 = 100.0;

/// Records kept after deduplication plus how many were dropped
#[derive(Debug, Clone, PartialEq)]
pub struct DedupOutcome {
    /// One record per distinct source id, in first-seen order
    pub records: Vec<RawMovieRecord>,
    /// `input_count - records.len()`
    pub removed_count: usize,
}

/// Score how complete a record is
pub fn completeness_score(record: &RawMovieRecord) -> f64 {
    let mut score = 0.0;

    if record.is_present("imdb_id") {
        score += IMDB_ID_WEIGHT;
    }
    if record.is_present("release_date") {
        score += RELEASE_DATE_WEIGHT;
    }
    if record.is_present("overview") {
        score += OVERVIEW_WEIGHT;
    }
    if record.number("revenue").is_some_and(|revenue| revenue != 0.0) {
        score += REVENUE_WEIGHT;
    }
    if let Some(votes) = record.number("vote_count") {
        score += votes / VOTE_COUNT_DIVISOR;
    }

    score
}

/// Keep the most complete record for every source id
///
/// Records without a usable id are not grouped with anything and pass
/// through unchanged, so the transformer can count them as errors.
pub fn select_most_complete(records: Vec<RawMovieRecord>) -> DedupOutcome {
    let input_count = records.len();

    // Slot per output position: (score, record)
    let mut kept: Vec<(f64, RawMovieRecord)> = Vec::with_capacity(input_count);
    let mut slot_by_id: HashMap<i64, usize> = HashMap::with_capacity(input_count);

    for record in records {
        let score = completeness_score(&record);

        let Some(id) = record.source_id() else {
            kept.push((score, record));
            continue;
        };

        match slot_by_id.get(&id) {
            Some(&slot) => {
                // Strictly greater: an equal score keeps the earlier record
                if score > kept[slot].0 {
                    debug!(id, old_score = kept[slot].0, new_score = score, "Replacing duplicate with more complete record");
                    kept[slot] = (score, record);
                }
            }
            None => {
                slot_by_id.insert(id, kept.len());
                kept.push((score, record));
            }
        }
    }

    let records: Vec<RawMovieRecord> = kept.into_iter().map(|(_, record)| record).collect();
    let removed_count = input_count - records.len();

    DedupOutcome {
        records,
        removed_count,
    }
}
