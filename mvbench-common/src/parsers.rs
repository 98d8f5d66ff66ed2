//! Field parsers for raw source values
//!
//! Both parsers are fail-soft: malformed input degrades to a partial result
//! instead of an error, and never aborts the enclosing transform.

use crate::models::{DateInput, ReleaseDateV1, StructuredDate};
use chrono::NaiveDate;

/// Separator used by the source dataset for list columns
pub const LIST_SEPARATOR: &str = ", ";

/// Result of parsing a release date
///
/// Consumers must treat a missing year as unknown, never as zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedDate {
    /// No date information in the source
    Empty,
    /// A date value was present but could not be split into parts
    Unparsed { full_date: String },
    /// Fully parsed calendar date
    Calendar {
        year: i32,
        month: u32,
        day: u32,
        full_date: String,
    },
}

impl ParsedDate {
    pub fn year(&self) -> Option<i32> {
        match self {
            ParsedDate::Calendar { year, .. } => Some(*year),
            _ => None,
        }
    }

    pub fn month(&self) -> Option<u32> {
        match self {
            ParsedDate::Calendar { month, .. } => Some(*month),
            _ => None,
        }
    }

    pub fn day(&self) -> Option<u32> {
        match self {
            ParsedDate::Calendar { day, .. } => Some(*day),
            _ => None,
        }
    }

    pub fn full_date(&self) -> Option<&str> {
        match self {
            ParsedDate::Empty => None,
            ParsedDate::Unparsed { full_date } | ParsedDate::Calendar { full_date, .. } => {
                Some(full_date.as_str())
            }
        }
    }

    /// Decade bucket, present only when the year is known
    pub fn decade(&self) -> Option<i32> {
        self.year().map(decade_of)
    }
}

impl From<&ParsedDate> for ReleaseDateV1 {
    fn from(date: &ParsedDate) -> Self {
        ReleaseDateV1 {
            year: date.year(),
            month: date.month(),
            day: date.day(),
            full_date: date.full_date().map(str::to_string),
        }
    }
}

/// Year rounded down to the nearest multiple of ten
///
/// Floor division, so year -5 falls in decade -10.
pub fn decade_of(year: i32) -> i32 {
    year.div_euclid(10) * 10
}

/// Parse a release date
///
/// - `None` or an empty string yields [`ParsedDate::Empty`]
/// - `"YYYY-MM-DD"` yields [`ParsedDate::Calendar`] with the input kept
///   verbatim as `full_date`; parts after the third are ignored
/// - anything else (non-numeric parts, fewer than three parts, month outside
///   1..=12, impossible structured dates) yields [`ParsedDate::Unparsed`]
pub fn parse_date(value: Option<DateInput<'_>>) -> ParsedDate {
    match value {
        None => ParsedDate::Empty,
        Some(DateInput::Iso(text)) if text.is_empty() => ParsedDate::Empty,
        Some(DateInput::Iso(text)) => parse_iso_date(text).unwrap_or_else(|| {
            ParsedDate::Unparsed {
                full_date: text.to_string(),
            }
        }),
        Some(DateInput::Structured(date)) => parse_structured_date(date),
    }
}

fn parse_iso_date(text: &str) -> Option<ParsedDate> {
    let mut parts = text.split('-');
    let year = parts.next()?.trim().parse::<i32>().ok()?;
    let month = parts.next()?.trim().parse::<u32>().ok()?;
    let day = parts.next()?.trim().parse::<u32>().ok()?;

    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }

    Some(ParsedDate::Calendar {
        year,
        month,
        day,
        full_date: text.to_string(),
    })
}

fn parse_structured_date(date: StructuredDate) -> ParsedDate {
    match NaiveDate::from_ymd_opt(date.year, date.month, date.day) {
        Some(valid) => ParsedDate::Calendar {
            year: date.year,
            month: date.month,
            day: date.day,
            full_date: valid.format("%Y-%m-%d").to_string(),
        },
        None => ParsedDate::Unparsed {
            full_date: format!("{}-{}-{}", date.year, date.month, date.day),
        },
    }
}

/// Split a `", "`-joined source field into trimmed items
///
/// Absent, empty, or whitespace-only input yields an empty list. Items are
/// neither deduplicated nor reordered.
pub fn parse_delimited_list(value: Option<&str>) -> Vec<String> {
    match value {
        Some(text) if !text.trim().is_empty() => text
            .split(LIST_SEPARATOR)
            .map(|item| item.trim().to_string())
            .collect(),
        _ => Vec::new(),
    }
}
