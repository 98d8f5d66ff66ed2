//! Raw movie records as read from the source dataset
//!
//! A [`RawMovieRecord`] is an untyped mapping of source column names to
//! loosely typed values. Records are never mutated after construction; the
//! typed accessors below coerce values on read and return `None` for absent,
//! empty, or unusable values so callers can apply their own defaults.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A calendar date supplied as separate year/month/day parts
///
/// JSON input may carry `{"year": 1999, "month": 11, "day": 19}` instead of an
/// ISO string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

/// One loosely typed source value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Date(StructuredDate),
}

impl RawValue {
    /// Absent in the pandas sense: null, NaN, or an empty string
    pub fn is_missing(&self) -> bool {
        match self {
            RawValue::Null => true,
            RawValue::Float(f) => f.is_nan(),
            RawValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }
}

/// Input to the date parser
///
/// The two accepted shapes are distinguished up front instead of probing the
/// value at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateInput<'a> {
    /// `"YYYY-MM-DD"` (or anything else found in a text column)
    Iso(&'a str),
    /// Separate year/month/day parts
    Structured(StructuredDate),
}

/// One row of the source dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawMovieRecord {
    fields: BTreeMap<String, RawValue>,
}

impl RawMovieRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from CSV headers and one row of cells
    ///
    /// Empty cells are stored as [`RawValue::Null`]; everything else is kept
    /// as text and coerced by the accessors.
    pub fn from_csv_row<'a, H, C>(headers: H, cells: C) -> Self
    where
        H: IntoIterator<Item = &'a str>,
        C: IntoIterator<Item = &'a str>,
    {
        let fields = headers
            .into_iter()
            .zip(cells)
            .map(|(header, cell)| {
                let value = if cell.is_empty() {
                    RawValue::Null
                } else {
                    RawValue::Text(cell.to_string())
                };
                (header.to_string(), value)
            })
            .collect();
        Self { fields }
    }

    /// Builder-style field setter, mostly for fixtures
    pub fn with(mut self, key: &str, value: RawValue) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&RawValue> {
        self.fields.get(key)
    }

    /// True when the field exists and is not missing (null/NaN/empty)
    pub fn is_present(&self, key: &str) -> bool {
        self.fields.get(key).is_some_and(|v| !v.is_missing())
    }

    /// Text value; numbers are rendered, booleans and dates are not text
    pub fn text(&self, key: &str) -> Option<String> {
        match self.fields.get(key)? {
            RawValue::Text(s) if !s.is_empty() => Some(s.clone()),
            RawValue::Integer(i) => Some(i.to_string()),
            RawValue::Float(f) if !f.is_nan() => Some(f.to_string()),
            _ => None,
        }
    }

    /// Numeric value; text is parsed after trimming
    pub fn number(&self, key: &str) -> Option<f64> {
        match self.fields.get(key)? {
            RawValue::Integer(i) => Some(*i as f64),
            RawValue::Float(f) if f.is_finite() => Some(*f),
            RawValue::Text(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
            _ => None,
        }
    }

    /// Integral value; fractional numbers are truncated
    pub fn integer(&self, key: &str) -> Option<i64> {
        match self.fields.get(key)? {
            RawValue::Integer(i) => Some(*i),
            RawValue::Text(s) => {
                let trimmed = s.trim();
                trimmed
                    .parse::<i64>()
                    .ok()
                    .or_else(|| self.number(key).map(|f| f as i64))
            }
            _ => self.number(key).map(|f| f as i64),
        }
    }

    /// Boolean value; accepts `true`/`false` in any case and `1`/`0`
    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.fields.get(key)? {
            RawValue::Bool(b) => Some(*b),
            RawValue::Integer(i) => Some(*i != 0),
            RawValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Date value for the date parser
    ///
    /// Values that are neither text nor structured dates carry no date
    /// information.
    pub fn date(&self, key: &str) -> Option<DateInput<'_>> {
        match self.fields.get(key)? {
            RawValue::Text(s) if !s.is_empty() => Some(DateInput::Iso(s.as_str())),
            RawValue::Date(d) => Some(DateInput::Structured(*d)),
            _ => None,
        }
    }

    /// Natural key of the record (the external source id)
    ///
    /// Only whole numbers qualify; `"603.7"` is not an id.
    pub fn source_id(&self) -> Option<i64> {
        match self.fields.get("id")? {
            RawValue::Integer(i) => Some(*i),
            _ => self
                .number("id")
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64),
        }
    }
}
