//! In-process aggregation pipeline engine
//!
//! Pipelines use MongoDB's JSON syntax and are parsed once into typed
//! [`Stage`]s; an unsupported stage or operator is rejected at parse time
//! with [`Error::Query`](crate::Error::Query). Execution is a straight fold of
//! the stages over the documents of one collection.
//!
//! # Supported stages
//!
//! | Stage        | Notes                                                       |
//! |--------------|-------------------------------------------------------------|
//! | `$match`     | see [`filter`]                                              |
//! | `$unwind`    | missing/null/empty arrays dropped, scalars pass unchanged   |
//! | `$group`     | see [`group`]                                               |
//! | `$sort`      | multi-key, dotted paths, stable                             |
//! | `$limit`     | positive integer                                            |
//! | `$addFields` | expressions from [`expr`]                                   |

pub mod expr;
pub mod filter;
pub mod group;
pub mod value;

use crate::error::{Error, Result};
use expr::Expr;
use filter::Filter;
use group::GroupSpec;
use serde_json::Value;
use std::cmp::Ordering;
use value::{compare_values, lookup, set_path};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Match(Filter),
    Unwind(String),
    Group(GroupSpec),
    Sort(Vec<(String, SortDirection)>),
    Limit(usize),
    AddFields(Vec<(String, Expr)>),
}

impl Stage {
    fn parse(stage: &Value) -> Result<Self> {
        let map = stage
            .as_object()
            .filter(|m| m.len() == 1)
            .ok_or_else(|| Error::Query("each stage must be an object with one key".to_string()))?;
        let Some((name, spec)) = map.iter().next() else {
            return Err(Error::Query("empty stage".to_string()));
        };

        match name.as_str() {
            "$match" => Ok(Stage::Match(Filter::parse(spec)?)),
            "$unwind" => {
                let path = spec
                    .as_str()
                    .and_then(|p| p.strip_prefix('$'))
                    .ok_or_else(|| Error::Query("$unwind expects a \"$path\" string".to_string()))?;
                Ok(Stage::Unwind(path.to_string()))
            }
            "$group" => Ok(Stage::Group(GroupSpec::parse(spec)?)),
            "$sort" => {
                let keys = spec
                    .as_object()
                    .filter(|m| !m.is_empty())
                    .ok_or_else(|| Error::Query("$sort expects a non-empty object".to_string()))?;
                let keys = keys
                    .iter()
                    .map(|(path, dir)| match dir.as_i64() {
                        Some(1) => Ok((path.clone(), SortDirection::Ascending)),
                        Some(-1) => Ok((path.clone(), SortDirection::Descending)),
                        _ => Err(Error::Query(format!("$sort direction for '{}' must be 1 or -1", path))),
                    })
                    .collect::<Result<_>>()?;
                Ok(Stage::Sort(keys))
            }
            "$limit" => spec
                .as_u64()
                .filter(|n| *n > 0)
                .map(|n| Stage::Limit(n as usize))
                .ok_or_else(|| Error::Query("$limit expects a positive integer".to_string())),
            "$addFields" => {
                let fields = spec
                    .as_object()
                    .ok_or_else(|| Error::Query("$addFields expects an object".to_string()))?;
                let fields = fields
                    .iter()
                    .map(|(path, e)| Ok((path.clone(), Expr::parse(e)?)))
                    .collect::<Result<_>>()?;
                Ok(Stage::AddFields(fields))
            }
            other => Err(Error::Query(format!("unsupported stage {}", other))),
        }
    }

    fn apply(&self, docs: Vec<Value>) -> Vec<Value> {
        match self {
            Stage::Match(filter) => docs.into_iter().filter(|d| filter.matches(d)).collect(),
            Stage::Unwind(path) => unwind(docs, path),
            Stage::Group(spec) => spec.execute(docs),
            Stage::Sort(keys) => {
                let mut docs = docs;
                docs.sort_by(|a, b| compare_by_keys(a, b, keys));
                docs
            }
            Stage::Limit(n) => docs.into_iter().take(*n).collect(),
            Stage::AddFields(fields) => docs
                .into_iter()
                .map(|mut doc| {
                    // Evaluate against the input document, then assign
                    let computed: Vec<Value> = fields.iter().map(|(_, e)| e.evaluate(&doc)).collect();
                    for ((path, _), value) in fields.iter().zip(computed) {
                        set_path(&mut doc, path, value);
                    }
                    doc
                })
                .collect(),
        }
    }
}

fn unwind(docs: Vec<Value>, path: &str) -> Vec<Value> {
    let mut out = Vec::with_capacity(docs.len());
    for doc in docs {
        match lookup(&doc, path) {
            None | Some(Value::Null) => {}
            Some(Value::Array(items)) => {
                let items = items.clone();
                for item in items {
                    let mut copy = doc.clone();
                    set_path(&mut copy, path, item);
                    out.push(copy);
                }
            }
            Some(_) => out.push(doc),
        }
    }
    out
}

fn compare_by_keys(a: &Value, b: &Value, keys: &[(String, SortDirection)]) -> Ordering {
    for (path, direction) in keys {
        let left = lookup(a, path).unwrap_or(&Value::Null);
        let right = lookup(b, path).unwrap_or(&Value::Null);
        let ordering = match direction {
            SortDirection::Ascending => compare_values(left, right),
            SortDirection::Descending => compare_values(right, left),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// A parsed aggregation pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Parse a JSON array of stages
    pub fn from_value(pipeline: &Value) -> Result<Self> {
        let stages = pipeline
            .as_array()
            .ok_or_else(|| Error::Query("pipeline must be an array of stages".to_string()))?
            .iter()
            .map(Stage::parse)
            .collect::<Result<_>>()?;
        Ok(Self { stages })
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Run every stage in order over `docs`
    pub fn execute(&self, docs: Vec<Value>) -> Vec<Value> {
        self.stages.iter().fold(docs, |docs, stage| stage.apply(docs))
    }
}
