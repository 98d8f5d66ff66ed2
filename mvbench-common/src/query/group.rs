//! `$group` stage
//!
//! Groups are emitted in the order their key was first seen. Keys are
//! compared after numeric normalization, so `1990` and `1990.0` land in the
//! same group.

use super::expr::{single_operator, Expr};
use super::value::{as_number, compare_values, normalize_numbers, number_value};
use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    Sum(Expr),
    Avg(Expr),
    Min(Expr),
    Max(Expr),
}

impl Accumulator {
    fn parse(field: &str, spec: &Value) -> Result<Self> {
        let (op, arg) = spec
            .as_object()
            .and_then(single_operator)
            .ok_or_else(|| Error::Query(format!("$group field '{}' must be an accumulator", field)))?;
        let expr = Expr::parse(arg)?;
        match op {
            "$sum" => Ok(Accumulator::Sum(expr)),
            "$avg" => Ok(Accumulator::Avg(expr)),
            "$min" => Ok(Accumulator::Min(expr)),
            "$max" => Ok(Accumulator::Max(expr)),
            other => Err(Error::Query(format!("unsupported accumulator {}", other))),
        }
    }

    fn expr(&self) -> &Expr {
        match self {
            Accumulator::Sum(e) | Accumulator::Avg(e) | Accumulator::Min(e) | Accumulator::Max(e) => e,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupSpec {
    id: Expr,
    fields: Vec<(String, Accumulator)>,
}

/// Running state of one accumulator in one group
#[derive(Debug, Clone)]
enum AccState {
    Sum(f64),
    Avg { total: f64, count: usize },
    Extreme { best: Option<Value>, keep: Ordering },
}

impl AccState {
    fn new(acc: &Accumulator) -> Self {
        match acc {
            Accumulator::Sum(_) => AccState::Sum(0.0),
            Accumulator::Avg(_) => AccState::Avg { total: 0.0, count: 0 },
            Accumulator::Min(_) => AccState::Extreme { best: None, keep: Ordering::Less },
            Accumulator::Max(_) => AccState::Extreme { best: None, keep: Ordering::Greater },
        }
    }

    fn add(&mut self, value: Value) {
        match self {
            AccState::Sum(total) => {
                if let Some(x) = as_number(&value) {
                    *total += x;
                }
            }
            AccState::Avg { total, count } => {
                if let Some(x) = as_number(&value) {
                    *total += x;
                    *count += 1;
                }
            }
            AccState::Extreme { best, keep } => {
                if value.is_null() {
                    return;
                }
                let replace = match best {
                    None => true,
                    Some(current) => compare_values(&value, current) == *keep,
                };
                if replace {
                    *best = Some(value);
                }
            }
        }
    }

    fn finish(self) -> Value {
        match self {
            AccState::Sum(total) => number_value(total),
            AccState::Avg { count: 0, .. } => Value::Null,
            AccState::Avg { total, count } => number_value(total / count as f64),
            AccState::Extreme { best, .. } => best.unwrap_or(Value::Null),
        }
    }
}

impl GroupSpec {
    pub fn parse(spec: &Value) -> Result<Self> {
        let map = spec
            .as_object()
            .ok_or_else(|| Error::Query("$group expects an object".to_string()))?;
        let id = map
            .get("_id")
            .ok_or_else(|| Error::Query("$group requires an _id".to_string()))?;

        let fields = map
            .iter()
            .filter(|(name, _)| name.as_str() != "_id")
            .map(|(name, acc)| Ok((name.clone(), Accumulator::parse(name, acc)?)))
            .collect::<Result<_>>()?;

        Ok(Self {
            id: Expr::parse(id)?,
            fields,
        })
    }

    pub fn execute(&self, docs: Vec<Value>) -> Vec<Value> {
        let mut groups: Vec<(Value, Vec<AccState>)> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for doc in &docs {
            let key = normalize_numbers(&self.id.evaluate(doc));
            let slot = *index.entry(key.to_string()).or_insert_with(|| {
                let states = self.fields.iter().map(|(_, acc)| AccState::new(acc)).collect();
                groups.push((key.clone(), states));
                groups.len() - 1
            });

            for ((_, acc), state) in self.fields.iter().zip(groups[slot].1.iter_mut()) {
                state.add(acc.expr().evaluate(doc));
            }
        }

        groups
            .into_iter()
            .map(|(key, states)| {
                let mut out = Map::new();
                out.insert("_id".to_string(), key);
                for ((name, _), state) in self.fields.iter().zip(states) {
                    out.insert(name.clone(), state.finish());
                }
                Value::Object(out)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(spec: Value, docs: Vec<Value>) -> Vec<Value> {
        GroupSpec::parse(&spec).unwrap().execute(docs)
    }

    #[test]
    fn test_group_by_path_first_seen_order() {
        let docs = vec![
            json!({"month": 5, "rev": 10}),
            json!({"month": 3, "rev": 20}),
            json!({"month": 5, "rev": 30}),
        ];
        let out = run(
            json!({"_id": "$month", "count": {"$sum": 1}, "avg_rev": {"$avg": "$rev"}}),
            docs,
        );
        assert_eq!(
            out,
            vec![
                json!({"_id": 5, "count": 2, "avg_rev": 20}),
                json!({"_id": 3, "count": 1, "avg_rev": 20}),
            ]
        );
    }

    #[test]
    fn test_group_by_null_single_group() {
        let docs = vec![json!({"x": 1}), json!({"x": 4}), json!({"x": null})];
        let out = run(
            json!({"_id": null, "lo": {"$min": "$x"}, "hi": {"$max": "$x"}, "n": {"$sum": 1}}),
            docs,
        );
        assert_eq!(out, vec![json!({"_id": null, "lo": 1, "hi": 4, "n": 3})]);
    }

    #[test]
    fn test_group_by_object_key_normalizes_numbers() {
        let docs = vec![
            json!({"g": "Drama", "d": 1990}),
            json!({"g": "Drama", "d": 1990.0}),
        ];
        let out = run(json!({"_id": {"genre": "$g", "decade": "$d"}, "n": {"$sum": 1}}), docs);
        assert_eq!(out, vec![json!({"_id": {"genre": "Drama", "decade": 1990}, "n": 2})]);
    }

    #[test]
    fn test_avg_without_numbers_is_null() {
        let out = run(json!({"_id": null, "a": {"$avg": "$missing"}}), vec![json!({})]);
        assert_eq!(out, vec![json!({"_id": null, "a": null})]);
    }

    #[test]
    fn test_rejects_non_accumulator() {
        assert!(GroupSpec::parse(&json!({"_id": null, "x": 1})).is_err());
        assert!(GroupSpec::parse(&json!({"_id": null, "x": {"$push": "$a"}})).is_err());
        assert!(GroupSpec::parse(&json!({"x": {"$sum": 1}})).is_err());
    }
}
