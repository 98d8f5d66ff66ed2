//! `$match` filters
//!
//! A filter is a conjunction of per-field conditions. When the field holds
//! an array, a condition matches if the whole array or any element
//! satisfies it. Range operators only compare values of the same type
//! bracket, so `{"$gt": 0}` never matches a string.

use super::value::{compare_values, lookup, same_type, values_equal};
use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq)]
pub enum Operator {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    In(Vec<Value>),
    Exists(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldCondition {
    pub path: String,
    pub operators: Vec<Operator>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<FieldCondition>,
}

impl Filter {
    pub fn parse(spec: &Value) -> Result<Self> {
        let map = spec
            .as_object()
            .ok_or_else(|| Error::Query("$match expects an object".to_string()))?;

        let conditions = map
            .iter()
            .map(|(path, condition)| {
                if path.starts_with('$') {
                    return Err(Error::Query(format!("unsupported $match operator {}", path)));
                }
                Ok(FieldCondition {
                    path: path.clone(),
                    operators: parse_condition(condition)?,
                })
            })
            .collect::<Result<_>>()?;

        Ok(Self { conditions })
    }

    pub fn conditions(&self) -> &[FieldCondition] {
        &self.conditions
    }

    pub fn matches(&self, doc: &Value) -> bool {
        self.conditions.iter().all(|condition| {
            let field = lookup(doc, &condition.path);
            condition.operators.iter().all(|op| op_matches(op, field))
        })
    }
}

fn parse_condition(condition: &Value) -> Result<Vec<Operator>> {
    let Some(map) = condition.as_object().filter(|m| is_operator_object(m)) else {
        return Ok(vec![Operator::Eq(condition.clone())]);
    };

    map.iter()
        .map(|(op, operand)| match op.as_str() {
            "$eq" => Ok(Operator::Eq(operand.clone())),
            "$ne" => Ok(Operator::Ne(operand.clone())),
            "$gt" => Ok(Operator::Gt(operand.clone())),
            "$gte" => Ok(Operator::Gte(operand.clone())),
            "$lt" => Ok(Operator::Lt(operand.clone())),
            "$lte" => Ok(Operator::Lte(operand.clone())),
            "$in" => operand
                .as_array()
                .map(|items| Operator::In(items.clone()))
                .ok_or_else(|| Error::Query("$in expects an array".to_string())),
            "$exists" => Ok(Operator::Exists(truthy(operand))),
            other => Err(Error::Query(format!("unsupported $match operator {}", other))),
        })
        .collect()
}

fn is_operator_object(map: &Map<String, Value>) -> bool {
    !map.is_empty() && map.keys().all(|k| k.starts_with('$'))
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Null => false,
        _ => true,
    }
}

/// Candidate values for a field: the value itself plus array elements
fn candidates(field: Option<&Value>) -> Vec<&Value> {
    match field {
        None => Vec::new(),
        Some(value @ Value::Array(items)) => {
            let mut all = Vec::with_capacity(items.len() + 1);
            all.push(value);
            all.extend(items.iter());
            all
        }
        Some(value) => vec![value],
    }
}

fn equals(field: Option<&Value>, operand: &Value) -> bool {
    match field {
        // Missing fields equal null
        None => operand.is_null(),
        Some(_) => candidates(field).into_iter().any(|v| values_equal(v, operand)),
    }
}

fn ranged(field: Option<&Value>, operand: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    candidates(field)
        .into_iter()
        .any(|v| same_type(v, operand) && accept(compare_values(v, operand)))
}

fn op_matches(op: &Operator, field: Option<&Value>) -> bool {
    match op {
        Operator::Eq(operand) => equals(field, operand),
        Operator::Ne(operand) => !equals(field, operand),
        Operator::Gt(operand) => ranged(field, operand, |o| o == Ordering::Greater),
        Operator::Gte(operand) => ranged(field, operand, |o| o != Ordering::Less),
        Operator::Lt(operand) => ranged(field, operand, |o| o == Ordering::Less),
        Operator::Lte(operand) => ranged(field, operand, |o| o != Ordering::Greater),
        Operator::In(options) => options.iter().any(|operand| equals(field, operand)),
        Operator::Exists(expected) => field.is_some() == *expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn matches(spec: Value, doc: Value) -> bool {
        Filter::parse(&spec).unwrap().matches(&doc)
    }

    #[test]
    fn test_implicit_equality() {
        let doc = json!({"financial": {"budget_category": "blockbuster"}});
        assert!(matches(json!({"financial.budget_category": "blockbuster"}), doc.clone()));
        assert!(!matches(json!({"financial.budget_category": "low"}), doc));
    }

    #[test]
    fn test_range_operators() {
        let doc = json!({"financial": {"budget": 50_000_000, "revenue": 0}});
        assert!(matches(json!({"financial.budget": {"$gte": 50_000_000}}), doc.clone()));
        assert!(!matches(json!({"financial.budget": {"$gt": 50_000_000}}), doc.clone()));
        assert!(!matches(json!({"financial.revenue": {"$gt": 0}}), doc.clone()));
        assert!(matches(
            json!({"financial.budget": {"$gte": 10, "$lt": 100_000_000}}),
            doc
        ));
    }

    #[test]
    fn test_range_ignores_other_types() {
        assert!(!matches(json!({"x": {"$gt": 0}}), json!({"x": "abc"})));
        assert!(!matches(json!({"x": {"$gt": 0}}), json!({})));
    }

    #[test]
    fn test_in_operator() {
        let spec = json!({"tier": {"$in": ["high", "blockbuster"]}});
        assert!(matches(spec.clone(), json!({"tier": "high"})));
        assert!(!matches(spec, json!({"tier": "medium"})));
    }

    #[test]
    fn test_array_any_element() {
        let doc = json!({"genres": ["Action", "Drama"]});
        assert!(matches(json!({"genres": "Drama"}), doc.clone()));
        assert!(matches(json!({"genres": {"$ne": []}}), doc.clone()));
        assert!(!matches(json!({"genres": {"$ne": "Drama"}}), doc));
        assert!(matches(json!({"genres": {"$ne": []}}), json!({"genres": ["X"]})));
        assert!(!matches(json!({"genres": {"$ne": []}}), json!({"genres": []})));
    }

    #[test]
    fn test_exists_and_missing_equals_null() {
        assert!(matches(json!({"a": {"$exists": true}}), json!({"a": null})));
        assert!(matches(json!({"a": {"$exists": false}}), json!({})));
        assert!(matches(json!({"a": null}), json!({})));
    }

    #[test]
    fn test_unsupported_operator() {
        assert!(Filter::parse(&json!({"a": {"$regex": "x"}})).is_err());
        assert!(Filter::parse(&json!({"$or": []})).is_err());
    }
}
