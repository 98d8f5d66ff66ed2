//! Aggregation expressions
//!
//! Supported forms:
//! - `"$a.b"`: field path
//! - literals (numbers, strings, booleans, null)
//! - `[e1, e2]`: array of expressions
//! - `{"name": expr, ...}`: object of named expressions
//! - operators: `$add`, `$subtract`, `$multiply`, `$divide`, `$floor`,
//!   `$sortArray`
//!
//! Arithmetic over a null or missing operand yields null. Division by zero
//! yields null instead of failing the pipeline.

use super::value::{as_number, compare_values, lookup, number_value};
use crate::error::{Error, Result};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Path(String),
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    Add(Vec<Expr>),
    Subtract(Box<Expr>, Box<Expr>),
    Multiply(Vec<Expr>),
    Divide(Box<Expr>, Box<Expr>),
    Floor(Box<Expr>),
    SortArray { input: Box<Expr>, descending: bool },
}

impl Expr {
    pub fn parse(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) if s.starts_with('$') => Ok(Expr::Path(s[1..].to_string())),
            Value::Array(items) => Ok(Expr::Array(
                items.iter().map(Expr::parse).collect::<Result<_>>()?,
            )),
            Value::Object(map) => match single_operator(map) {
                Some((op, args)) => parse_operator(op, args),
                None => Ok(Expr::Object(
                    map.iter()
                        .map(|(k, v)| Ok((k.clone(), Expr::parse(v)?)))
                        .collect::<Result<_>>()?,
                )),
            },
            other => Ok(Expr::Literal(other.clone())),
        }
    }

    pub fn evaluate(&self, doc: &Value) -> Value {
        match self {
            Expr::Literal(v) => v.clone(),
            Expr::Path(path) => lookup(doc, path).cloned().unwrap_or(Value::Null),
            Expr::Array(items) => Value::Array(items.iter().map(|e| e.evaluate(doc)).collect()),
            Expr::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, e)| (k.clone(), e.evaluate(doc)))
                    .collect::<Map<_, _>>(),
            ),
            Expr::Add(args) => fold_numbers(args, doc, 0.0, |acc, x| acc + x),
            Expr::Multiply(args) => fold_numbers(args, doc, 1.0, |acc, x| acc * x),
            Expr::Subtract(a, b) => match (numeric(a, doc), numeric(b, doc)) {
                (Some(x), Some(y)) => number_value(x - y),
                _ => Value::Null,
            },
            Expr::Divide(a, b) => match (numeric(a, doc), numeric(b, doc)) {
                (Some(_), Some(y)) if y == 0.0 => Value::Null,
                (Some(x), Some(y)) => number_value(x / y),
                _ => Value::Null,
            },
            Expr::Floor(a) => match numeric(a, doc) {
                Some(x) => number_value(x.floor()),
                None => Value::Null,
            },
            Expr::SortArray { input, descending } => match input.evaluate(doc) {
                Value::Array(mut items) => {
                    items.sort_by(|x, y| {
                        let ordering = compare_values(x, y);
                        if *descending {
                            ordering.reverse()
                        } else {
                            ordering
                        }
                    });
                    Value::Array(items)
                }
                _ => Value::Null,
            },
        }
    }
}

/// `{"$op": args}` with exactly one `$`-prefixed key
pub(crate) fn single_operator(map: &Map<String, Value>) -> Option<(&str, &Value)> {
    if map.len() != 1 {
        return None;
    }
    map.iter()
        .next()
        .filter(|(k, _)| k.starts_with('$'))
        .map(|(k, v)| (k.as_str(), v))
}

fn parse_operator(op: &str, args: &Value) -> Result<Expr> {
    match op {
        "$add" => Ok(Expr::Add(parse_args(op, args)?)),
        "$multiply" => Ok(Expr::Multiply(parse_args(op, args)?)),
        "$subtract" => {
            let (a, b) = parse_binary(op, args)?;
            Ok(Expr::Subtract(Box::new(a), Box::new(b)))
        }
        "$divide" => {
            let (a, b) = parse_binary(op, args)?;
            Ok(Expr::Divide(Box::new(a), Box::new(b)))
        }
        "$floor" => {
            let inner = match args {
                Value::Array(items) if items.len() == 1 => &items[0],
                other => other,
            };
            Ok(Expr::Floor(Box::new(Expr::parse(inner)?)))
        }
        "$sortArray" => {
            let spec = args
                .as_object()
                .ok_or_else(|| Error::Query("$sortArray expects an object".to_string()))?;
            let input = spec
                .get("input")
                .ok_or_else(|| Error::Query("$sortArray requires 'input'".to_string()))?;
            let descending = match spec.get("sortBy").and_then(Value::as_i64) {
                Some(1) => false,
                Some(-1) => true,
                _ => {
                    return Err(Error::Query(
                        "$sortArray 'sortBy' must be 1 or -1".to_string(),
                    ))
                }
            };
            Ok(Expr::SortArray {
                input: Box::new(Expr::parse(input)?),
                descending,
            })
        }
        other => Err(Error::Query(format!("unsupported expression operator {}", other))),
    }
}

fn parse_args(op: &str, args: &Value) -> Result<Vec<Expr>> {
    args.as_array()
        .ok_or_else(|| Error::Query(format!("{} expects an array of arguments", op)))?
        .iter()
        .map(Expr::parse)
        .collect()
}

fn parse_binary(op: &str, args: &Value) -> Result<(Expr, Expr)> {
    let mut parsed = parse_args(op, args)?;
    if parsed.len() != 2 {
        return Err(Error::Query(format!("{} expects exactly two arguments", op)));
    }
    let second = parsed.pop();
    let first = parsed.pop();
    match (first, second) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(Error::Query(format!("{} expects exactly two arguments", op))),
    }
}

fn numeric(expr: &Expr, doc: &Value) -> Option<f64> {
    as_number(&expr.evaluate(doc))
}

fn fold_numbers(args: &[Expr], doc: &Value, init: f64, op: impl Fn(f64, f64) -> f64) -> Value {
    let mut acc = init;
    for arg in args {
        match numeric(arg, doc) {
            Some(x) => acc = op(acc, x),
            None => return Value::Null,
        }
    }
    number_value(acc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn eval(expr: Value, doc: Value) -> Value {
        Expr::parse(&expr).unwrap().evaluate(&doc)
    }

    #[test]
    fn test_profit_and_roi_expressions() {
        let doc = json!({"financial": {"budget": 1000, "revenue": 3000}});

        assert_eq!(
            eval(json!({"$subtract": ["$financial.revenue", "$financial.budget"]}), doc.clone()),
            json!(2000)
        );
        assert_eq!(
            eval(
                json!({"$multiply": [{"$divide": [{"$subtract": ["$financial.revenue", "$financial.budget"]}, "$financial.budget"]}, 100]}),
                doc
            ),
            json!(200)
        );
    }

    #[test]
    fn test_decade_expression() {
        let doc = json!({"year": 1999});
        let decade = json!({"$multiply": [{"$floor": {"$divide": ["$year", 10]}}, 10]});
        assert_eq!(eval(decade, doc), json!(1990));
    }

    #[test]
    fn test_null_propagation_and_divide_by_zero() {
        assert_eq!(eval(json!({"$add": ["$missing", 1]}), json!({})), Value::Null);
        assert_eq!(eval(json!({"$divide": [5, 0]}), json!({})), Value::Null);
    }

    #[test]
    fn test_sort_array() {
        let doc = json!({"genres": ["Drama", "Action", "Comedy"]});
        assert_eq!(
            eval(json!({"$sortArray": {"input": "$genres", "sortBy": 1}}), doc.clone()),
            json!(["Action", "Comedy", "Drama"])
        );
        assert_eq!(
            eval(json!({"$sortArray": {"input": "$genres", "sortBy": -1}}), doc),
            json!(["Drama", "Comedy", "Action"])
        );
    }

    #[test]
    fn test_object_expression() {
        let doc = json!({"g": "Drama", "d": 1990});
        assert_eq!(
            eval(json!({"genre": "$g", "decade": "$d"}), doc),
            json!({"genre": "Drama", "decade": 1990})
        );
    }

    #[test]
    fn test_unknown_operator_rejected() {
        assert!(matches!(
            Expr::parse(&json!({"$concat": ["a", "b"]})),
            Err(Error::Query(_))
        ));
    }
}
