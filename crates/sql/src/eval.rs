//! In-memory evaluation of filter expressions against a single row.
//!
//! Used to check what a rewritten filter admits without a database. SQL
//! three-valued logic applies: comparisons involving `NULL` are unknown, and
//! only rows for which the filter is definitely true match.

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use crate::expr::{Column, Expr, InList, Value};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("subqueries cannot be evaluated in memory: {0}")]
    Subquery(String),

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("function '{name}' expects {expected} arguments, got {got}")]
    Arity {
        name: String,
        expected: usize,
        got: usize,
    },
}

/// A row that can answer column lookups.
pub trait Row {
    /// Value of `column`, or `None` when the row has no such column.
    fn value(&self, column: &Column) -> Option<Value>;

    /// Whether `filter` is definitely true for this row.
    fn matches(&self, filter: &Expr) -> Result<bool, EvalError>
    where
        Self: Sized,
    {
        Ok(truth(self, filter)? == Some(true))
    }
}

fn lookup<'a>(column: &Column, get: impl Fn(&str) -> Option<&'a Value>) -> Option<Value> {
    if let Some(q) = &column.qualifier {
        if let Some(v) = get(&format!("{q}.{}", column.name)) {
            return Some(v.clone());
        }
    }
    get(&column.name).cloned()
}

impl Row for HashMap<String, Value> {
    fn value(&self, column: &Column) -> Option<Value> {
        lookup(column, |k| self.get(k))
    }
}

impl Row for BTreeMap<String, Value> {
    fn value(&self, column: &Column) -> Option<Value> {
        lookup(column, |k| self.get(k))
    }
}

impl Row for serde_json::Map<String, serde_json::Value> {
    fn value(&self, column: &Column) -> Option<Value> {
        let raw = column
            .qualifier
            .as_ref()
            .and_then(|q| self.get(&format!("{q}.{}", column.name)))
            .or_else(|| self.get(&column.name))?;
        Some(match raw {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Str(n.to_string()),
            },
            serde_json::Value::String(s) => Value::Str(s.clone()),
            other => Value::Str(other.to_string()),
        })
    }
}

fn scalar<R: Row>(row: &R, expr: &Expr) -> Result<Value, EvalError> {
    match expr {
        Expr::Column(c) => Ok(row.value(c).unwrap_or(Value::Null)),
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Nested(inner) => scalar(row, inner),
        Expr::Function { name, args } => find_in_set(row, name, args).map(|pos| match pos {
            Some(p) => Value::Int(p),
            None => Value::Null,
        }),
        other => Ok(match truth(row, other)? {
            Some(true) => Value::Int(1),
            Some(false) => Value::Int(0),
            None => Value::Null,
        }),
    }
}

fn compare(left: &Value, right: &Value) -> Option<bool> {
    match (left, right) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::Int(a), Value::Int(b)) => Some(a == b),
        (Value::Str(a), Value::Str(b)) => Some(a == b),
        (Value::Int(a), Value::Str(b)) | (Value::Str(b), Value::Int(a)) => {
            Some(b.trim().parse::<i64>().is_ok_and(|b| b == *a))
        }
    }
}

fn as_text(v: &Value) -> Option<String> {
    match v {
        Value::Int(i) => Some(i.to_string()),
        Value::Str(s) => Some(s.clone()),
        Value::Null => None,
    }
}

/// `FIND_IN_SET(needle, list)`: 1-based position of `needle` in the
/// comma-separated `list`, `0` when absent, `NULL` when either side is `NULL`.
fn find_in_set<R: Row>(row: &R, name: &str, args: &[Expr]) -> Result<Option<i64>, EvalError> {
    if !name.eq_ignore_ascii_case("FIND_IN_SET") {
        return Err(EvalError::UnknownFunction(name.to_string()));
    }
    if args.len() != 2 {
        return Err(EvalError::Arity {
            name: name.to_string(),
            expected: 2,
            got: args.len(),
        });
    }
    let needle = as_text(&scalar(row, &args[0])?);
    let list = as_text(&scalar(row, &args[1])?);
    Ok(match (needle, list) {
        (Some(needle), Some(list)) => Some(
            list.split(',')
                .position(|item| item == needle)
                .map_or(0, |p| p as i64 + 1),
        ),
        _ => None,
    })
}

fn truth<R: Row>(row: &R, expr: &Expr) -> Result<Option<bool>, EvalError> {
    match expr {
        Expr::Column(_) | Expr::Literal(_) | Expr::Function { .. } => {
            Ok(match scalar(row, expr)? {
                Value::Null => None,
                Value::Int(i) => Some(i != 0),
                Value::Str(s) => Some(s.trim().parse::<i64>().is_ok_and(|i| i != 0)),
            })
        }
        Expr::Eq { left, right } => Ok(compare(&scalar(row, left)?, &scalar(row, right)?)),
        Expr::In { expr, list } => {
            let needle = scalar(row, expr)?;
            match list {
                InList::Subquery(sub) => Err(EvalError::Subquery(sub.to_string())),
                InList::Values(values) => {
                    let mut unknown = false;
                    for v in values {
                        match compare(&needle, &scalar(row, v)?) {
                            Some(true) => return Ok(Some(true)),
                            Some(false) => {}
                            None => unknown = true,
                        }
                    }
                    Ok(if unknown { None } else { Some(false) })
                }
            }
        }
        Expr::And { left, right } => {
            let l = truth(row, left)?;
            if l == Some(false) {
                return Ok(Some(false));
            }
            Ok(match (l, truth(row, right)?) {
                (_, Some(false)) => Some(false),
                (Some(true), Some(true)) => Some(true),
                _ => None,
            })
        }
        Expr::Or { left, right } => {
            let l = truth(row, left)?;
            if l == Some(true) {
                return Ok(Some(true));
            }
            Ok(match (l, truth(row, right)?) {
                (_, Some(true)) => Some(true),
                (Some(false), Some(false)) => Some(false),
                _ => None,
            })
        }
        Expr::Nested(inner) => truth(row, inner),
    }
}
