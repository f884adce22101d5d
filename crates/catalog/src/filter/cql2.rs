//! CQL2 JSON expression tree.
//!
//! Parses the JSON encoding of a CQL2 filter (`{"op": ..., "args": [...]}`)
//! into an [`Expr`]. Parsing validates structure only; field resolution and
//! value conversion happen in the translator.

use std::fmt;

use serde_json::{Map, Value};

use crate::error::ValidationError;

/// Comparison operators that map one to one onto store operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl ComparisonOp {
    /// Parses a CQL2 comparison symbol.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "=" => Some(ComparisonOp::Eq),
            "!=" | "<>" => Some(ComparisonOp::Ne),
            "<" => Some(ComparisonOp::Lt),
            "<=" => Some(ComparisonOp::Lte),
            ">" => Some(ComparisonOp::Gt),
            ">=" => Some(ComparisonOp::Gte),
            _ => None,
        }
    }

    /// Parses a short operator name as used by the `query` request member.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "eq" => Some(ComparisonOp::Eq),
            "neq" | "ne" => Some(ComparisonOp::Ne),
            "lt" => Some(ComparisonOp::Lt),
            "lte" => Some(ComparisonOp::Lte),
            "gt" => Some(ComparisonOp::Gt),
            "gte" => Some(ComparisonOp::Gte),
            _ => None,
        }
    }

    /// Returns the store operator key.
    pub fn store_operator(self) -> &'static str {
        match self {
            ComparisonOp::Eq => "$eq",
            ComparisonOp::Ne => "$ne",
            ComparisonOp::Lt => "$lt",
            ComparisonOp::Lte => "$lte",
            ComparisonOp::Gt => "$gt",
            ComparisonOp::Gte => "$gte",
        }
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            ComparisonOp::Eq => "=",
            ComparisonOp::Ne => "!=",
            ComparisonOp::Lt => "<",
            ComparisonOp::Lte => "<=",
            ComparisonOp::Gt => ">",
            ComparisonOp::Gte => ">=",
        };
        write!(f, "{}", symbol)
    }
}

/// A parsed CQL2 filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    Comparison {
        op: ComparisonOp,
        property: String,
        value: Value,
    },
    Like {
        property: String,
        pattern: String,
    },
    In {
        property: String,
        values: Vec<Value>,
    },
    Between {
        property: String,
        lower: Value,
        upper: Value,
    },
    Intersects {
        property: String,
        geometry: Value,
    },
}

impl Expr {
    /// Parses a CQL2 JSON expression.
    pub fn parse(value: &Value) -> Result<Self, ValidationError> {
        let Some(object) = value.as_object() else {
            return Err(ValidationError::InvalidArguments {
                operator: "filter".to_string(),
                message: format!("expected an expression object, got {}", value),
            });
        };

        let op = match object.get("op") {
            Some(Value::String(op)) => op.as_str(),
            _ => {
                return Err(ValidationError::InvalidArguments {
                    operator: "filter".to_string(),
                    message: "expression has no 'op'".to_string(),
                });
            }
        };
        let args = args_of(op, object)?;

        match op {
            "and" | "or" => {
                if args.is_empty() {
                    return Err(bad_args(op, "expects at least one argument"));
                }
                let children = args.iter().map(Expr::parse).collect::<Result<Vec<_>, _>>()?;
                Ok(if op == "and" {
                    Expr::And(children)
                } else {
                    Expr::Or(children)
                })
            }
            "not" => {
                let [child] = args else {
                    return Err(bad_args(op, "expects exactly one argument"));
                };
                Ok(Expr::Not(Box::new(Expr::parse(child)?)))
            }
            "like" => {
                let [property, pattern] = args else {
                    return Err(bad_args(op, "expects a property and a pattern"));
                };
                let Value::String(pattern) = pattern else {
                    return Err(bad_args(op, "pattern must be a string"));
                };
                Ok(Expr::Like {
                    property: property_of(op, property)?,
                    pattern: pattern.clone(),
                })
            }
            "in" => {
                let [property, list] = args else {
                    return Err(bad_args(op, "expects a property and a list"));
                };
                let Value::Array(values) = list else {
                    return Err(ValidationError::NotAList {
                        operator: op.to_string(),
                        value: list.to_string(),
                    });
                };
                Ok(Expr::In {
                    property: property_of(op, property)?,
                    values: values.clone(),
                })
            }
            "between" => {
                let (property, lower, upper) = match args {
                    [property, lower, upper] => (property, lower, upper),
                    [property, Value::Array(bounds)] if bounds.len() == 2 => {
                        (property, &bounds[0], &bounds[1])
                    }
                    _ => return Err(bad_args(op, "expects a property, a lower and an upper bound")),
                };
                Ok(Expr::Between {
                    property: property_of(op, property)?,
                    lower: lower.clone(),
                    upper: upper.clone(),
                })
            }
            "s_intersects" => {
                let [property, geometry] = args else {
                    return Err(bad_args(op, "expects a property and a geometry"));
                };
                Ok(Expr::Intersects {
                    property: property_of(op, property)?,
                    geometry: geometry.clone(),
                })
            }
            other => {
                let Some(cmp) = ComparisonOp::from_symbol(other) else {
                    return Err(ValidationError::UnsupportedOperator {
                        operator: other.to_string(),
                        context: "CQL2 filter".to_string(),
                    });
                };
                let [property, value] = args else {
                    return Err(bad_args(other, "expects a property and a value"));
                };
                Ok(Expr::Comparison {
                    op: cmp,
                    property: property_of(other, property)?,
                    value: value.clone(),
                })
            }
        }
    }
}

fn args_of<'a>(op: &str, object: &'a Map<String, Value>) -> Result<&'a [Value], ValidationError> {
    match object.get("args") {
        Some(Value::Array(args)) => Ok(args.as_slice()),
        Some(other) => Err(bad_args(op, &format!("'args' must be a list, got {}", other))),
        None => Err(bad_args(op, "missing 'args'")),
    }
}

fn property_of(op: &str, arg: &Value) -> Result<String, ValidationError> {
    match arg.get("property") {
        Some(Value::String(name)) if !name.is_empty() => Ok(name.clone()),
        _ => Err(bad_args(
            op,
            &format!("first argument must be a property reference, got {}", arg),
        )),
    }
}

fn bad_args(op: &str, message: &str) -> ValidationError {
    ValidationError::InvalidArguments {
        operator: op.to_string(),
        message: message.to_string(),
    }
}
