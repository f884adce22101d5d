//! CQL2 to store-query translation.

use bson::{Bson, Document, doc};
use serde_json::Value;

use crate::error::ValidationError;
use crate::filter::cql2::{ComparisonOp, Expr};
use crate::filter::geometry::intersects_predicate;
use crate::filter::like::like_to_regex;
use crate::filter::queryables::QueryablesMapping;
use crate::serializer::DATETIME_PATH;
use crate::types::parse_instant;

/// Translates CQL2 filter expressions into store query documents.
///
/// # Examples
///
/// ```
/// use helios_catalog::filter::FilterTranslator;
/// use serde_json::json;
///
/// let translator = FilterTranslator::default();
/// let query = translator
///     .translate(&json!({"op": "<=", "args": [{"property": "cloud_cover"}, "12.5"]}))
///     .unwrap();
///
/// let condition = query.get_document("properties.eo:cloud_cover").unwrap();
/// assert_eq!(condition.get_f64("$lte").unwrap(), 12.5);
/// ```
#[derive(Debug, Clone, Default)]
pub struct FilterTranslator {
    queryables: QueryablesMapping,
}

impl FilterTranslator {
    /// Creates a translator with the given queryable aliases.
    pub fn new(queryables: QueryablesMapping) -> Self {
        Self { queryables }
    }

    /// Returns the queryable aliases in use.
    pub fn queryables(&self) -> &QueryablesMapping {
        &self.queryables
    }

    /// Parses and translates a CQL2 JSON filter.
    pub fn translate(&self, filter: &Value) -> Result<Document, ValidationError> {
        let expr = Expr::parse(filter)?;
        let query = self.translate_expr(&expr)?;
        tracing::debug!("Translated CQL2 filter: {}", query);
        Ok(query)
    }

    /// Translates an already parsed expression.
    pub fn translate_expr(&self, expr: &Expr) -> Result<Document, ValidationError> {
        match expr {
            Expr::And(children) => Ok(doc! { "$and": self.translate_all(children)? }),
            Expr::Or(children) => Ok(doc! { "$or": self.translate_all(children)? }),
            Expr::Not(child) => Ok(doc! { "$nor": [self.translate_expr(child)?] }),
            Expr::Comparison {
                op,
                property,
                value,
            } => {
                let path = self.queryables.resolve(property);
                let value = comparison_literal(&path, value, &op.to_string())?;
                Ok(comparison(&path, *op, value))
            }
            Expr::Like { property, pattern } => Ok(doc! {
                self.queryables.resolve(property): {
                    "$regex": like_to_regex(pattern),
                    "$options": "i",
                }
            }),
            Expr::In { property, values } => {
                let path = self.queryables.resolve(property);
                let values = values
                    .iter()
                    .map(|v| to_bson(&path, v, "in"))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(doc! { path: { "$in": values } })
            }
            Expr::Between {
                property,
                lower,
                upper,
            } => {
                let path = self.queryables.resolve(property);
                let lower = to_bson(&path, lower, "between")?;
                let upper = to_bson(&path, upper, "between")?;
                Ok(doc! { path: { "$gte": lower, "$lte": upper } })
            }
            Expr::Intersects { geometry, .. } => intersects_predicate(geometry),
        }
    }

    fn translate_all(&self, children: &[Expr]) -> Result<Vec<Document>, ValidationError> {
        children.iter().map(|c| self.translate_expr(c)).collect()
    }
}

/// Builds `{path: {op: value}}`.
pub(crate) fn comparison(path: &str, op: ComparisonOp, value: Bson) -> Document {
    let mut condition = Document::new();
    condition.insert(op.store_operator(), value);
    let mut query = Document::new();
    query.insert(path, condition);
    query
}

/// Coerces numeric strings: a float if the string contains `.`, otherwise an
/// integer. Non-numeric strings and other values are returned unchanged.
pub fn coerce_numeric(value: &Value) -> Value {
    let Value::String(s) = value else {
        return value.clone();
    };
    let trimmed = s.trim();
    if trimmed.contains('.') {
        if let Ok(f) = trimmed.parse::<f64>()
            && let Some(n) = serde_json::Number::from_f64(f)
        {
            return Value::Number(n);
        }
    } else if let Ok(i) = trimmed.parse::<i64>() {
        return Value::from(i);
    }
    value.clone()
}

/// Converts a comparison literal for the field at `path`.
///
/// Numeric strings are coerced except against [`DATETIME_PATH`], where strings
/// are instants.
pub(crate) fn comparison_literal(
    path: &str,
    value: &Value,
    operator: &str,
) -> Result<Bson, ValidationError> {
    if path == DATETIME_PATH {
        to_bson(path, value, operator)
    } else {
        to_bson(path, &coerce_numeric(value), operator)
    }
}

/// Converts a filter literal for the field at `path` to BSON.
///
/// Against [`DATETIME_PATH`], which is stored as a BSON date, strings and CQL2
/// temporal literals (`{"timestamp": ...}`, `{"date": ...}`) become dates.
/// Other fields hold datetimes as strings, so temporal literals keep their
/// string form there.
pub(crate) fn to_bson(path: &str, value: &Value, operator: &str) -> Result<Bson, ValidationError> {
    let instant = temporal_literal(value);
    if path == DATETIME_PATH {
        let instant = match value {
            Value::String(s) => Some(s.as_str()),
            _ => instant,
        };
        if let Some(instant) = instant {
            let at = parse_instant(instant)?;
            return Ok(Bson::DateTime(bson::DateTime::from_chrono(at)));
        }
    } else if let Some(instant) = instant {
        return Ok(Bson::String(instant.to_string()));
    }

    bson::to_bson(value).map_err(|e| ValidationError::InvalidArguments {
        operator: operator.to_string(),
        message: e.to_string(),
    })
}

fn temporal_literal(value: &Value) -> Option<&str> {
    let Value::Object(object) = value else {
        return None;
    };
    if object.len() != 1 {
        return None;
    }
    object
        .get("timestamp")
        .or_else(|| object.get("date"))
        .and_then(Value::as_str)
}
