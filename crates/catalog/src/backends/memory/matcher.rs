//! Evaluation of MongoDB query, sort and update documents against in-memory
//! BSON documents.
//!
//! Supports the operator subset the catalog emits: `$and`, `$or`, `$nor`,
//! `$not`, the comparison operators, `$in`, `$nin`, `$exists`, `$regex` with
//! `$options` and `$geoIntersects`. Dotted paths descend into embedded
//! documents and fan out across arrays.

use std::cmp::Ordering;

use bson::{Bson, Document};
use regex::RegexBuilder;

use super::geo::Geometry;

/// Error raised for a filter or update the matcher cannot evaluate.
pub type MatchError = String;

/// Returns true if `document` satisfies `filter`.
pub fn matches(document: &Document, filter: &Document) -> Result<bool, MatchError> {
    for (key, condition) in filter {
        let ok = match key.as_str() {
            "$and" => {
                let mut all = true;
                for clause in clauses(key, condition)? {
                    if !matches(document, clause)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            "$or" => any_clause(document, key, condition)?,
            "$nor" => !any_clause(document, key, condition)?,
            op if op.starts_with('$') => {
                return Err(format!("unknown top-level operator {}", op));
            }
            path => match_field(document, path, condition)?,
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn clauses<'a>(op: &str, condition: &'a Bson) -> Result<Vec<&'a Document>, MatchError> {
    let Bson::Array(values) = condition else {
        return Err(format!("{} argument must be an array", op));
    };
    if values.is_empty() {
        return Err(format!("{} argument must be a non-empty array", op));
    }
    values
        .iter()
        .map(|v| match v {
            Bson::Document(d) => Ok(d),
            other => Err(format!("{} clause {} is not a document", op, other)),
        })
        .collect()
}

fn any_clause(document: &Document, op: &str, condition: &Bson) -> Result<bool, MatchError> {
    for clause in clauses(op, condition)? {
        if matches(document, clause)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Collects every value reachable at a dotted `path`.
pub fn resolve_path<'a>(document: &'a Document, path: &str) -> Vec<&'a Bson> {
    let parts: Vec<&str> = path.split('.').collect();
    let mut out = Vec::new();
    if let Some(value) = document.get(parts[0]) {
        descend(value, &parts[1..], &mut out);
    }
    out
}

fn descend<'a>(value: &'a Bson, parts: &[&str], out: &mut Vec<&'a Bson>) {
    let Some((head, rest)) = parts.split_first() else {
        out.push(value);
        return;
    };
    match value {
        Bson::Document(d) => {
            if let Some(next) = d.get(*head) {
                descend(next, rest, out);
            }
        }
        Bson::Array(items) => {
            if let Ok(position) = head.parse::<usize>() {
                if let Some(next) = items.get(position) {
                    descend(next, rest, out);
                }
            } else {
                for item in items.iter().filter(|i| matches!(i, Bson::Document(_))) {
                    descend(item, parts, out);
                }
            }
        }
        _ => {}
    }
}

/// The values a condition is tested against: each resolved value, plus the
/// elements of resolved arrays.
fn candidates<'a>(values: &[&'a Bson]) -> Vec<&'a Bson> {
    let mut out = Vec::with_capacity(values.len());
    for value in values {
        out.push(*value);
        if let Bson::Array(items) = value {
            out.extend(items.iter());
        }
    }
    out
}

fn is_operator_document(condition: &Bson) -> Option<&Document> {
    match condition {
        Bson::Document(d) if d.keys().next().is_some_and(|k| k.starts_with('$')) => Some(d),
        _ => None,
    }
}

fn match_field(document: &Document, path: &str, condition: &Bson) -> Result<bool, MatchError> {
    let values = resolve_path(document, path);
    match is_operator_document(condition) {
        Some(operators) => match_operators(&values, operators),
        None => Ok(candidates(&values).iter().any(|v| values_equal(v, condition))
            || (values.is_empty() && matches!(condition, Bson::Null))),
    }
}

fn match_operators(values: &[&Bson], operators: &Document) -> Result<bool, MatchError> {
    let candidates = candidates(values);
    for (op, argument) in operators {
        let ok = match op.as_str() {
            "$eq" => equals_any(values, &candidates, argument),
            "$ne" => !equals_any(values, &candidates, argument),
            "$gt" => compare_any(&candidates, argument, |o| o == Ordering::Greater),
            "$gte" => compare_any(&candidates, argument, |o| o != Ordering::Less),
            "$lt" => compare_any(&candidates, argument, |o| o == Ordering::Less),
            "$lte" => compare_any(&candidates, argument, |o| o != Ordering::Greater),
            "$in" => in_list(values, &candidates, op, argument)?,
            "$nin" => !in_list(values, &candidates, op, argument)?,
            "$exists" => !values.is_empty() == truthy(argument),
            "$regex" => {
                let options = operators.get_str("$options").unwrap_or("");
                regex_any(&candidates, argument, options)?
            }
            "$options" => true,
            "$not" => match argument {
                Bson::Document(inner) => !match_operators(values, inner)?,
                other => return Err(format!("$not argument {} is not a document", other)),
            },
            "$geoIntersects" => geo_intersects(&candidates, argument)?,
            other => return Err(format!("unknown operator {}", other)),
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn equals_any(values: &[&Bson], candidates: &[&Bson], argument: &Bson) -> bool {
    if values.is_empty() {
        return matches!(argument, Bson::Null);
    }
    candidates.iter().any(|v| values_equal(v, argument))
}

fn compare_any(candidates: &[&Bson], argument: &Bson, accept: impl Fn(Ordering) -> bool) -> bool {
    candidates
        .iter()
        .filter_map(|v| compare_same_kind(v, argument))
        .any(accept)
}

fn in_list(
    values: &[&Bson],
    candidates: &[&Bson],
    op: &str,
    argument: &Bson,
) -> Result<bool, MatchError> {
    let Bson::Array(options) = argument else {
        return Err(format!("{} needs an array", op));
    };
    Ok(options
        .iter()
        .any(|option| equals_any(values, candidates, option)))
}

fn truthy(value: &Bson) -> bool {
    match value {
        Bson::Boolean(b) => *b,
        Bson::Null => false,
        Bson::Int32(i) => *i != 0,
        Bson::Int64(i) => *i != 0,
        Bson::Double(f) => *f != 0.0,
        _ => true,
    }
}

fn regex_any(candidates: &[&Bson], pattern: &Bson, options: &str) -> Result<bool, MatchError> {
    let (pattern, options) = match pattern {
        Bson::String(s) => (s.as_str(), options),
        Bson::RegularExpression(re) => (re.pattern.as_str(), re.options.as_str()),
        other => return Err(format!("$regex needs a string, got {}", other)),
    };
    let regex = RegexBuilder::new(pattern)
        .case_insensitive(options.contains('i'))
        .multi_line(options.contains('m'))
        .dot_matches_new_line(options.contains('s'))
        .build()
        .map_err(|e| format!("invalid $regex {}: {}", pattern, e))?;
    Ok(candidates
        .iter()
        .any(|v| matches!(v, Bson::String(s) if regex.is_match(s))))
}

fn geo_intersects(candidates: &[&Bson], argument: &Bson) -> Result<bool, MatchError> {
    let query = match argument {
        Bson::Document(d) => match d.get_document("$geometry") {
            Ok(geometry) => Geometry::from_document(geometry)?,
            Err(_) => return Err("$geoIntersects needs a $geometry".to_string()),
        },
        other => return Err(format!("$geoIntersects argument {} is not a document", other)),
    };
    // stored values that are not valid geometries never match
    Ok(candidates.iter().any(|v| match v {
        Bson::Document(d) => Geometry::from_document(d).is_ok_and(|g| g.intersects(&query)),
        _ => false,
    }))
}

fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(i) => Some(f64::from(*i)),
        Bson::Int64(i) => Some(*i as f64),
        Bson::Double(f) => Some(*f),
        _ => None,
    }
}

/// Equality with numeric values compared across integer and double types.
pub fn values_equal(a: &Bson, b: &Bson) -> bool {
    match (as_f64(a), as_f64(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Compares values of the same kind; `None` when the kinds differ.
fn compare_same_kind(a: &Bson, b: &Bson) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (as_f64(a), as_f64(b)) {
        return x.partial_cmp(&y);
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::DateTime(x), Bson::DateTime(y)) => Some(x.cmp(y)),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => Some(x.cmp(y)),
        (Bson::Timestamp(x), Bson::Timestamp(y)) => {
            Some((x.time, x.increment).cmp(&(y.time, y.increment)))
        }
        _ => None,
    }
}

/// Total order across BSON types, following MongoDB's comparison order.
fn type_rank(value: &Bson) -> u8 {
    match value {
        Bson::MinKey => 0,
        Bson::Null | Bson::Undefined => 1,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => 2,
        Bson::String(_) | Bson::Symbol(_) => 3,
        Bson::Document(_) => 4,
        Bson::Array(_) => 5,
        Bson::Binary(_) => 6,
        Bson::ObjectId(_) => 7,
        Bson::Boolean(_) => 8,
        Bson::DateTime(_) => 9,
        Bson::Timestamp(_) => 10,
        Bson::RegularExpression(_) => 11,
        Bson::JavaScriptCode(_) | Bson::JavaScriptCodeWithScope(_) => 12,
        Bson::DbPointer(_) => 13,
        Bson::MaxKey => 14,
    }
}

/// Orders two values for sorting. Missing values sort first.
pub fn compare_values(a: Option<&Bson>, b: Option<&Bson>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => compare_same_kind(x, y)
            .unwrap_or_else(|| type_rank(x).cmp(&type_rank(y)).then_with(|| {
                // same rank, no natural order (documents, arrays): fall back to text
                x.to_string().cmp(&y.to_string())
            })),
    }
}

/// Orders documents by a sort specification (`{field: 1 | -1, ...}`).
pub fn compare_documents(a: &Document, b: &Document, sort: &Document) -> Ordering {
    for (path, direction) in sort {
        let descending = as_f64(direction).is_some_and(|d| d < 0.0);
        let left = resolve_path(a, path).first().copied();
        let right = resolve_path(b, path).first().copied();
        let ordering = compare_values(left, right);
        let ordering = if descending {
            ordering.reverse()
        } else {
            ordering
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Applies an update document of `$set` and `$unset` operators in place.
pub fn apply_update(document: &mut Document, update: &Document) -> Result<(), MatchError> {
    if update.is_empty() {
        return Err("update document is empty".to_string());
    }
    for (op, fields) in update {
        let Bson::Document(fields) = fields else {
            return Err(format!("{} argument must be a document", op));
        };
        match op.as_str() {
            "$set" => {
                for (path, value) in fields {
                    if path == "_id" {
                        return Err("field _id is immutable".to_string());
                    }
                    set_path(document, path, value.clone());
                }
            }
            "$unset" => {
                for (path, _) in fields {
                    unset_path(document, path);
                }
            }
            other => return Err(format!("unsupported update operator {}", other)),
        }
    }
    Ok(())
}

fn set_path(document: &mut Document, path: &str, value: Bson) {
    match path.split_once('.') {
        None => {
            document.insert(path, value);
        }
        Some((head, rest)) => {
            if !matches!(document.get(head), Some(Bson::Document(_))) {
                document.insert(head, Document::new());
            }
            if let Ok(inner) = document.get_document_mut(head) {
                set_path(inner, rest, value);
            }
        }
    }
}

fn unset_path(document: &mut Document, path: &str) {
    match path.split_once('.') {
        None => {
            document.remove(path);
        }
        Some((head, rest)) => {
            if let Ok(inner) = document.get_document_mut(head) {
                unset_path(inner, rest);
            }
        }
    }
}
