//! Upstream search request model.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;
use crate::types::SortBy;

/// Structured item-search criteria as received from the request layer.
///
/// All members are optional; an empty request matches every item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Item ids to match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<String>>,

    /// Collection ids to search in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collections: Option<Vec<String>>,

    /// Bounding box, 4 or 6 numbers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Vec<f64>>,

    /// Datetime instant or interval (`a/b`, `../b`, `a/..`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datetime: Option<String>,

    /// GeoJSON geometry that results must intersect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intersects: Option<Value>,

    /// Per-property comparisons: `{"eo:cloud_cover": {"lt": 10}}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<BTreeMap<String, BTreeMap<String, Value>>>,

    /// CQL2 JSON filter expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,

    /// Requested ordering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sortby: Option<Vec<SortBy>>,

    /// Requested page size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,

    /// Continuation token from a previous page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl SearchRequest {
    /// Creates an empty request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts to the given item ids.
    pub fn with_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    /// Restricts to the given collections.
    pub fn with_collections<I, S>(mut self, collections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.collections = Some(collections.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the bounding box.
    pub fn with_bbox(mut self, bbox: Vec<f64>) -> Self {
        self.bbox = Some(bbox);
        self
    }

    /// Sets the datetime instant or interval.
    pub fn with_datetime(mut self, datetime: impl Into<String>) -> Self {
        self.datetime = Some(datetime.into());
        self
    }

    /// Sets the intersecting geometry.
    pub fn with_intersects(mut self, geometry: Value) -> Self {
        self.intersects = Some(geometry);
        self
    }

    /// Adds a per-property comparison.
    pub fn with_query(mut self, field: impl Into<String>, op: impl Into<String>, value: Value) -> Self {
        self.query
            .get_or_insert_with(BTreeMap::new)
            .entry(field.into())
            .or_default()
            .insert(op.into(), value);
        self
    }

    /// Sets the CQL2 filter.
    pub fn with_filter(mut self, filter: Value) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Sets the ordering.
    pub fn with_sortby(mut self, sortby: Vec<SortBy>) -> Self {
        self.sortby = Some(sortby);
        self
    }

    /// Sets the page size.
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the continuation token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

/// A parsed datetime instant or interval.
///
/// An instant sets only `eq`; an interval sets `gte` and/or `lte`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DatetimeFilter {
    /// Exact instant.
    pub eq: Option<DateTime<Utc>>,
    /// Inclusive lower bound.
    pub gte: Option<DateTime<Utc>>,
    /// Inclusive upper bound.
    pub lte: Option<DateTime<Utc>>,
}

impl DatetimeFilter {
    /// Creates an exact-instant filter.
    pub fn instant(at: DateTime<Utc>) -> Self {
        Self {
            eq: Some(at),
            ..Self::default()
        }
    }

    /// Creates a closed or half-open range filter.
    pub fn range(gte: Option<DateTime<Utc>>, lte: Option<DateTime<Utc>>) -> Self {
        Self { eq: None, gte, lte }
    }

    /// Parses `instant`, `start/end`, `../end` or `start/..`.
    ///
    /// `../..` is open at both ends and yields an empty filter.
    /// Values are RFC 3339 (a missing offset is taken as UTC) or plain
    /// `YYYY-MM-DD` dates, and are normalized to UTC.
    pub fn parse(interval: &str) -> Result<Self, ValidationError> {
        let interval = interval.trim();
        if interval.is_empty() {
            return Err(invalid_datetime(interval, "empty datetime"));
        }

        let Some((start, end)) = interval.split_once('/') else {
            return Ok(Self::instant(parse_instant(interval)?));
        };

        let gte = parse_bound(start)?;
        let lte = parse_bound(end)?;
        if let (Some(s), Some(e)) = (gte, lte)
            && s > e
        {
            return Err(invalid_datetime(interval, "start is after end"));
        }
        Ok(Self::range(gte, lte))
    }

    /// Returns true if no bound is set.
    pub fn is_empty(&self) -> bool {
        self.eq.is_none() && self.gte.is_none() && self.lte.is_none()
    }
}

fn parse_bound(value: &str) -> Result<Option<DateTime<Utc>>, ValidationError> {
    let value = value.trim();
    if value.is_empty() || value == ".." {
        return Ok(None);
    }
    parse_instant(value).map(Some)
}

/// Parses a single datetime value into UTC.
pub(crate) fn parse_instant(value: &str) -> Result<DateTime<Utc>, ValidationError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        && let Some(midnight) = date.and_hms_opt(0, 0, 0)
    {
        return Ok(midnight.and_utc());
    }
    Err(invalid_datetime(value, "expected RFC 3339 or YYYY-MM-DD"))
}

fn invalid_datetime(value: &str, message: &str) -> ValidationError {
    ValidationError::InvalidDatetime {
        value: value.to_string(),
        message: message.to_string(),
    }
}
