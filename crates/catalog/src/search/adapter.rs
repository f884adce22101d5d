//! Incremental construction of item-search queries.

use bson::{Bson, Document, doc};
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::ValidationError;
use crate::filter::{
    ComparisonOp, FilterTranslator, bbox_to_polygon, comparison, comparison_literal,
    intersects_predicate,
};
use crate::serializer::DATETIME_PATH;
use crate::types::{DatetimeFilter, SortBy, SortSpec};

/// Accumulates a conjunction of query fragments and an optional sort.
///
/// Builder calls only ever append. The adapter is owned by a single search
/// call and discarded once executed.
///
/// # Examples
///
/// ```
/// use helios_catalog::search::SearchAdapter;
///
/// let adapter = SearchAdapter::new()
///     .by_collections(&["sentinel-2".to_string()])
///     .by_bbox(&[100.0, -50.0, 170.0, -20.0])
///     .unwrap();
///
/// assert_eq!(adapter.filters().len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SearchAdapter {
    filters: Vec<Document>,
    sort: SortSpec,
    translator: FilterTranslator,
}

impl SearchAdapter {
    /// Creates an empty adapter with the default queryables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty adapter that translates CQL2 with the given translator.
    pub fn with_translator(translator: FilterTranslator) -> Self {
        Self {
            translator,
            ..Self::default()
        }
    }

    /// Appends a raw query fragment.
    pub fn add_filter(mut self, condition: Document) -> Self {
        self.filters.push(condition);
        self
    }

    /// Matches items whose id is in `ids`.
    pub fn by_ids(self, ids: &[String]) -> Self {
        self.add_filter(doc! { "id": { "$in": ids.to_vec() } })
    }

    /// Matches items belonging to any of `collection_ids`.
    pub fn by_collections(self, collection_ids: &[String]) -> Self {
        self.add_filter(doc! { "collection": { "$in": collection_ids.to_vec() } })
    }

    /// Matches an exact datetime, or an inclusive range when `eq` is unset.
    pub fn by_datetime(self, datetime: &DatetimeFilter) -> Self {
        let date = |at: DateTime<Utc>| Bson::DateTime(bson::DateTime::from_chrono(at));

        if let Some(eq) = datetime.eq {
            return self.add_filter(doc! { DATETIME_PATH: date(eq) });
        }

        let mut adapter = self;
        if let Some(gte) = datetime.gte {
            adapter = adapter.add_filter(doc! { DATETIME_PATH: { "$gte": date(gte) } });
        }
        if let Some(lte) = datetime.lte {
            adapter = adapter.add_filter(doc! { DATETIME_PATH: { "$lte": date(lte) } });
        }
        adapter
    }

    /// Matches items whose geometry intersects the bounding box.
    pub fn by_bbox(self, bbox: &[f64]) -> Result<Self, ValidationError> {
        let polygon = bbox_to_polygon(bbox)?;
        self.by_geometry(&polygon)
    }

    /// Matches items whose geometry intersects `geometry`.
    pub fn by_geometry(self, geometry: &Value) -> Result<Self, ValidationError> {
        Ok(self.add_filter(intersects_predicate(geometry)?))
    }

    /// Adds a single comparison.
    ///
    /// `field` may use `__` as the path separator (`properties__gsd`).
    pub fn by_field_op(self, op: &str, field: &str, value: &Value) -> Result<Self, ValidationError> {
        let Some(cmp) = ComparisonOp::from_name(op) else {
            return Err(ValidationError::UnsupportedOperator {
                operator: op.to_string(),
                context: format!("query on field {}", field),
            });
        };
        let path = field.replace("__", ".");
        let value = comparison_literal(&path, value, op)?;
        Ok(self.add_filter(comparison(&path, cmp, value)))
    }

    /// Translates and appends a CQL2 filter; `None` is a no-op.
    pub fn by_cql2(self, filter: Option<&Value>) -> Result<Self, ValidationError> {
        match filter {
            Some(filter) => {
                let condition = self.translator.translate(filter)?;
                Ok(self.add_filter(condition))
            }
            None => Ok(self),
        }
    }

    /// Sets the requested sort. `None` or an empty list clears it.
    pub fn set_sort(mut self, sortby: Option<&[SortBy]>) -> Self {
        self.sort = SortSpec::from_sortby(sortby);
        self
    }

    /// Returns the accumulated fragments.
    pub fn filters(&self) -> &[Document] {
        &self.filters
    }

    /// Returns the requested sort.
    pub fn sort(&self) -> &SortSpec {
        &self.sort
    }

    /// Returns the conjunction of all fragments (`{}` when empty).
    pub fn to_query(&self) -> Document {
        if self.filters.is_empty() {
            Document::new()
        } else {
            doc! { "$and": self.filters.clone() }
        }
    }
}
