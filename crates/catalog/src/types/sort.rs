//! Sort specifications.

use bson::{Document, doc};
use serde::{Deserialize, Serialize};

/// Direction of a sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SortDirection {
    /// Smallest values first.
    #[default]
    #[serde(rename = "asc")]
    Ascending,
    /// Largest values first.
    #[serde(rename = "desc")]
    Descending,
}

impl SortDirection {
    /// Returns the store's numeric direction (`1` or `-1`).
    pub fn as_i32(self) -> i32 {
        match self {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        }
    }
}

/// A single `(field, direction)` sort key, as supplied by a search request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortBy {
    /// Dotted field path.
    pub field: String,
    /// Sort direction.
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortBy {
    /// Creates an ascending sort key.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    /// Creates a descending sort key.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }
}

/// An ordered list of sort keys.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortSpec(Vec<SortBy>);

impl SortSpec {
    /// Creates an empty sort.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Creates a sort from request sort keys; `None` yields an empty sort.
    pub fn from_sortby(sortby: Option<&[SortBy]>) -> Self {
        Self(sortby.map(<[SortBy]>::to_vec).unwrap_or_default())
    }

    /// Appends a sort key.
    pub fn then(mut self, key: SortBy) -> Self {
        self.0.push(key);
        self
    }

    /// Returns the sort keys in order.
    pub fn keys(&self) -> &[SortBy] {
        &self.0
    }

    /// Returns true if no keys are present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true if the given field is already a sort key.
    pub fn contains(&self, field: &str) -> bool {
        self.0.iter().any(|k| k.field == field)
    }

    /// Appends ascending keys for every listed field not already present.
    pub fn with_tie_breakers(mut self, fields: &[&str]) -> Self {
        for field in fields {
            if !self.contains(field) {
                self.0.push(SortBy::asc(*field));
            }
        }
        self
    }

    /// Renders the sort as a store sort document.
    pub fn to_document(&self) -> Document {
        let mut sort = Document::new();
        for key in &self.0 {
            sort.insert(key.field.clone(), key.direction.as_i32());
        }
        sort
    }
}

impl From<Vec<SortBy>> for SortSpec {
    fn from(keys: Vec<SortBy>) -> Self {
        Self(keys)
    }
}

/// The default ordering for item searches.
pub fn default_item_sort() -> SortSpec {
    SortSpec::new().then(SortBy::asc("id"))
}

/// Sort document for ascending collection listing.
pub(crate) fn collection_listing_sort() -> Document {
    doc! { "id": 1 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sortby_deserialize() {
        let keys: Vec<SortBy> = serde_json::from_str(
            r#"[{"field": "properties.datetime", "direction": "desc"}, {"field": "id"}]"#,
        )
        .unwrap();
        assert_eq!(keys[0], SortBy::desc("properties.datetime"));
        assert_eq!(keys[1], SortBy::asc("id"));
    }

    #[test]
    fn test_tie_breakers_skip_existing_fields() {
        let spec = SortSpec::new()
            .then(SortBy::desc("id"))
            .with_tie_breakers(&["id", "collection"]);
        assert_eq!(spec.keys().len(), 2);
        assert_eq!(spec.keys()[0].direction, SortDirection::Descending);
        assert_eq!(spec.keys()[1], SortBy::asc("collection"));
    }

    #[test]
    fn test_to_document_preserves_order() {
        let spec = SortSpec::new()
            .then(SortBy::desc("properties.datetime"))
            .then(SortBy::asc("id"));
        let doc = spec.to_document();
        let keys: Vec<&String> = doc.keys().collect();
        assert_eq!(keys, vec!["properties.datetime", "id"]);
        assert_eq!(doc.get_i32("properties.datetime").unwrap(), -1);
    }

    #[test]
    fn test_from_sortby_none_is_empty() {
        assert!(SortSpec::from_sortby(None).is_empty());
    }
}
