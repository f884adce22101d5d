//! Catalog record types.
//!
//! [`Item`] and [`Collection`] wrap the public JSON representation of a
//! catalog record together with its identifying keys. Items are identified by
//! `(id, collection)`, collections by `id`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;

/// A catalog item (a GeoJSON feature belonging to one collection).
///
/// # Examples
///
/// ```
/// use helios_catalog::types::Item;
/// use serde_json::json;
///
/// let item = Item::new(json!({
///     "type": "Feature",
///     "id": "scene-1",
///     "collection": "sentinel-2",
///     "geometry": {"type": "Point", "coordinates": [150.0, -30.0]},
///     "properties": {"datetime": "2020-02-12T12:30:22Z"}
/// }))
/// .unwrap();
///
/// assert_eq!(item.id(), "scene-1");
/// assert_eq!(item.collection(), "sentinel-2");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct Item {
    id: String,
    collection: String,
    content: Value,
}

impl Item {
    /// Wraps JSON content, requiring string `id` and `collection` members.
    pub fn new(content: Value) -> Result<Self, ValidationError> {
        let id = required_string(&content, "id")?;
        let collection = required_string(&content, "collection")?;
        Ok(Self {
            id,
            collection,
            content,
        })
    }

    /// Returns the item id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the id of the owning collection.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Returns the item content.
    pub fn content(&self) -> &Value {
        &self.content
    }

    /// Consumes the item and returns its content.
    pub fn into_content(self) -> Value {
        self.content
    }

    /// Returns a copy of this item with a different id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self.content["id"] = Value::String(self.id.clone());
        self
    }

    /// Returns a copy of this item moved into another collection.
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self.content["collection"] = Value::String(self.collection.clone());
        self
    }

    /// Returns a human-readable key for log and error messages.
    pub fn key(&self) -> String {
        format!("{}/{}", self.collection, self.id)
    }
}

impl TryFrom<Value> for Item {
    type Error = ValidationError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Item> for Value {
    fn from(item: Item) -> Self {
        item.content
    }
}

/// A catalog collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct Collection {
    id: String,
    content: Value,
}

impl Collection {
    /// Wraps JSON content, requiring a string `id` member.
    pub fn new(content: Value) -> Result<Self, ValidationError> {
        let id = required_string(&content, "id")?;
        Ok(Self { id, content })
    }

    /// Returns the collection id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the collection content.
    pub fn content(&self) -> &Value {
        &self.content
    }

    /// Consumes the collection and returns its content.
    pub fn into_content(self) -> Value {
        self.content
    }

    /// Returns a copy of this collection with a different id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self.content["id"] = Value::String(self.id.clone());
        self
    }
}

impl TryFrom<Value> for Collection {
    type Error = ValidationError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Collection> for Value {
    fn from(collection: Collection) -> Self {
        collection.content
    }
}

fn required_string(content: &Value, field: &str) -> Result<String, ValidationError> {
    if !content.is_object() {
        return Err(ValidationError::InvalidRecord {
            message: "record must be a JSON object".to_string(),
        });
    }
    match content.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        _ => Err(ValidationError::MissingRequiredField {
            field: field.to_string(),
        }),
    }
}
