//! Conversion between public records and stored documents.

use std::fmt::Debug;

use bson::{Bson, Document};
use chrono::SecondsFormat;
use serde_json::{Map, Number, Value};

use crate::error::{BackendError, StorageResult};
use crate::types::{Collection, Item, parse_instant};

/// Internal identity field assigned by the store.
pub const INTERNAL_ID: &str = "_id";

/// The only item field stored as a BSON date.
pub const DATETIME_PATH: &str = "properties.datetime";

/// Maps records to and from their stored representation.
pub trait RecordSerializer: Send + Sync + Debug {
    /// Converts an item into a storable document.
    fn item_to_db(&self, item: &Item) -> StorageResult<Document>;

    /// Converts a stored item document into its public JSON form.
    fn item_from_db(&self, document: Document) -> Value;

    /// Converts a collection into a storable document.
    fn collection_to_db(&self, collection: &Collection) -> StorageResult<Document>;

    /// Converts a stored collection document into its public JSON form.
    fn collection_from_db(&self, document: Document) -> Value;
}

/// The standard serializer.
///
/// Stores `properties.datetime` as a BSON date so range filters and the
/// temporal index work, and renders it back as RFC 3339. The internal `_id`
/// is never exposed.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSerializer;

impl RecordSerializer for DefaultSerializer {
    fn item_to_db(&self, item: &Item) -> StorageResult<Document> {
        let mut document = to_document(item.content())?;
        if let Ok(properties) = document.get_document_mut("properties")
            && let Some(Bson::String(datetime)) = properties.get("datetime")
        {
            let at = parse_instant(datetime)?;
            properties.insert("datetime", Bson::DateTime(bson::DateTime::from_chrono(at)));
        }
        Ok(document)
    }

    fn item_from_db(&self, mut document: Document) -> Value {
        document.remove(INTERNAL_ID);
        serialize_doc(&document)
    }

    fn collection_to_db(&self, collection: &Collection) -> StorageResult<Document> {
        to_document(collection.content())
    }

    fn collection_from_db(&self, mut document: Document) -> Value {
        document.remove(INTERNAL_ID);
        serialize_doc(&document)
    }
}

fn to_document(content: &Value) -> StorageResult<Document> {
    match bson::to_bson(content)? {
        Bson::Document(document) => Ok(document),
        other => Err(BackendError::SerializationError {
            message: format!("expected a document, got {:?}", other.element_type()),
        }
        .into()),
    }
}

/// Renders a stored document as JSON.
///
/// `ObjectId`s become hex strings and dates become RFC 3339 strings; other
/// non-JSON BSON types use their relaxed extended-JSON form.
pub fn serialize_doc(document: &Document) -> Value {
    let mut object = Map::with_capacity(document.len());
    for (key, value) in document {
        object.insert(key.clone(), bson_to_json(value));
    }
    Value::Object(object)
}

fn bson_to_json(value: &Bson) -> Value {
    match value {
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Boolean(b) => Value::Bool(*b),
        Bson::Int32(i) => Value::from(*i),
        Bson::Int64(i) => Value::from(*i),
        Bson::Double(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
        Bson::String(s) => Value::String(s.clone()),
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(dt) => {
            Value::String(dt.to_chrono().to_rfc3339_opts(SecondsFormat::AutoSi, true))
        }
        Bson::Array(values) => Value::Array(values.iter().map(bson_to_json).collect()),
        Bson::Document(document) => serialize_doc(document),
        other => other.clone().into_relaxed_extjson(),
    }
}
