//! Collection and item fixtures.

use serde_json::{Map, Value, json};

use helios_catalog::types::{Collection, Item};

/// A collection document with the fields a catalog typically carries.
pub fn collection_json(id: &str) -> Value {
    json!({
        "type": "Collection",
        "id": id,
        "stac_version": "1.0.0",
        "description": format!("Test collection {}", id),
        "license": "proprietary",
        "extent": {
            "spatial": { "bbox": [[-180.0, -90.0, 180.0, 90.0]] },
            "temporal": { "interval": [["2000-01-01T00:00:00Z", null]] }
        },
        "links": []
    })
}

/// A parsed collection fixture.
pub fn collection(id: &str) -> Collection {
    Collection::new(collection_json(id)).unwrap()
}

/// Builder for item fixtures.
#[derive(Debug, Clone)]
pub struct ItemFixture {
    /// Item ID.
    pub id: String,
    /// Parent collection ID.
    pub collection: String,
    /// GeoJSON geometry.
    pub geometry: Value,
    /// Item properties.
    pub properties: Map<String, Value>,
}

impl ItemFixture {
    /// Creates an item with a point geometry and a fixed datetime.
    pub fn new(id: impl Into<String>, collection: impl Into<String>) -> Self {
        let mut properties = Map::new();
        properties.insert("datetime".to_string(), json!("2020-02-12T12:30:22Z"));
        Self {
            id: id.into(),
            collection: collection.into(),
            geometry: json!({ "type": "Point", "coordinates": [0.0, 0.0] }),
            properties,
        }
    }

    /// Places the item at a point.
    pub fn at(mut self, lon: f64, lat: f64) -> Self {
        self.geometry = json!({ "type": "Point", "coordinates": [lon, lat] });
        self
    }

    /// Sets the geometry.
    pub fn with_geometry(mut self, geometry: Value) -> Self {
        self.geometry = geometry;
        self
    }

    /// Sets the acquisition datetime.
    pub fn with_datetime(self, datetime: &str) -> Self {
        self.with_property("datetime", json!(datetime))
    }

    /// Sets a property.
    pub fn with_property(mut self, name: &str, value: Value) -> Self {
        self.properties.insert(name.to_string(), value);
        self
    }

    /// Renders the item document.
    pub fn build(&self) -> Value {
        json!({
            "type": "Feature",
            "stac_version": "1.0.0",
            "id": self.id,
            "collection": self.collection,
            "geometry": self.geometry,
            "properties": self.properties,
            "assets": {},
            "links": []
        })
    }

    /// Renders and parses the item.
    pub fn item(&self) -> Item {
        Item::new(self.build()).unwrap()
    }
}

/// A point item in `collection`.
pub fn item(id: &str, collection: &str) -> Item {
    ItemFixture::new(id, collection).item()
}

/// The item used by the bounding box scenarios, at (152.15, -33.82).
pub fn sydney_item(collection: &str) -> ItemFixture {
    ItemFixture::new("sydney", collection).at(152.15052873427666, -33.82243006904891)
}

/// Returns the `id` fields of a list of item or collection documents.
pub fn ids(records: &[Value]) -> Vec<String> {
    records
        .iter()
        .map(|r| r["id"].as_str().unwrap_or_default().to_string())
        .collect()
}
