//! Spatial predicate helpers.

use bson::{Bson, Document, doc};
use serde_json::{Value, json};

use crate::error::ValidationError;

/// Storage field holding the record geometry.
pub const GEOMETRY_FIELD: &str = "geometry";

/// Converts a 2D or 3D bbox into a closed GeoJSON polygon.
///
/// A 6-value bbox (`minx, miny, minz, maxx, maxy, maxz`) is reduced to its
/// 2D footprint.
pub fn bbox_to_polygon(bbox: &[f64]) -> Result<Value, ValidationError> {
    let (minx, miny, maxx, maxy) = match *bbox {
        [minx, miny, maxx, maxy] => (minx, miny, maxx, maxy),
        [minx, miny, _, maxx, maxy, _] => (minx, miny, maxx, maxy),
        _ => {
            return Err(ValidationError::InvalidBbox {
                bbox: bbox.to_vec(),
                message: "expected 4 or 6 values".to_string(),
            });
        }
    };

    if bbox.iter().any(|v| !v.is_finite()) {
        return Err(ValidationError::InvalidBbox {
            bbox: bbox.to_vec(),
            message: "values must be finite".to_string(),
        });
    }

    Ok(json!({
        "type": "Polygon",
        "coordinates": [[
            [minx, miny],
            [maxx, miny],
            [maxx, maxy],
            [minx, maxy],
            [minx, miny]
        ]]
    }))
}

/// Builds an intersects predicate on the record geometry.
pub fn intersects_predicate(geometry: &Value) -> Result<Document, ValidationError> {
    let geometry = to_geometry_document(geometry)?;
    Ok(doc! {
        GEOMETRY_FIELD: { "$geoIntersects": { "$geometry": geometry } }
    })
}

fn to_geometry_document(geometry: &Value) -> Result<Document, ValidationError> {
    let invalid = |message: &str| ValidationError::InvalidArguments {
        operator: "s_intersects".to_string(),
        message: message.to_string(),
    };

    let Some(object) = geometry.as_object() else {
        return Err(invalid("geometry must be a GeoJSON object"));
    };
    if !object.get("type").is_some_and(Value::is_string) {
        return Err(invalid("geometry has no type"));
    }
    if !object.contains_key("coordinates") && !object.contains_key("geometries") {
        return Err(invalid("geometry has no coordinates"));
    }

    match bson::to_bson(geometry) {
        Ok(Bson::Document(doc)) => Ok(doc),
        Ok(_) => Err(invalid("geometry must be a GeoJSON object")),
        Err(e) => Err(invalid(&e.to_string())),
    }
}
