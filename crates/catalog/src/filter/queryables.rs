//! Queryable aliases and property-path normalization.

use std::collections::HashMap;

/// Top-level record fields that are never moved under `properties`.
const RESERVED_FIELDS: &[&str] = &["id", "collection"];

/// Maps public filter property names to storage field paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryablesMapping {
    aliases: HashMap<String, String>,
}

impl Default for QueryablesMapping {
    fn default() -> Self {
        let aliases = [
            ("id", "id"),
            ("collection", "collection"),
            ("geometry", "geometry"),
            ("datetime", "properties.datetime"),
            ("created", "properties.created"),
            ("updated", "properties.updated"),
            ("cloud_cover", "properties.eo:cloud_cover"),
            (
                "cloud_shadow_percentage",
                "properties.s2:cloud_shadow_percentage",
            ),
            (
                "nodata_pixel_percentage",
                "properties.s2:nodata_pixel_percentage",
            ),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Self { aliases }
    }
}

impl QueryablesMapping {
    /// Creates a mapping with no aliases.
    pub fn empty() -> Self {
        Self {
            aliases: HashMap::new(),
        }
    }

    /// Adds or replaces an alias.
    pub fn with_alias(mut self, name: impl Into<String>, path: impl Into<String>) -> Self {
        self.aliases.insert(name.into(), path.into());
        self
    }

    /// Returns the storage path for an alias, if one is configured.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.aliases.get(name).map(String::as_str)
    }

    /// Resolves a filter property name to its storage field path.
    ///
    /// Aliases win; otherwise reserved and already-namespaced names are kept,
    /// and everything else is placed under `properties.`.
    pub fn resolve(&self, name: &str) -> String {
        if let Some(path) = self.get(name) {
            return path.to_string();
        }
        if RESERVED_FIELDS.contains(&name) || name.starts_with("properties.") {
            name.to_string()
        } else {
            format!("properties.{}", name)
        }
    }
}
