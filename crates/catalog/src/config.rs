//! Catalog configuration.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `MONGO_DB` | admin | Database holding both logical collections |
//! | `STAC_COLLECTIONS_INDEX` | collections | Namespace for collection records |
//! | `STAC_ITEMS_INDEX` | items | Namespace for item records |
//! | `STAC_CREATE_INDEXES` | true | Create indexes during startup |
//! | `STAC_DEFAULT_LIMIT` | 10 | Page size when a search gives none |
//! | `STAC_MAX_LIMIT` | 10000 | Upper bound for requested page sizes |

use serde::{Deserialize, Serialize};

/// Configuration shared by every catalog component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Database name.
    #[serde(default = "default_database")]
    pub database: String,

    /// Namespace holding collection records.
    #[serde(default = "default_collections_index")]
    pub collections_index: String,

    /// Namespace holding item records.
    #[serde(default = "default_items_index")]
    pub items_index: String,

    /// Whether `Catalog::initialize` creates indexes.
    #[serde(default = "default_true")]
    pub create_indexes: bool,

    /// Page size used when a search request has no limit.
    #[serde(default = "default_limit")]
    pub default_limit: u64,

    /// Requested page sizes above this value are clamped.
    #[serde(default = "default_max_limit")]
    pub max_limit: u64,
}

fn default_database() -> String {
    "admin".to_string()
}

fn default_collections_index() -> String {
    "collections".to_string()
}

fn default_items_index() -> String {
    "items".to_string()
}

fn default_true() -> bool {
    true
}

fn default_limit() -> u64 {
    10
}

fn default_max_limit() -> u64 {
    10_000
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            collections_index: default_collections_index(),
            items_index: default_items_index(),
            create_indexes: default_true(),
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

impl CatalogConfig {
    /// Creates a configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            database: lookup("MONGO_DB").unwrap_or_else(default_database),
            collections_index: lookup("STAC_COLLECTIONS_INDEX")
                .unwrap_or_else(default_collections_index),
            items_index: lookup("STAC_ITEMS_INDEX").unwrap_or_else(default_items_index),
            create_indexes: lookup("STAC_CREATE_INDEXES")
                .map(|v| parse_bool(&v))
                .unwrap_or_else(default_true),
            default_limit: lookup("STAC_DEFAULT_LIMIT")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_limit),
            max_limit: lookup("STAC_MAX_LIMIT")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_max_limit),
        }
    }

    /// Sets the collection and item namespaces.
    pub fn with_namespaces(
        mut self,
        collections_index: impl Into<String>,
        items_index: impl Into<String>,
    ) -> Self {
        self.collections_index = collections_index.into();
        self.items_index = items_index.into();
        self
    }

    /// Disables index creation during initialization.
    pub fn without_index_creation(mut self) -> Self {
        self.create_indexes = false;
        self
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.database.is_empty() {
            errors.push("Database name cannot be empty".to_string());
        }

        if self.collections_index.is_empty() || self.items_index.is_empty() {
            errors.push("Namespace names cannot be empty".to_string());
        }

        if self.collections_index == self.items_index {
            errors.push("Collections and items namespaces must differ".to_string());
        }

        if self.default_limit == 0 {
            errors.push("Default limit cannot be 0".to_string());
        }

        if self.default_limit > self.max_limit {
            errors.push("Default limit cannot exceed max limit".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

pub(crate) fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}
