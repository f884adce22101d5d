//! Startup index creation.

use std::sync::Arc;

use crate::core::DocumentStore;
use crate::filter::GEOMETRY_FIELD;
use crate::types::{IndexDefinition, IndexKind};

/// Outcome of an index pass. Failures are reported here, never raised.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexReport {
    /// `namespace.index_name` of every index that was created or already present.
    pub created: Vec<String>,
    /// `(namespace.index_name, error message)` for every failed creation.
    pub failed: Vec<(String, String)>,
}

impl IndexReport {
    /// Returns true if every index was created.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    fn merge(&mut self, other: IndexReport) {
        self.created.extend(other.created);
        self.failed.extend(other.failed);
    }
}

/// Index definitions for the collections namespace.
pub fn collection_indexes() -> Vec<IndexDefinition> {
    vec![IndexDefinition::new("id", IndexKind::Ascending).unique()]
}

/// Index definitions for the items namespace.
pub fn item_indexes() -> Vec<IndexDefinition> {
    vec![
        IndexDefinition::new("id", IndexKind::Ascending)
            .and("collection", IndexKind::Ascending)
            .unique(),
        IndexDefinition::new(GEOMETRY_FIELD, IndexKind::Sphere2d),
        IndexDefinition::new("properties.datetime", IndexKind::Ascending),
    ]
}

/// Creates the catalog's indexes. Safe to run repeatedly.
#[derive(Debug, Clone)]
pub struct IndexManager {
    store: Arc<dyn DocumentStore>,
    collections_index: String,
    items_index: String,
}

impl IndexManager {
    /// Creates a manager over the given namespaces.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        collections_index: impl Into<String>,
        items_index: impl Into<String>,
    ) -> Self {
        Self {
            store,
            collections_index: collections_index.into(),
            items_index: items_index.into(),
        }
    }

    /// Ensures the unique index on collection `id`.
    pub async fn ensure_collection_indexes(&self) -> IndexReport {
        self.ensure(&self.collections_index, collection_indexes())
            .await
    }

    /// Ensures the unique `(id, collection)`, geometry and datetime indexes on items.
    pub async fn ensure_item_indexes(&self) -> IndexReport {
        self.ensure(&self.items_index, item_indexes()).await
    }

    /// Ensures every catalog index.
    pub async fn ensure_all(&self) -> IndexReport {
        let mut report = self.ensure_collection_indexes().await;
        report.merge(self.ensure_item_indexes().await);
        report
    }

    async fn ensure(&self, namespace: &str, indexes: Vec<IndexDefinition>) -> IndexReport {
        let mut report = IndexReport::default();
        for index in indexes {
            let name = format!("{}.{}", namespace, index.name());
            match self.store.create_index(namespace, &index).await {
                Ok(()) => report.created.push(name),
                Err(e) => {
                    tracing::error!("Error creating index {} ({}): {}", name, index, e);
                    report.failed.push((name, e.to_string()));
                }
            }
        }
        if report.is_complete() {
            tracing::info!("Indexes created successfully for collection: {}", namespace);
        }
        report
    }
}
