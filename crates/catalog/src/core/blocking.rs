//! Blocking access to a [`Catalog`].

use serde_json::Value;

use crate::core::{Catalog, IndexReport};
use crate::error::{BackendError, StorageResult};
use crate::types::{Collection, CollectionPage, Item, SearchPage, SearchRequest};

/// Runs catalog operations to completion on an owned Tokio runtime.
///
/// For callers without an async context. Must not be used from inside
/// another Tokio runtime.
#[derive(Debug)]
pub struct BlockingCatalog {
    runtime: tokio::runtime::Runtime,
    catalog: Catalog,
}

impl BlockingCatalog {
    /// Wraps a catalog, creating a multi-threaded runtime for it.
    pub fn new(catalog: Catalog) -> StorageResult<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("catalog-blocking")
            .build()
            .map_err(|e| BackendError::Internal {
                backend_name: "tokio".to_string(),
                message: format!("failed to start runtime: {}", e),
                source: Some(Box::new(e)),
            })?;
        Ok(Self::with_runtime(runtime, catalog))
    }

    /// Wraps a catalog with an existing runtime.
    pub fn with_runtime(runtime: tokio::runtime::Runtime, catalog: Catalog) -> Self {
        Self { runtime, catalog }
    }

    /// Returns the wrapped catalog.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// See [`Catalog::initialize`].
    pub fn initialize(&self) -> StorageResult<Option<IndexReport>> {
        self.runtime.block_on(self.catalog.initialize())
    }

    /// See [`Catalog::search`].
    pub fn search(&self, request: &SearchRequest) -> StorageResult<SearchPage> {
        self.runtime.block_on(self.catalog.search(request))
    }

    /// See [`Catalog::list_collections`].
    pub fn list_collections(
        &self,
        token: Option<&str>,
        limit: Option<u64>,
    ) -> StorageResult<CollectionPage> {
        self.runtime
            .block_on(self.catalog.list_collections(token, limit))
    }

    /// See [`Catalog::get_one_item`].
    pub fn get_one_item(&self, collection_id: &str, item_id: &str) -> StorageResult<Value> {
        self.runtime
            .block_on(self.catalog.get_one_item(collection_id, item_id))
    }

    /// See [`Catalog::create_item`].
    pub fn create_item(&self, item: Item, exist_ok: bool) -> StorageResult<Value> {
        self.runtime.block_on(self.catalog.create_item(item, exist_ok))
    }

    /// See [`Catalog::delete_item`].
    pub fn delete_item(&self, item_id: &str, collection_id: &str) -> StorageResult<()> {
        self.runtime
            .block_on(self.catalog.delete_item(item_id, collection_id))
    }

    /// See [`Catalog::bulk_insert`].
    pub fn bulk_insert(&self, items: Vec<Item>) -> StorageResult<u64> {
        self.runtime.block_on(self.catalog.bulk_insert(items))
    }

    /// See [`Catalog::create_collection`].
    pub fn create_collection(&self, collection: Collection) -> StorageResult<Value> {
        self.runtime
            .block_on(self.catalog.create_collection(collection))
    }

    /// See [`Catalog::update_collection`].
    pub fn update_collection(
        &self,
        collection_id: &str,
        collection: Collection,
    ) -> StorageResult<Value> {
        self.runtime
            .block_on(self.catalog.update_collection(collection_id, collection))
    }

    /// See [`Catalog::delete_collection`].
    pub fn delete_collection(&self, collection_id: &str) -> StorageResult<()> {
        self.runtime
            .block_on(self.catalog.delete_collection(collection_id))
    }

    /// Shuts down the store client and then the runtime.
    pub fn shutdown(self) -> StorageResult<()> {
        let result = self.runtime.block_on(self.catalog.shutdown());
        self.runtime.shutdown_background();
        result
    }
}
