//! The catalog facade.

use std::sync::Arc;

use serde_json::Value;

use crate::config::CatalogConfig;
use crate::core::{DocumentStore, IndexManager, IndexReport, TransactionManager};
use crate::error::{StorageResult, ValidationError};
use crate::filter::{FilterTranslator, QueryablesMapping};
use crate::search::{SearchAdapter, SearchExecutor};
use crate::serializer::{DefaultSerializer, RecordSerializer};
use crate::types::{Collection, CollectionPage, DatetimeFilter, Item, SearchPage, SearchRequest};

/// Wires every catalog component to one injected store client.
///
/// The store is owned by the host process: it is constructed before the
/// catalog and released through [`Catalog::shutdown`].
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use helios_catalog::backends::memory::MemoryStore;
/// use helios_catalog::types::{Collection, Item, SearchRequest};
/// use helios_catalog::{Catalog, CatalogConfig};
/// use serde_json::json;
///
/// # let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// # runtime.block_on(async {
/// let catalog = Catalog::new(Arc::new(MemoryStore::new()), CatalogConfig::default());
/// catalog.initialize().await?;
///
/// catalog
///     .create_collection(Collection::new(json!({"id": "landsat"}))?)
///     .await?;
/// catalog
///     .create_item(
///         Item::new(json!({
///             "id": "scene-1",
///             "collection": "landsat",
///             "geometry": {"type": "Point", "coordinates": [150.0, -30.0]},
///             "properties": {"datetime": "2020-02-12T12:30:22Z"}
///         }))?,
///         false,
///     )
///     .await?;
///
/// let page = catalog
///     .search(&SearchRequest::new().with_bbox(vec![100.0, -50.0, 170.0, -20.0]))
///     .await?;
/// assert_eq!(page.items.len(), 1);
/// assert_eq!(page.matched, Some(1));
/// # Ok::<(), helios_catalog::StorageError>(())
/// # }).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct Catalog {
    config: CatalogConfig,
    store: Arc<dyn DocumentStore>,
    translator: FilterTranslator,
    executor: SearchExecutor,
    transactions: TransactionManager,
    indexes: IndexManager,
}

impl Catalog {
    /// Creates a catalog using the default record serializer.
    pub fn new(store: Arc<dyn DocumentStore>, config: CatalogConfig) -> Self {
        Self::with_serializer(store, config, Arc::new(DefaultSerializer))
    }

    /// Creates a catalog with a custom record serializer.
    pub fn with_serializer(
        store: Arc<dyn DocumentStore>,
        config: CatalogConfig,
        serializer: Arc<dyn RecordSerializer>,
    ) -> Self {
        let executor = SearchExecutor::new(
            store.clone(),
            serializer.clone(),
            &config.collections_index,
            &config.items_index,
        );
        let transactions = TransactionManager::new(
            store.clone(),
            serializer,
            &config.collections_index,
            &config.items_index,
        );
        let indexes = IndexManager::new(
            store.clone(),
            &config.collections_index,
            &config.items_index,
        );
        Self {
            config,
            store,
            translator: FilterTranslator::default(),
            executor,
            transactions,
            indexes,
        }
    }

    /// Replaces the queryable aliases used by CQL2 filters.
    pub fn with_queryables(mut self, queryables: QueryablesMapping) -> Self {
        self.translator = FilterTranslator::new(queryables);
        self
    }

    /// Runs startup index creation unless disabled by configuration.
    ///
    /// Index failures are logged and reported, never raised. Returns `None`
    /// when index creation is disabled.
    pub async fn initialize(&self) -> StorageResult<Option<IndexReport>> {
        if !self.config.create_indexes {
            tracing::info!("Index creation disabled, skipping");
            return Ok(None);
        }
        let report = self.indexes.ensure_all().await;
        if !report.is_complete() {
            tracing::warn!(
                "{} of {} indexes could not be created",
                report.failed.len(),
                report.failed.len() + report.created.len()
            );
        }
        Ok(Some(report))
    }

    /// Releases the store client.
    pub async fn shutdown(&self) -> StorageResult<()> {
        tracing::info!("Shutting down {} store", self.store.backend_name());
        self.store.shutdown().await
    }

    /// Returns the configuration.
    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Returns the store client.
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Returns the search executor.
    pub fn executor(&self) -> &SearchExecutor {
        &self.executor
    }

    /// Returns the transaction manager.
    pub fn transactions(&self) -> &TransactionManager {
        &self.transactions
    }

    /// Returns the index manager.
    pub fn indexes(&self) -> &IndexManager {
        &self.indexes
    }

    /// Creates an empty search adapter using this catalog's queryables.
    pub fn make_search(&self) -> SearchAdapter {
        SearchAdapter::with_translator(self.translator.clone())
    }

    // ==================== Search ====================

    /// Runs an item search from an upstream request.
    ///
    /// Criteria are applied in order: ids, collections, datetime, bbox,
    /// intersects, per-property `query` comparisons, the CQL2 filter, then the
    /// sort. A missing limit uses the configured default and limits above the
    /// configured maximum are clamped.
    pub async fn search(&self, request: &SearchRequest) -> StorageResult<SearchPage> {
        let limit = self.effective_limit(request.limit)?;
        let mut adapter = self.make_search();

        if let Some(ids) = request.ids.as_deref()
            && !ids.is_empty()
        {
            adapter = adapter.by_ids(ids);
        }
        if let Some(collections) = request.collections.as_deref()
            && !collections.is_empty()
        {
            adapter = adapter.by_collections(collections);
        }
        if let Some(datetime) = request.datetime.as_deref() {
            let datetime = DatetimeFilter::parse(datetime)?;
            if !datetime.is_empty() {
                adapter = adapter.by_datetime(&datetime);
            }
        }
        if let Some(bbox) = request.bbox.as_deref() {
            adapter = adapter.by_bbox(bbox)?;
        }
        if let Some(geometry) = request.intersects.as_ref() {
            adapter = adapter.by_geometry(geometry)?;
        }
        if let Some(query) = request.query.as_ref() {
            for (field, ops) in query {
                let field = format!("properties__{}", field);
                for (op, value) in ops {
                    adapter = adapter.by_field_op(op, &field, value)?;
                }
            }
        }
        adapter = adapter.by_cql2(request.filter.as_ref())?;
        adapter = adapter.set_sort(request.sortby.as_deref());

        self.executor
            .execute(
                &adapter,
                limit,
                request.token.as_deref(),
                None,
                request.collections.as_deref(),
            )
            .await
    }

    /// Lists collections, `limit` defaulting to the configured page size.
    pub async fn list_collections(
        &self,
        token: Option<&str>,
        limit: Option<u64>,
    ) -> StorageResult<CollectionPage> {
        let limit = self.effective_limit(limit)?;
        self.executor.list_collections(token, limit).await
    }

    fn effective_limit(&self, requested: Option<u64>) -> Result<u64, ValidationError> {
        match requested {
            None => Ok(self.config.default_limit),
            Some(0) => Err(ValidationError::InvalidLimit {
                limit: 0,
                message: "limit must be at least 1".to_string(),
            }),
            Some(limit) if limit > self.config.max_limit => {
                tracing::debug!(
                    "Requested limit {} clamped to {}",
                    limit,
                    self.config.max_limit
                );
                Ok(self.config.max_limit)
            }
            Some(limit) => Ok(limit),
        }
    }

    // ==================== Records ====================

    /// See [`TransactionManager::get_one_item`].
    pub async fn get_one_item(&self, collection_id: &str, item_id: &str) -> StorageResult<Value> {
        self.transactions.get_one_item(collection_id, item_id).await
    }

    /// See [`TransactionManager::find_collection`].
    pub async fn find_collection(&self, collection_id: &str) -> StorageResult<Value> {
        self.transactions.find_collection(collection_id).await
    }

    /// See [`TransactionManager::create_item`].
    pub async fn create_item(&self, item: Item, exist_ok: bool) -> StorageResult<Value> {
        self.transactions.create_item(item, exist_ok).await
    }

    /// See [`TransactionManager::update_item`].
    pub async fn update_item(
        &self,
        collection_id: &str,
        item_id: &str,
        item: Item,
    ) -> StorageResult<Value> {
        self.transactions
            .update_item(collection_id, item_id, item)
            .await
    }

    /// See [`TransactionManager::delete_item`].
    pub async fn delete_item(&self, item_id: &str, collection_id: &str) -> StorageResult<()> {
        self.transactions.delete_item(item_id, collection_id).await
    }

    /// See [`TransactionManager::bulk_insert`].
    pub async fn bulk_insert(&self, items: Vec<Item>) -> StorageResult<u64> {
        self.transactions.bulk_insert(items).await
    }

    /// See [`TransactionManager::create_collection`].
    pub async fn create_collection(&self, collection: Collection) -> StorageResult<Value> {
        self.transactions.create_collection(collection).await
    }

    /// See [`TransactionManager::update_collection`].
    pub async fn update_collection(
        &self,
        collection_id: &str,
        collection: Collection,
    ) -> StorageResult<Value> {
        self.transactions
            .update_collection(collection_id, collection)
            .await
    }

    /// See [`TransactionManager::delete_collection`].
    pub async fn delete_collection(&self, collection_id: &str) -> StorageResult<()> {
        self.transactions.delete_collection(collection_id).await
    }
}
