//! Record writes with existence and conflict checks.
//!
//! Every write goes through [`TransactionManager`]. Store failures on these
//! paths are logged and surfaced as [`ConflictError::WriteFailed`] naming the
//! operation and the keys involved, so callers handle a single failure shape.
//!
//! # Collection rename
//!
//! Renaming a collection runs three independent store operations: re-point
//! items to the new id, insert the new collection document, delete the old
//! one. They are not wrapped in a multi-document transaction. A failure part
//! way through leaves items pointing at a collection id whose document may not
//! exist yet, or two collection documents for the same data.

use std::sync::Arc;

use bson::{Document, doc, oid::ObjectId};
use serde_json::Value;

use crate::core::DocumentStore;
use crate::error::{
    BackendError, ConflictError, ResourceError, StorageError, StorageResult, ValidationError,
};
use crate::serializer::{INTERNAL_ID, RecordSerializer};
use crate::types::{Collection, Item};

/// Applies create, update and delete operations to records.
#[derive(Debug, Clone)]
pub struct TransactionManager {
    store: Arc<dyn DocumentStore>,
    serializer: Arc<dyn RecordSerializer>,
    collections_index: String,
    items_index: String,
}

impl TransactionManager {
    /// Creates a manager over the given namespaces.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        serializer: Arc<dyn RecordSerializer>,
        collections_index: impl Into<String>,
        items_index: impl Into<String>,
    ) -> Self {
        Self {
            store,
            serializer,
            collections_index: collections_index.into(),
            items_index: items_index.into(),
        }
    }

    // ==================== Reads ====================

    /// Fails with `CollectionNotFound` unless the collection exists.
    pub async fn check_collection_exists(&self, collection_id: &str) -> StorageResult<()> {
        let found = self
            .store
            .find_one(&self.collections_index, doc! { "id": collection_id })
            .await?;
        match found {
            Some(_) => Ok(()),
            None => Err(ResourceError::CollectionNotFound {
                collection_id: collection_id.to_string(),
            }
            .into()),
        }
    }

    /// Returns one collection in its public form.
    pub async fn find_collection(&self, collection_id: &str) -> StorageResult<Value> {
        let found = self
            .store
            .find_one(&self.collections_index, doc! { "id": collection_id })
            .await
            .inspect_err(|e| tracing::error!("Failed to find collection {}: {}", collection_id, e))?;
        match found {
            Some(document) => Ok(self.serializer.collection_from_db(document)),
            None => Err(ResourceError::CollectionNotFound {
                collection_id: collection_id.to_string(),
            }
            .into()),
        }
    }

    /// Returns one item in its public form.
    pub async fn get_one_item(&self, collection_id: &str, item_id: &str) -> StorageResult<Value> {
        let found = self
            .store
            .find_one(&self.items_index, item_key(item_id, collection_id))
            .await
            .inspect_err(|e| {
                tracing::error!(
                    "Failed to read item {} in collection {}: {}",
                    item_id,
                    collection_id,
                    e
                )
            })?;
        match found {
            Some(document) => Ok(self.serializer.item_from_db(document)),
            None => Err(ResourceError::ItemNotFound {
                item_id: item_id.to_string(),
                collection_id: collection_id.to_string(),
            }
            .into()),
        }
    }

    // ==================== Items ====================

    /// Checks that an item may be inserted and returns its stored form.
    ///
    /// The parent collection must exist. Unless `exist_ok`, an existing item
    /// with the same `(id, collection)` is a conflict.
    pub async fn prepare_item(&self, item: &Item, exist_ok: bool) -> StorageResult<Document> {
        let keys = item.key();
        self.check_collection_exists(item.collection())
            .await
            .map_err(|e| write_failed("prepare_item", &keys, e))?;

        let document = self.serializer.item_to_db(item)?;

        if !exist_ok {
            let existing = self
                .store
                .find_one(&self.items_index, item_key(item.id(), item.collection()))
                .await
                .map_err(|e| write_failed("prepare_item", &keys, e))?;
            if existing.is_some() {
                return Err(item_exists(item));
            }
        }

        Ok(document)
    }

    /// Creates an item, or replaces it when it exists and `exist_ok` is set.
    ///
    /// A replacement keeps the stored document's internal identity.
    pub async fn create_item(&self, item: Item, exist_ok: bool) -> StorageResult<Value> {
        let keys = item.key();
        tracing::info!(
            "Creating item {} in collection {}",
            item.id(),
            item.collection()
        );

        self.check_collection_exists(item.collection())
            .await
            .map_err(|e| write_failed("create_item", &keys, e))?;

        let mut document = self.serializer.item_to_db(&item)?;
        let filter = item_key(item.id(), item.collection());
        let existing = self
            .store
            .find_one(&self.items_index, filter.clone())
            .await
            .map_err(|e| write_failed("create_item", &keys, e))?;

        match existing {
            Some(_) if !exist_ok => {
                tracing::warn!(
                    "Item with id {} already exists in collection {}",
                    item.id(),
                    item.collection()
                );
                return Err(item_exists(&item));
            }
            Some(existing) => {
                if let Some(id) = existing.get(INTERNAL_ID) {
                    document.insert(INTERNAL_ID, id.clone());
                }
                tracing::info!(
                    "Updating existing item {} in collection {}",
                    item.id(),
                    item.collection()
                );
                self.store
                    .replace_one(&self.items_index, filter, document)
                    .await
                    .map_err(|e| write_failed("create_item", &keys, e))?;
            }
            None => {
                if !document.contains_key(INTERNAL_ID) {
                    document.insert(INTERNAL_ID, ObjectId::new());
                }
                tracing::info!(
                    "Inserting new item {} in collection {}",
                    item.id(),
                    item.collection()
                );
                self.store
                    .insert_one(&self.items_index, document)
                    .await
                    .map_err(|e| match e {
                        StorageError::Backend(BackendError::DuplicateKey { .. }) => {
                            item_exists(&item)
                        }
                        other => write_failed("create_item", &keys, other),
                    })?;
            }
        }

        Ok(item.into_content())
    }

    /// Replaces an existing item.
    ///
    /// The item body must carry the target `id` and `collection`.
    pub async fn update_item(
        &self,
        collection_id: &str,
        item_id: &str,
        item: Item,
    ) -> StorageResult<Value> {
        if item.id() != item_id || item.collection() != collection_id {
            return Err(ValidationError::InvalidRecord {
                message: format!(
                    "item {} does not match target {}/{}",
                    item.key(),
                    collection_id,
                    item_id
                ),
            }
            .into());
        }

        let keys = item.key();
        self.check_collection_exists(collection_id)
            .await
            .map_err(|e| write_failed("update_item", &keys, e))?;

        let filter = item_key(item_id, collection_id);
        let existing = self
            .store
            .find_one(&self.items_index, filter.clone())
            .await
            .map_err(|e| write_failed("update_item", &keys, e))?;
        let Some(existing) = existing else {
            tracing::warn!(
                "Item {} in collection {} not found",
                item_id,
                collection_id
            );
            return Err(ResourceError::ItemNotFound {
                item_id: item_id.to_string(),
                collection_id: collection_id.to_string(),
            }
            .into());
        };

        let mut document = self.serializer.item_to_db(&item)?;
        if let Some(id) = existing.get(INTERNAL_ID) {
            document.insert(INTERNAL_ID, id.clone());
        }
        self.store
            .replace_one(&self.items_index, filter, document)
            .await
            .map_err(|e| write_failed("update_item", &keys, e))?;

        tracing::info!("Updated item {} in collection {}", item_id, collection_id);
        Ok(item.into_content())
    }

    /// Deletes one item, scoped to its collection.
    pub async fn delete_item(&self, item_id: &str, collection_id: &str) -> StorageResult<()> {
        let keys = format!("{}/{}", collection_id, item_id);
        self.check_collection_exists(collection_id)
            .await
            .map_err(|e| write_failed("delete_item", &keys, e))?;

        let deleted = self
            .store
            .delete_one(&self.items_index, item_key(item_id, collection_id))
            .await
            .map_err(|e| write_failed("delete_item", &keys, e))?;
        if deleted == 0 {
            tracing::warn!(
                "Item {} in collection {} not found",
                item_id,
                collection_id
            );
            return Err(ResourceError::ItemNotFound {
                item_id: item_id.to_string(),
                collection_id: collection_id.to_string(),
            }
            .into());
        }

        tracing::info!("Deleted item {} from collection {}", item_id, collection_id);
        Ok(())
    }

    /// Inserts many items, keeping every document that could be written.
    ///
    /// Documents rejected by the store (duplicate keys) are reported together
    /// in a single [`ConflictError::BulkInsert`]; the accepted ones stay
    /// persisted. No existence checks are made; use
    /// [`prepare_item`](Self::prepare_item) first when they are needed.
    pub async fn bulk_insert(&self, items: Vec<Item>) -> StorageResult<u64> {
        if items.is_empty() {
            return Ok(0);
        }

        let documents = items
            .iter()
            .map(|item| self.serializer.item_to_db(item))
            .collect::<StorageResult<Vec<_>>>()?;
        let count = documents.len();

        match self
            .store
            .insert_many_unordered(&self.items_index, documents)
            .await
        {
            Ok(inserted) => {
                tracing::info!("Bulk inserted {} items", inserted);
                Ok(inserted)
            }
            Err(StorageError::Backend(BackendError::BulkWrite {
                inserted, failures, ..
            })) => {
                tracing::warn!(
                    "Bulk insert rejected {} of {} items",
                    failures.len(),
                    count
                );
                Err(ConflictError::BulkInsert { inserted, failures }.into())
            }
            Err(e) => Err(write_failed(
                "bulk_insert",
                &format!("{} items", count),
                e,
            )),
        }
    }

    // ==================== Collections ====================

    /// Creates a collection.
    pub async fn create_collection(&self, collection: Collection) -> StorageResult<Value> {
        let keys = collection.id().to_string();
        let existing = self
            .store
            .find_one(&self.collections_index, doc! { "id": collection.id() })
            .await
            .map_err(|e| write_failed("create_collection", &keys, e))?;
        if existing.is_some() {
            tracing::warn!("Collection {} already exists", collection.id());
            return Err(collection_exists(collection.id()));
        }

        let document = self.serializer.collection_to_db(&collection)?;
        self.store
            .insert_one(&self.collections_index, document)
            .await
            .map_err(|e| match e {
                StorageError::Backend(BackendError::DuplicateKey { .. }) => {
                    collection_exists(collection.id())
                }
                other => write_failed("create_collection", &keys, other),
            })?;

        tracing::info!("Created collection {}", collection.id());
        Ok(collection.into_content())
    }

    /// Updates a collection, renaming it when the body's id differs.
    ///
    /// A rename re-points every item of the old collection to the new id. See
    /// the module documentation for its consistency window.
    pub async fn update_collection(
        &self,
        collection_id: &str,
        collection: Collection,
    ) -> StorageResult<Value> {
        let keys = collection_id.to_string();
        self.check_collection_exists(collection_id)
            .await
            .map_err(|e| write_failed("update_collection", &keys, e))?;

        let mut document = self.serializer.collection_to_db(&collection)?;

        if collection.id() != collection_id {
            let new_id = collection.id();
            let keys = format!("{} -> {}", collection_id, new_id);

            let taken = self
                .store
                .find_one(&self.collections_index, doc! { "id": new_id })
                .await
                .map_err(|e| write_failed("rename_collection", &keys, e))?;
            if taken.is_some() {
                tracing::warn!("Collection with ID {} already exists", new_id);
                return Err(collection_exists(new_id));
            }

            let moved = self
                .store
                .update_many(
                    &self.items_index,
                    doc! { "collection": collection_id },
                    doc! { "$set": { "collection": new_id } },
                )
                .await
                .map_err(|e| write_failed("rename_collection", &keys, e))?;
            self.store
                .insert_one(&self.collections_index, document)
                .await
                .map_err(|e| write_failed("rename_collection", &keys, e))?;
            self.store
                .delete_one(&self.collections_index, doc! { "id": collection_id })
                .await
                .map_err(|e| write_failed("rename_collection", &keys, e))?;

            tracing::info!(
                "Renamed collection {} to {} ({} items moved)",
                collection_id,
                new_id,
                moved
            );
        } else {
            document.remove(INTERNAL_ID);
            self.store
                .update_one(
                    &self.collections_index,
                    doc! { "id": collection_id },
                    doc! { "$set": document },
                )
                .await
                .map_err(|e| write_failed("update_collection", &keys, e))?;
            tracing::info!("Updated collection {}", collection_id);
        }

        Ok(collection.into_content())
    }

    /// Deletes a collection and every item in it.
    pub async fn delete_collection(&self, collection_id: &str) -> StorageResult<()> {
        let keys = collection_id.to_string();
        let deleted = self
            .store
            .delete_one(&self.collections_index, doc! { "id": collection_id })
            .await
            .map_err(|e| write_failed("delete_collection", &keys, e))?;
        if deleted == 0 {
            tracing::warn!("Collection {} not found", collection_id);
            return Err(ResourceError::CollectionNotFound {
                collection_id: collection_id.to_string(),
            }
            .into());
        }

        let items = self
            .store
            .delete_many(&self.items_index, doc! { "collection": collection_id })
            .await
            .map_err(|e| write_failed("delete_collection", &keys, e))?;

        tracing::info!(
            "Deleted collection {} and {} of its items",
            collection_id,
            items
        );
        Ok(())
    }

    // ==================== Maintenance ====================

    /// Deletes every item. Intended for test setup.
    pub async fn delete_all_items(&self) -> StorageResult<u64> {
        let deleted = self
            .store
            .delete_many(&self.items_index, Document::new())
            .await
            .map_err(|e| write_failed("delete_all_items", &self.items_index, e))?;
        tracing::info!("All items have been deleted ({})", deleted);
        Ok(deleted)
    }

    /// Deletes every collection. Intended for test setup.
    pub async fn delete_all_collections(&self) -> StorageResult<u64> {
        let deleted = self
            .store
            .delete_many(&self.collections_index, Document::new())
            .await
            .map_err(|e| write_failed("delete_all_collections", &self.collections_index, e))?;
        tracing::info!("All collections have been deleted ({})", deleted);
        Ok(deleted)
    }
}

fn item_key(item_id: &str, collection_id: &str) -> Document {
    doc! { "id": item_id, "collection": collection_id }
}

fn item_exists(item: &Item) -> StorageError {
    ConflictError::ItemExists {
        item_id: item.id().to_string(),
        collection_id: item.collection().to_string(),
    }
    .into()
}

fn collection_exists(collection_id: &str) -> StorageError {
    ConflictError::CollectionExists {
        collection_id: collection_id.to_string(),
    }
    .into()
}

/// Wraps a store failure on a write path; other errors pass through.
fn write_failed(operation: &str, keys: &str, err: StorageError) -> StorageError {
    match err {
        StorageError::Backend(backend) => {
            tracing::error!("Error in {} for {}: {}", operation, keys, backend);
            ConflictError::WriteFailed {
                operation: operation.to_string(),
                keys: keys.to_string(),
                message: backend.to_string(),
                source: Some(Box::new(backend)),
            }
            .into()
        }
        other => other,
    }
}
