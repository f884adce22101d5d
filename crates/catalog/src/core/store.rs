//! Document store client trait.
//!
//! This module defines [`DocumentStore`], the asynchronous client every
//! catalog component talks to. It exposes the small set of document
//! operations the catalog needs, over named namespaces (logical collections)
//! holding [`bson::Document`]s. Filters and update documents use the MongoDB
//! query language.

use std::fmt::Debug;

use async_trait::async_trait;
use bson::Document;

use crate::error::StorageResult;
use crate::types::IndexDefinition;

/// Options for [`DocumentStore::find`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Sort document (`{field: 1 | -1}`), applied before skip and limit.
    pub sort: Option<Document>,
    /// Number of matching documents to skip.
    pub skip: u64,
    /// Maximum number of documents to return.
    pub limit: Option<u64>,
}

impl FindOptions {
    /// Creates options with no sort, skip or limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sort document.
    pub fn sort(mut self, sort: Document) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Sets the skip count.
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    /// Sets the result limit.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Asynchronous document store client.
///
/// Implementations must be safe for concurrent use; the catalog shares one
/// client across all requests through an `Arc<dyn DocumentStore>`.
///
/// # Errors
///
/// Failures are reported as `StorageError::Backend`. A write rejected by a
/// unique index is reported as [`BackendError::DuplicateKey`], and an unordered
/// insert-many where only some documents were written as
/// [`BackendError::BulkWrite`].
///
/// [`BackendError::DuplicateKey`]: crate::error::BackendError::DuplicateKey
/// [`BackendError::BulkWrite`]: crate::error::BackendError::BulkWrite
#[async_trait]
pub trait DocumentStore: Send + Sync + Debug {
    /// Returns a human-readable name for this store.
    fn backend_name(&self) -> &'static str;

    /// Returns matching documents, sorted then skipped then limited.
    async fn find(
        &self,
        namespace: &str,
        filter: Document,
        options: FindOptions,
    ) -> StorageResult<Vec<Document>>;

    /// Returns the first matching document.
    async fn find_one(&self, namespace: &str, filter: Document) -> StorageResult<Option<Document>>;

    /// Counts matching documents.
    async fn count(&self, namespace: &str, filter: Document) -> StorageResult<u64>;

    /// Inserts one document, assigning `_id` when absent.
    async fn insert_one(&self, namespace: &str, document: Document) -> StorageResult<()>;

    /// Inserts documents without stopping at the first failure.
    ///
    /// Returns the number inserted when every document was written.
    async fn insert_many_unordered(
        &self,
        namespace: &str,
        documents: Vec<Document>,
    ) -> StorageResult<u64>;

    /// Replaces the first matching document. Returns the matched count.
    async fn replace_one(
        &self,
        namespace: &str,
        filter: Document,
        replacement: Document,
    ) -> StorageResult<u64>;

    /// Applies an update document (`$set`) to the first match. Returns the matched count.
    async fn update_one(
        &self,
        namespace: &str,
        filter: Document,
        update: Document,
    ) -> StorageResult<u64>;

    /// Applies an update document (`$set`) to every match. Returns the matched count.
    async fn update_many(
        &self,
        namespace: &str,
        filter: Document,
        update: Document,
    ) -> StorageResult<u64>;

    /// Deletes the first match. Returns the deleted count.
    async fn delete_one(&self, namespace: &str, filter: Document) -> StorageResult<u64>;

    /// Deletes every match. Returns the deleted count.
    async fn delete_many(&self, namespace: &str, filter: Document) -> StorageResult<u64>;

    /// Creates an index. Creating an identical existing index succeeds.
    async fn create_index(&self, namespace: &str, index: &IndexDefinition) -> StorageResult<()>;

    /// Releases the client's resources.
    async fn shutdown(&self) -> StorageResult<()>;
}
