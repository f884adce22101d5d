//! [`DocumentStore`] over the official MongoDB driver.

use std::fmt::Debug;

use async_trait::async_trait;
use bson::Document;
use futures::TryStreamExt;
use mongodb::error::{ErrorKind as DriverErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, Database, IndexModel};

use super::config::MongoConfig;
use crate::core::{DocumentStore, FindOptions};
use crate::error::{BackendError, BulkWriteFailure, StorageError, StorageResult};
use crate::types::IndexDefinition;

const BACKEND_NAME: &str = "mongodb";
const DUPLICATE_KEY_CODE: i32 = 11000;

impl From<mongodb::error::Error> for BackendError {
    fn from(err: mongodb::error::Error) -> Self {
        let message = err.to_string();
        match *err.kind {
            DriverErrorKind::ServerSelection { .. } | DriverErrorKind::Io(_) => {
                BackendError::Unavailable {
                    backend_name: BACKEND_NAME.to_string(),
                    message,
                }
            }
            DriverErrorKind::Authentication { .. } | DriverErrorKind::DnsResolve { .. } => {
                BackendError::ConnectionFailed {
                    backend_name: BACKEND_NAME.to_string(),
                    message,
                }
            }
            DriverErrorKind::BsonSerialization(_) | DriverErrorKind::BsonDeserialization(_) => {
                BackendError::SerializationError { message }
            }
            DriverErrorKind::Command(_) | DriverErrorKind::InvalidArgument { .. } => {
                BackendError::QueryError { message }
            }
            _ => BackendError::Internal {
                backend_name: BACKEND_NAME.to_string(),
                message,
                source: Some(Box::new(err)),
            },
        }
    }
}

/// Maps a driver error on `namespace`, recognizing duplicate key rejections.
fn map_error(namespace: &str, err: mongodb::error::Error) -> StorageError {
    if let DriverErrorKind::Write(WriteFailure::WriteError(ref write)) = *err.kind
        && write.code == DUPLICATE_KEY_CODE
    {
        return BackendError::DuplicateKey {
            namespace: namespace.to_string(),
            key: write.message.clone(),
        }
        .into();
    }
    StorageError::Backend(BackendError::from(err))
}

/// MongoDB-backed document store.
///
/// Namespaces map onto collections of a single database.
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    database: Database,
}

impl Debug for MongoStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoStore")
            .field("database", &self.database.name())
            .finish_non_exhaustive()
    }
}

impl MongoStore {
    /// Connects using a [`MongoConfig`].
    pub async fn connect(config: &MongoConfig, database: &str) -> StorageResult<Self> {
        let client = Client::with_uri_str(config.uri()).await.map_err(|e| {
            StorageError::Backend(BackendError::ConnectionFailed {
                backend_name: BACKEND_NAME.to_string(),
                message: format!("Invalid connection settings for {}: {}", config.host, e),
            })
        })?;
        tracing::info!("MongoDB client created for {} (database {})", config.host, database);
        Ok(Self::with_client(client, database))
    }

    /// Wraps an existing driver client.
    pub fn with_client(client: Client, database: &str) -> Self {
        let database = client.database(database);
        Self { client, database }
    }

    /// Returns the underlying database handle.
    pub fn database(&self) -> &Database {
        &self.database
    }

    fn collection(&self, namespace: &str) -> Collection<Document> {
        self.database.collection::<Document>(namespace)
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    fn backend_name(&self) -> &'static str {
        BACKEND_NAME
    }

    async fn find(
        &self,
        namespace: &str,
        filter: Document,
        options: FindOptions,
    ) -> StorageResult<Vec<Document>> {
        let collection = self.collection(namespace);
        let mut action = collection.find(filter);
        if let Some(sort) = options.sort {
            action = action.sort(sort);
        }
        if options.skip > 0 {
            action = action.skip(options.skip);
        }
        if let Some(limit) = options.limit {
            action = action.limit(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        let cursor = action.await.map_err(|e| map_error(namespace, e))?;
        cursor
            .try_collect()
            .await
            .map_err(|e| map_error(namespace, e))
    }

    async fn find_one(&self, namespace: &str, filter: Document) -> StorageResult<Option<Document>> {
        self.collection(namespace)
            .find_one(filter)
            .await
            .map_err(|e| map_error(namespace, e))
    }

    async fn count(&self, namespace: &str, filter: Document) -> StorageResult<u64> {
        self.collection(namespace)
            .count_documents(filter)
            .await
            .map_err(|e| map_error(namespace, e))
    }

    async fn insert_one(&self, namespace: &str, document: Document) -> StorageResult<()> {
        self.collection(namespace)
            .insert_one(document)
            .await
            .map_err(|e| map_error(namespace, e))?;
        Ok(())
    }

    async fn insert_many_unordered(
        &self,
        namespace: &str,
        documents: Vec<Document>,
    ) -> StorageResult<u64> {
        let total = documents.len() as u64;
        match self
            .collection(namespace)
            .insert_many(documents)
            .ordered(false)
            .await
        {
            Ok(result) => Ok(result.inserted_ids.len() as u64),
            Err(err) => {
                if let DriverErrorKind::InsertMany(ref failure) = *err.kind
                    && let Some(write_errors) = failure.write_errors.as_ref()
                {
                    let failures: Vec<BulkWriteFailure> = write_errors
                        .iter()
                        .map(|w| BulkWriteFailure {
                            index: w.index,
                            code: w.code,
                            message: w.message.clone(),
                        })
                        .collect();
                    return Err(BackendError::BulkWrite {
                        namespace: namespace.to_string(),
                        inserted: total.saturating_sub(failures.len() as u64),
                        failures,
                    }
                    .into());
                }
                Err(map_error(namespace, err))
            }
        }
    }

    async fn replace_one(
        &self,
        namespace: &str,
        filter: Document,
        replacement: Document,
    ) -> StorageResult<u64> {
        let result = self
            .collection(namespace)
            .replace_one(filter, replacement)
            .await
            .map_err(|e| map_error(namespace, e))?;
        Ok(result.matched_count)
    }

    async fn update_one(
        &self,
        namespace: &str,
        filter: Document,
        update: Document,
    ) -> StorageResult<u64> {
        let result = self
            .collection(namespace)
            .update_one(filter, update)
            .await
            .map_err(|e| map_error(namespace, e))?;
        Ok(result.matched_count)
    }

    async fn update_many(
        &self,
        namespace: &str,
        filter: Document,
        update: Document,
    ) -> StorageResult<u64> {
        let result = self
            .collection(namespace)
            .update_many(filter, update)
            .await
            .map_err(|e| map_error(namespace, e))?;
        Ok(result.matched_count)
    }

    async fn delete_one(&self, namespace: &str, filter: Document) -> StorageResult<u64> {
        let result = self
            .collection(namespace)
            .delete_one(filter)
            .await
            .map_err(|e| map_error(namespace, e))?;
        Ok(result.deleted_count)
    }

    async fn delete_many(&self, namespace: &str, filter: Document) -> StorageResult<u64> {
        let result = self
            .collection(namespace)
            .delete_many(filter)
            .await
            .map_err(|e| map_error(namespace, e))?;
        Ok(result.deleted_count)
    }

    async fn create_index(&self, namespace: &str, index: &IndexDefinition) -> StorageResult<()> {
        let options = IndexOptions::builder()
            .name(index.name())
            .unique(index.is_unique())
            .build();
        let model = IndexModel::builder()
            .keys(index.key_document())
            .options(options)
            .build();
        self.collection(namespace)
            .create_index(model)
            .await
            .map_err(|e| map_error(namespace, e))?;
        Ok(())
    }

    async fn shutdown(&self) -> StorageResult<()> {
        self.client.clone().shutdown().await;
        Ok(())
    }
}
