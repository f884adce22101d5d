//! [`DocumentStore`] held entirely in process memory.

use std::collections::HashMap;

use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{Bson, Document};
use parking_lot::{Mutex, RwLock};

use super::matcher::{apply_update, compare_documents, matches, resolve_path};
use crate::core::{DocumentStore, FindOptions};
use crate::error::{BackendError, BulkWriteFailure, StorageResult};
use crate::types::IndexDefinition;

/// MongoDB's duplicate key error code, reported for rejected bulk writes.
pub const DUPLICATE_KEY_CODE: i32 = 11000;

/// Store operations that can be made to fail with [`MemoryStore::fail_next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `find`.
    Find,
    /// `find_one`.
    FindOne,
    /// `count`.
    Count,
    /// `insert_one` and `insert_many_unordered`.
    Insert,
    /// `replace_one`.
    Replace,
    /// `update_one` and `update_many`.
    Update,
    /// `delete_one` and `delete_many`.
    Delete,
    /// `create_index`.
    CreateIndex,
}

#[derive(Debug, Default)]
struct Namespace {
    documents: Vec<Document>,
    indexes: Vec<IndexDefinition>,
}

impl Namespace {
    /// Returns the first unique index `candidate` collides on, skipping the
    /// document at position `skip`.
    fn violation(&self, candidate: &Document, skip: Option<usize>) -> Option<String> {
        self.indexes.iter().filter(|i| i.is_unique()).find_map(|index| {
            let key = index_key(candidate, index);
            let taken = self
                .documents
                .iter()
                .enumerate()
                .any(|(pos, existing)| Some(pos) != skip && index_key(existing, index) == key);
            taken.then(|| format_key(index, &key))
        })
    }

    fn positions(&self, filter: &Document) -> StorageResult<Vec<usize>> {
        let mut out = Vec::new();
        for (pos, document) in self.documents.iter().enumerate() {
            if matches(document, filter).map_err(query_error)? {
                out.push(pos);
            }
        }
        Ok(out)
    }
}

fn index_key(document: &Document, index: &IndexDefinition) -> Vec<Bson> {
    index
        .fields()
        .into_iter()
        .map(|field| {
            resolve_path(document, field)
                .first()
                .map(|v| (*v).clone())
                .unwrap_or(Bson::Null)
        })
        .collect()
}

fn format_key(index: &IndexDefinition, key: &[Bson]) -> String {
    let pairs: Vec<String> = index
        .fields()
        .iter()
        .zip(key)
        .map(|(field, value)| format!("{}: {}", field, value))
        .collect();
    format!("{{ {} }}", pairs.join(", "))
}

fn query_error(message: String) -> BackendError {
    BackendError::QueryError { message }
}

fn with_id(mut document: Document) -> Document {
    if !document.contains_key("_id") {
        document.insert("_id", ObjectId::new());
    }
    document
}

/// An in-memory document store.
///
/// Evaluates the same query language as the MongoDB backend, enforces unique
/// indexes and is safe to share across tasks. Intended for tests and for
/// embedding without a database server.
#[derive(Debug, Default)]
pub struct MemoryStore {
    namespaces: RwLock<HashMap<String, Namespace>>,
    injected: Mutex<Vec<(Operation, String)>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next call of `operation` fail with a backend error.
    pub fn fail_next(&self, operation: Operation, message: impl Into<String>) {
        self.injected.lock().push((operation, message.into()));
    }

    /// Returns the number of documents in a namespace.
    pub fn len(&self, namespace: &str) -> usize {
        self.namespaces
            .read()
            .get(namespace)
            .map_or(0, |ns| ns.documents.len())
    }

    /// Returns true if the namespace holds no documents.
    pub fn is_empty(&self, namespace: &str) -> bool {
        self.len(namespace) == 0
    }

    /// Returns the indexes defined on a namespace.
    pub fn indexes(&self, namespace: &str) -> Vec<IndexDefinition> {
        self.namespaces
            .read()
            .get(namespace)
            .map(|ns| ns.indexes.clone())
            .unwrap_or_default()
    }

    fn check_injected(&self, operation: Operation) -> StorageResult<()> {
        let mut injected = self.injected.lock();
        if let Some(pos) = injected.iter().position(|(op, _)| *op == operation) {
            let (_, message) = injected.remove(pos);
            return Err(BackendError::Unavailable {
                backend_name: "memory".to_string(),
                message,
            }
            .into());
        }
        Ok(())
    }

    fn update(
        &self,
        namespace: &str,
        filter: &Document,
        update: &Document,
        multi: bool,
    ) -> StorageResult<u64> {
        self.check_injected(Operation::Update)?;
        let mut namespaces = self.namespaces.write();
        let Some(ns) = namespaces.get_mut(namespace) else {
            return Ok(0);
        };
        let mut positions = ns.positions(filter)?;
        if !multi {
            positions.truncate(1);
        }

        // validate every change before writing any
        let mut updated = Vec::with_capacity(positions.len());
        for &pos in &positions {
            let mut document = ns.documents[pos].clone();
            apply_update(&mut document, update).map_err(query_error)?;
            updated.push((pos, document));
        }
        let mut staged = Namespace {
            documents: ns.documents.clone(),
            indexes: ns.indexes.clone(),
        };
        for (pos, document) in &updated {
            staged.documents[*pos] = document.clone();
        }
        for (pos, document) in &updated {
            if let Some(key) = staged.violation(document, Some(*pos)) {
                return Err(BackendError::DuplicateKey {
                    namespace: namespace.to_string(),
                    key,
                }
                .into());
            }
        }

        ns.documents = staged.documents;
        Ok(updated.len() as u64)
    }

    fn delete(&self, namespace: &str, filter: &Document, multi: bool) -> StorageResult<u64> {
        self.check_injected(Operation::Delete)?;
        let mut namespaces = self.namespaces.write();
        let Some(ns) = namespaces.get_mut(namespace) else {
            return Ok(0);
        };
        let mut positions = ns.positions(filter)?;
        if !multi {
            positions.truncate(1);
        }
        for pos in positions.iter().rev() {
            ns.documents.remove(*pos);
        }
        Ok(positions.len() as u64)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn find(
        &self,
        namespace: &str,
        filter: Document,
        options: FindOptions,
    ) -> StorageResult<Vec<Document>> {
        self.check_injected(Operation::Find)?;
        let namespaces = self.namespaces.read();
        let Some(ns) = namespaces.get(namespace) else {
            return Ok(Vec::new());
        };

        let mut found: Vec<&Document> = Vec::new();
        for document in &ns.documents {
            if matches(document, &filter).map_err(query_error)? {
                found.push(document);
            }
        }
        if let Some(sort) = options.sort.as_ref() {
            // stable, so ties keep insertion order
            found.sort_by(|a, b| compare_documents(a, b, sort));
        }

        let skip = usize::try_from(options.skip).unwrap_or(usize::MAX);
        let limit = options
            .limit
            .and_then(|l| usize::try_from(l).ok())
            .unwrap_or(usize::MAX);
        Ok(found
            .into_iter()
            .skip(skip)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn find_one(&self, namespace: &str, filter: Document) -> StorageResult<Option<Document>> {
        self.check_injected(Operation::FindOne)?;
        let namespaces = self.namespaces.read();
        let Some(ns) = namespaces.get(namespace) else {
            return Ok(None);
        };
        for document in &ns.documents {
            if matches(document, &filter).map_err(query_error)? {
                return Ok(Some(document.clone()));
            }
        }
        Ok(None)
    }

    async fn count(&self, namespace: &str, filter: Document) -> StorageResult<u64> {
        self.check_injected(Operation::Count)?;
        let namespaces = self.namespaces.read();
        match namespaces.get(namespace) {
            Some(ns) => Ok(ns.positions(&filter)?.len() as u64),
            None => Ok(0),
        }
    }

    async fn insert_one(&self, namespace: &str, document: Document) -> StorageResult<()> {
        self.check_injected(Operation::Insert)?;
        let document = with_id(document);
        let mut namespaces = self.namespaces.write();
        let ns = namespaces.entry(namespace.to_string()).or_default();
        if let Some(key) = ns.violation(&document, None) {
            return Err(BackendError::DuplicateKey {
                namespace: namespace.to_string(),
                key,
            }
            .into());
        }
        ns.documents.push(document);
        Ok(())
    }

    async fn insert_many_unordered(
        &self,
        namespace: &str,
        documents: Vec<Document>,
    ) -> StorageResult<u64> {
        self.check_injected(Operation::Insert)?;
        let mut namespaces = self.namespaces.write();
        let ns = namespaces.entry(namespace.to_string()).or_default();

        let mut inserted = 0;
        let mut failures = Vec::new();
        for (index, document) in documents.into_iter().enumerate() {
            let document = with_id(document);
            match ns.violation(&document, None) {
                Some(key) => failures.push(BulkWriteFailure {
                    index,
                    code: DUPLICATE_KEY_CODE,
                    message: format!(
                        "E11000 duplicate key error collection: {} dup key: {}",
                        namespace, key
                    ),
                }),
                None => {
                    ns.documents.push(document);
                    inserted += 1;
                }
            }
        }

        if failures.is_empty() {
            Ok(inserted)
        } else {
            Err(BackendError::BulkWrite {
                namespace: namespace.to_string(),
                inserted,
                failures,
            }
            .into())
        }
    }

    async fn replace_one(
        &self,
        namespace: &str,
        filter: Document,
        replacement: Document,
    ) -> StorageResult<u64> {
        self.check_injected(Operation::Replace)?;
        let mut namespaces = self.namespaces.write();
        let Some(ns) = namespaces.get_mut(namespace) else {
            return Ok(0);
        };
        let Some(&pos) = ns.positions(&filter)?.first() else {
            return Ok(0);
        };

        let mut replacement = replacement;
        let current_id = ns.documents[pos].get("_id").cloned();
        match (replacement.get("_id").cloned(), current_id) {
            (Some(new_id), Some(old_id)) if new_id != old_id => {
                return Err(query_error(format!(
                    "replacement changes immutable _id from {} to {}",
                    old_id, new_id
                ))
                .into());
            }
            (None, Some(old_id)) => {
                replacement.insert("_id", old_id);
            }
            _ => {}
        }

        if let Some(key) = ns.violation(&replacement, Some(pos)) {
            return Err(BackendError::DuplicateKey {
                namespace: namespace.to_string(),
                key,
            }
            .into());
        }
        ns.documents[pos] = replacement;
        Ok(1)
    }

    async fn update_one(
        &self,
        namespace: &str,
        filter: Document,
        update: Document,
    ) -> StorageResult<u64> {
        self.update(namespace, &filter, &update, false)
    }

    async fn update_many(
        &self,
        namespace: &str,
        filter: Document,
        update: Document,
    ) -> StorageResult<u64> {
        self.update(namespace, &filter, &update, true)
    }

    async fn delete_one(&self, namespace: &str, filter: Document) -> StorageResult<u64> {
        self.delete(namespace, &filter, false)
    }

    async fn delete_many(&self, namespace: &str, filter: Document) -> StorageResult<u64> {
        self.delete(namespace, &filter, true)
    }

    async fn create_index(&self, namespace: &str, index: &IndexDefinition) -> StorageResult<()> {
        self.check_injected(Operation::CreateIndex)?;
        let mut namespaces = self.namespaces.write();
        let ns = namespaces.entry(namespace.to_string()).or_default();

        if let Some(existing) = ns.indexes.iter().find(|i| i.name() == index.name()) {
            if existing == index {
                return Ok(());
            }
            return Err(query_error(format!(
                "index {} already exists with different options",
                existing
            ))
            .into());
        }

        if index.is_unique() {
            let mut seen: Vec<Vec<Bson>> = Vec::with_capacity(ns.documents.len());
            for document in &ns.documents {
                let key = index_key(document, index);
                if seen.contains(&key) {
                    return Err(BackendError::DuplicateKey {
                        namespace: namespace.to_string(),
                        key: format_key(index, &key),
                    }
                    .into());
                }
                seen.push(key);
            }
        }

        tracing::debug!("Created index {} on {}", index, namespace);
        ns.indexes.push(index.clone());
        Ok(())
    }

    async fn shutdown(&self) -> StorageResult<()> {
        Ok(())
    }
}
