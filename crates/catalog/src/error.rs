//! Error types for the catalog backend.
//!
//! Every public operation returns a [`StorageResult`]. The error hierarchy
//! separates missing records, write conflicts, request validation, pagination
//! and store failures so callers can map each category to a single response
//! shape (see [`StorageError::kind`]).

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use std::fmt;

use thiserror::Error;

/// The primary error type for all catalog operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// A referenced collection or item does not exist.
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// Duplicate keys, failed writes and partial bulk inserts.
    #[error(transparent)]
    Conflict(#[from] ConflictError),

    /// Malformed filters, arguments or records.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Search and pagination errors.
    #[error(transparent)]
    Search(#[from] SearchError),

    /// Failures of the underlying document store.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// The coarse failure taxonomy exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The referenced record does not exist.
    NotFound,
    /// Duplicate key, write conflict or partial bulk failure.
    Conflict,
    /// The request was rejected before reaching the store.
    Validation,
    /// The store failed for reasons unrelated to application logic.
    TransientStore,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::NotFound => write!(f, "not-found"),
            ErrorKind::Conflict => write!(f, "conflict"),
            ErrorKind::Validation => write!(f, "validation"),
            ErrorKind::TransientStore => write!(f, "transient-store"),
        }
    }
}

impl StorageError {
    /// Returns the taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::Resource(_) => ErrorKind::NotFound,
            StorageError::Conflict(_) => ErrorKind::Conflict,
            StorageError::Validation(_) | StorageError::Search(_) => ErrorKind::Validation,
            StorageError::Backend(_) => ErrorKind::TransientStore,
        }
    }

    /// Returns true if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Returns true if this is a conflict error.
    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }
}

/// Errors related to record existence.
#[derive(Error, Debug)]
pub enum ResourceError {
    #[error("collection {collection_id} does not exist")]
    CollectionNotFound { collection_id: String },

    #[error("item {item_id} in collection {collection_id} does not exist")]
    ItemNotFound {
        item_id: String,
        collection_id: String,
    },
}

/// Errors raised when a write cannot be applied.
#[derive(Error, Debug)]
pub enum ConflictError {
    #[error("collection {collection_id} already exists")]
    CollectionExists { collection_id: String },

    #[error("item {item_id} already exists in collection {collection_id}")]
    ItemExists {
        item_id: String,
        collection_id: String,
    },

    /// A store failure on a write path.
    #[error("{operation} failed for {keys}: {message}")]
    WriteFailed {
        operation: String,
        keys: String,
        message: String,
        #[source]
        source: Option<Box<BackendError>>,
    },

    /// An unordered bulk insert where some documents were rejected.
    #[error("bulk insert failed ({inserted} inserted, {} rejected): {}", .failures.len(), BulkFailureSummary(.failures))]
    BulkInsert {
        inserted: u64,
        failures: Vec<BulkWriteFailure>,
    },
}

/// A single rejected document in an unordered bulk insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkWriteFailure {
    /// Position of the document in the submitted batch.
    pub index: usize,
    /// Store error code (11000 for duplicate keys).
    pub code: i32,
    /// Human-readable failure message, including the offending key.
    pub message: String,
}

impl fmt::Display for BulkWriteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] code {}: {}", self.index, self.code, self.message)
    }
}

struct BulkFailureSummary<'a>(&'a [BulkWriteFailure]);

impl fmt::Display for BulkFailureSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", failure)?;
        }
        Ok(())
    }
}

/// Errors raised before any store call is made.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("unsupported operator '{operator}' in {context}")]
    UnsupportedOperator { operator: String, context: String },

    #[error("argument {value} of '{operator}' is not a list")]
    NotAList { operator: String, value: String },

    #[error("invalid arguments for '{operator}': {message}")]
    InvalidArguments { operator: String, message: String },

    #[error("invalid bbox {bbox:?}: {message}")]
    InvalidBbox { bbox: Vec<f64>, message: String },

    #[error("invalid datetime '{value}': {message}")]
    InvalidDatetime { value: String, message: String },

    #[error("invalid limit {limit}: {message}")]
    InvalidLimit { limit: u64, message: String },

    #[error("missing required field: {field}")]
    MissingRequiredField { field: String },

    #[error("invalid record: {message}")]
    InvalidRecord { message: String },
}

/// Errors related to search execution.
#[derive(Error, Debug)]
pub enum SearchError {
    /// The continuation token could not be decoded.
    #[error("invalid pagination token: {token}")]
    InvalidToken { token: String },
}

/// Errors originating from the document store.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("backend unavailable: {backend_name}: {message}")]
    Unavailable {
        backend_name: String,
        message: String,
    },

    #[error("connection failed to {backend_name}: {message}")]
    ConnectionFailed {
        backend_name: String,
        message: String,
    },

    /// A unique index rejected a single write.
    #[error("duplicate key in {namespace}: {key}")]
    DuplicateKey { namespace: String, key: String },

    /// An unordered insert-many where some documents were rejected.
    #[error("bulk write to {namespace} rejected {} documents", .failures.len())]
    BulkWrite {
        namespace: String,
        inserted: u64,
        failures: Vec<BulkWriteFailure>,
    },

    #[error("query execution failed: {message}")]
    QueryError { message: String },

    #[error("serialization error: {message}")]
    SerializationError { message: String },

    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Result type alias for catalog operations.
pub type StorageResult<T> = Result<T, StorageError>;

impl From<bson::ser::Error> for StorageError {
    fn from(err: bson::ser::Error) -> Self {
        StorageError::Backend(BackendError::SerializationError {
            message: err.to_string(),
        })
    }
}

impl From<bson::de::Error> for StorageError {
    fn from(err: bson::de::Error) -> Self {
        StorageError::Backend(BackendError::SerializationError {
            message: err.to_string(),
        })
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Backend(BackendError::SerializationError {
            message: err.to_string(),
        })
    }
}

#[cfg(feature = "mongodb")]
impl From<mongodb::error::Error> for StorageError {
    fn from(err: mongodb::error::Error) -> Self {
        StorageError::Backend(BackendError::from(err))
    }
}
