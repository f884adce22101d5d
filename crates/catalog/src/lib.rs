//! Helios Catalog Search Backend
//!
//! This crate implements the storage side of a spatio-temporal asset catalog:
//! translating CQL2 JSON filters into MongoDB queries, executing paginated item
//! searches with stable ordering and opaque continuation tokens, and writing
//! collections and items idempotently over a document store.
//!
//! # Features
//!
//! - **CQL2 Filters**: logical, comparison, `like`, `in`, `between` and
//!   `s_intersects` operators with queryable aliases
//! - **Pagination**: stable sort with tie-breakers and base64 offset tokens
//! - **Writes**: create, update, delete, unordered bulk insert and
//!   collection rename with cascading item updates
//! - **Indexes**: idempotent startup index creation
//!
//! # Backend Features
//!
//! - in-memory store (always available)
//! - `mongodb` - the official MongoDB driver
//!
//! # Architecture
//!
//! - [`types`] - records, sort specifications, search requests and pages
//! - [`filter`] - CQL2 parsing and translation
//! - [`search`] - query assembly and paginated execution
//! - [`core`] - the store client trait, transactions, indexes and the
//!   [`Catalog`] facade
//! - [`serializer`] - JSON to BSON record conversion
//! - [`backends`] - store implementations
//! - [`error`] - error types for all operations
//!
//! # Filters
//!
//! ```
//! use helios_catalog::filter::FilterTranslator;
//! use serde_json::json;
//!
//! let translator = FilterTranslator::default();
//! let query = translator
//!     .translate(&json!({
//!         "op": "and",
//!         "args": [
//!             {"op": "=", "args": [{"property": "collection"}, "landsat"]},
//!             {"op": "<", "args": [{"property": "cloud_cover"}, 20]}
//!         ]
//!     }))
//!     .unwrap();
//!
//! assert!(query.contains_key("$and"));
//! ```
//!
//! # Pagination Tokens
//!
//! ```
//! use helios_catalog::types::{Cursor, PaginationCodec};
//!
//! let token = PaginationCodec::encode(&Cursor::Offset(20));
//! assert_eq!(PaginationCodec::decode_offset(&token).unwrap(), 20);
//! assert!(PaginationCodec::decode_offset("not a token!").is_err());
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
pub mod config;
pub mod core;
pub mod error;
pub mod filter;
pub mod search;
pub mod serializer;
pub mod types;

// Re-export commonly used types at crate root
pub use config::CatalogConfig;
pub use error::{ErrorKind, StorageError, StorageResult};
pub use types::{Collection, Item, SearchPage, SearchRequest};

// Re-export core components
pub use core::{
    BlockingCatalog, Catalog, DocumentStore, FindOptions, IndexManager, IndexReport,
    TransactionManager,
};
pub use search::{SearchAdapter, SearchExecutor};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
