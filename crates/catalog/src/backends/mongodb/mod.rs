//! MongoDB document store.
//!
//! [`MongoStore`] maps every [`DocumentStore`](crate::core::DocumentStore)
//! operation onto the official driver. Unique index rejections surface as
//! `BackendError::DuplicateKey` and partially failed unordered inserts as
//! `BackendError::BulkWrite`.

mod config;
mod store;

pub use config::MongoConfig;
pub use store::MongoStore;
