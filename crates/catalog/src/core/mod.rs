//! Store client abstraction and the catalog components built on it.
//!
//! - [`DocumentStore`] - the asynchronous store client
//! - [`TransactionManager`] - record writes
//! - [`IndexManager`] - startup index creation
//! - [`Catalog`] - a facade wiring every component to one store
//! - [`BlockingCatalog`] - the facade for callers without an async runtime

mod blocking;
mod catalog;
mod indexes;
mod store;
mod transaction;

pub use blocking::BlockingCatalog;
pub use catalog::Catalog;
pub use indexes::{IndexManager, IndexReport, collection_indexes, item_indexes};
pub use store::{DocumentStore, FindOptions};
pub use transaction::TransactionManager;
