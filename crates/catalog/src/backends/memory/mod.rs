//! In-memory document store.
//!
//! [`MemoryStore`] implements [`DocumentStore`](crate::core::DocumentStore)
//! without a database server. It evaluates the MongoDB query subset the
//! catalog emits, including planar `$geoIntersects`, and enforces unique
//! indexes, so catalog behavior can be exercised end to end in tests.

mod geo;
mod matcher;
mod store;

pub use geo::Geometry;
pub use store::{DUPLICATE_KEY_CODE, MemoryStore, Operation};
