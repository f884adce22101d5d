//! Document store implementations.
//!
//! - [`memory`] - an in-process store, always available
//! - `mongodb` - a MongoDB client, behind the `mongodb` feature

pub mod memory;

#[cfg(feature = "mongodb")]
pub mod mongodb;
