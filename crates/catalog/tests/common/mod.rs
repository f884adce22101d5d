//! Test infrastructure for the catalog.
//!
//! Fixtures build collection and item JSON; the harness wires a [`Catalog`]
//! to a fresh in-memory store.

#![allow(dead_code)]

pub mod fixtures;
pub mod harness;

pub use fixtures::*;
pub use harness::*;
