//! Filter translation.
//!
//! Turns CQL2 JSON expressions, bounding boxes and geometries into store query
//! fragments. All functions here are pure and fail with a
//! [`ValidationError`](crate::error::ValidationError) before any store call.

pub mod cql2;
mod geometry;
mod like;
mod queryables;
mod translate;

pub use cql2::{ComparisonOp, Expr};
pub use geometry::{GEOMETRY_FIELD, bbox_to_polygon, intersects_predicate};
pub use like::like_to_regex;
pub use queryables::QueryablesMapping;
pub use translate::{FilterTranslator, coerce_numeric};

pub(crate) use translate::{comparison, comparison_literal};
