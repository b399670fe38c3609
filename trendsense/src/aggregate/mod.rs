//! Aggregation pipelines.
//!
//! A [Pipeline] is an ordered list of [Stage]s. MongoDB runs pipelines
//! natively; every other backend interprets the `$match`, `$sort`, `$limit`,
//! `$skip` and `$project` subset with the in-memory engine and skips any
//! other stage with a warning.

mod engine;
mod pipeline;

pub(crate) use engine::*;
pub use pipeline::*;
