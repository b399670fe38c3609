//! Typed query filters.
//!
//! Filters are built with the fluent API or parsed from the MongoDB-style
//! query documents legacy callers still pass around:
//!
//! ```rust,ignore
//! use trendsense::filter::{all, by_id, field, Filter};
//!
//! let energy = field("sector").eq("Energy").and(field("score").gte(60));
//! let same = Filter::from_json(&json!({"sector": "Energy", "score": {"$gte": 60}}))?;
//! assert_eq!(energy, same);
//! ```
//!
//! # Supported Operators
//!
//! - **Equality**: `eq`, `ne`
//! - **Comparison**: `gt`, `gte`, `lt`, `lte`
//! - **Membership**: `in`, `nin`, `exists`
//! - **Logical**: `and`, `or`
//! - **Special**: `all` (match all), `by_id` (match by `_id`)

#[allow(clippy::module_inception)]
mod filter;
mod fluent;
mod parser;

pub use filter::*;
pub use fluent::*;
