//! # TrendSense - Database Adapter Layer
//!
//! Backend-agnostic document storage for the TrendSense sustainability
//! analytics platform. Application code talks to one [DatabaseAdapter]
//! and never sees which database sits behind it.
//!
//! ## Backends
//!
//! - **MongoDB**: native driver with pooled connections and true aggregation
//!   pipelines (cargo feature `mongodb`, enabled by default)
//! - **Firebase**: Cloud Firestore (cargo feature `firebase`), falling back
//!   to an owned in-memory store when Firestore cannot be used
//! - **Mock Firebase**: volatile in-process store for development and tests
//! - **Dual**: writes to a primary and a secondary adapter, reads from the
//!   primary
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use trendsense::config::DatabaseConfig;
//! use trendsense::service::DatabaseService;
//! use trendsense::filter::field;
//! use trendsense::doc;
//!
//! let service = DatabaseService::new(&DatabaseConfig::from_env()?)?;
//! let db = service.adapter();
//!
//! db.insert_one("companies", doc! { "name": "Acme Solar", "sector": "Energy" })?;
//! let energy = db.get_companies(Some("Energy"))?;
//! let top = db.find(
//!     "companies",
//!     &field("esg_score").gte(70),
//!     &FindOptions::new().sort_by("esg_score", SortOrder::Descending).limit(10),
//! )?;
//! ```
//!
//! ## Module Organization
//!
//! - [`adapter`] - Adapter contract and backend implementations
//! - [`aggregate`] - Aggregation pipelines and the in-memory stage engine
//! - [`collection`] - Documents, updates and find options
//! - [`common`] - Constants, sort order and value helpers
//! - [`compat`] - Neutral-value facade for legacy callers
//! - [`config`] - Database configuration and environment parsing
//! - [`errors`] - Error types and result definitions
//! - [`factory`] - Adapter selection from configuration
//! - [`filter`] - Typed query filters and the JSON query parser
//! - [`migration`] - Copying collections between adapters
//! - [`service`] - The database service owned by the application

pub mod adapter;
pub mod aggregate;
pub mod collection;
pub mod common;
pub mod compat;
pub mod config;
pub mod errors;
pub mod factory;
pub mod filter;
pub mod migration;
pub mod service;

pub use adapter::{AdapterKind, DatabaseAdapter, DatabaseAdapterProvider};
pub use collection::Document;
pub use errors::{DbError, DbResult, ErrorKind};
pub use service::DatabaseService;

#[cfg(test)]
mod tests {
    // Setup only one time throughout the project.
    // It will take effect during test, project wide
    #[ctor::ctor]
    fn init() {
        colog::init();
    }
}
