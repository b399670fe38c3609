//! Database adapters.
//!
//! Every backend implements [DatabaseAdapterProvider] and is handed out as a
//! cheap-to-clone [DatabaseAdapter]. The backends are:
//!
//! * [mongodb::MongoDbAdapter] - native MongoDB through the blocking driver
//!   (cargo feature `mongodb`, on by default)
//! * [firebase::FirebaseAdapter] - Cloud Firestore, falling back to an owned
//!   in-memory store when Firestore cannot be reached
//! * [mock::MockFirebaseAdapter] - volatile in-process store
//! * [dual::DualDatabaseAdapter] - writes to two adapters, reads from the
//!   primary

#[allow(clippy::module_inception)]
mod adapter;
mod domain;
mod kind;

pub mod dual;
pub mod firebase;
pub mod mock;
#[cfg(feature = "mongodb")]
pub mod mongodb;

pub use adapter::*;
pub use kind::*;
