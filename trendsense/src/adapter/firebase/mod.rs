//! Cloud Firestore adapter.
//!
//! [FirebaseAdapter] talks to Firestore through the [FirestoreOps] seam. With
//! the `firebase` cargo feature the seam is backed by the `firestore` crate;
//! without it, or when credentials are missing or unusable, the adapter runs
//! on an owned in-memory store and reports
//! [FirebaseBackend::Fallback].

#[cfg(feature = "firebase")]
mod client;
mod credentials;
mod ops;
mod query;
mod store;

pub use credentials::*;
pub use ops::*;
pub(crate) use query::*;
pub use store::*;
