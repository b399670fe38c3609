//! Volatile in-process adapter.
//!
//! Used as a standalone backend for development and tests, and as the
//! substitute store behind [FirebaseAdapter](super::firebase::FirebaseAdapter)
//! when Firestore is unavailable.

mod store;

pub use store::*;
