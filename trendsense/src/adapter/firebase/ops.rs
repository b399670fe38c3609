use serde_json::Value;

use crate::collection::Document;
use crate::common::SortOrder;
use crate::errors::DbResult;

/// Comparison operators Firestore evaluates server-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionOp {
    Equal,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    /// Matches when the field equals any element of an array value.
    In,
}

/// A single `where` clause.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldCondition {
    pub field: String,
    pub op: ConditionOp,
    pub value: Value,
}

impl FieldCondition {
    pub fn new(field: &str, op: ConditionOp, value: Value) -> FieldCondition {
        FieldCondition {
            field: field.to_string(),
            op,
            value,
        }
    }
}

/// A structured Firestore collection query. All conditions are combined with
/// AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FirestoreQuery {
    pub conditions: Vec<FieldCondition>,
    pub order_by: Vec<(String, SortOrder)>,
    pub limit: Option<u32>,
}

impl FirestoreQuery {
    pub fn new() -> FirestoreQuery {
        FirestoreQuery::default()
    }
}

/// The Firestore primitives the Firebase adapter is built on.
///
/// Documents returned by [get](Self::get) and [query](Self::query) carry
/// `_id` set from the Firestore document key. Documents passed to
/// [set](Self::set) never contain `_id`; the key is passed separately.
///
/// The production implementation wraps the `firestore` crate client; any
/// other implementation can be injected with
/// [FirebaseAdapter::with_client](super::FirebaseAdapter::with_client).
pub trait FirestoreOps: Send + Sync {
    /// Fetches one document by key.
    fn get(&self, collection: &str, id: &str) -> DbResult<Option<Document>>;

    /// Creates or fully replaces the document stored under `id`.
    fn set(&self, collection: &str, id: &str, document: &Document) -> DbResult<()>;

    /// Deletes the document stored under `id`. Deleting a missing document
    /// is not an error.
    fn delete(&self, collection: &str, id: &str) -> DbResult<()>;

    /// Runs a structured query against one collection.
    fn query(&self, collection: &str, query: &FirestoreQuery) -> DbResult<Vec<Document>>;

    /// Root collection ids.
    fn list_collections(&self) -> DbResult<Vec<String>>;
}
