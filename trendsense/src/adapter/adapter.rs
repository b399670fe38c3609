use std::ops::Deref;
use std::sync::Arc;

use super::AdapterKind;
use crate::aggregate::Pipeline;
use crate::collection::{Document, FindOptions, Update};
use crate::errors::DbResult;
use crate::filter::Filter;

/// Description of a backend-native collection handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionHandle {
    /// Collection name as passed by the caller.
    pub name: String,
    /// Backend that owns the collection.
    pub kind: AdapterKind,
    /// Fully qualified native location, e.g. `trendsense.companies` for
    /// MongoDB or the Firestore collection path.
    pub namespace: String,
}

/// Contract every database backend implements.
///
/// # Purpose
/// Lets the rest of the application store and query schema-less documents
/// without knowing which database sits behind it. All operations are
/// blocking and return [DbResult]; backend failures are translated into
/// [DbError](crate::errors::DbError) values and never leak driver types.
///
/// # Lifecycle
/// An adapter is constructed disconnected. [connect](Self::connect) must
/// succeed before any data operation; until then data operations fail with
/// [ErrorKind::StoreNotInitialized](crate::errors::ErrorKind::StoreNotInitialized).
///
/// # Document conventions
/// - Every document read back carries `_id` populated from the store's key
/// - Inserts generate `_id` when missing and stamp `created_at`/`updated_at`
///   when they are absent
/// - Updates merge fields into the stored document, refresh `updated_at`,
///   and never alter `_id` or `created_at`
///
/// # Thread Safety
/// Implementers must be `Send + Sync`; one adapter is shared by every
/// request handler.
pub trait DatabaseAdapterProvider: Send + Sync {
    /// Backend this adapter talks to.
    fn kind(&self) -> AdapterKind;

    /// Connects to the backend. Idempotent.
    ///
    /// Returns `Ok(false)` (after logging the cause) when the backend cannot
    /// be reached, and `Err` only for misconfiguration.
    fn connect(&self) -> DbResult<bool>;

    /// Releases the connection. Safe to call when already disconnected.
    fn disconnect(&self) -> DbResult<()>;

    /// Whether the adapter is usable. MongoDB pings the server.
    fn is_connected(&self) -> bool;

    /// `true` when the adapter is serving requests from a substitute store
    /// instead of the backend it was configured for.
    fn is_fallback(&self) -> bool {
        false
    }

    /// Describes the native handle for a collection.
    fn get_collection(&self, name: &str) -> DbResult<CollectionHandle>;

    /// Makes sure the named collections exist. Idempotent.
    fn initialize_collections(&self, names: &[&str]) -> DbResult<()>;

    /// Names of the collections currently present.
    fn list_collections(&self) -> DbResult<Vec<String>>;

    /// Returns the first document matching `filter`, optionally projected to
    /// the listed fields (`_id` is always kept).
    fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
        projection: Option<&[String]>,
    ) -> DbResult<Option<Document>>;

    /// Returns the documents matching `filter`, shaped by `options`.
    fn find(&self, collection: &str, filter: &Filter, options: &FindOptions) -> DbResult<Vec<Document>>;

    /// Inserts a document and returns its `_id`.
    fn insert_one(&self, collection: &str, document: Document) -> DbResult<String>;

    /// Inserts documents in order and returns their `_id`s in the same order.
    fn insert_many(&self, collection: &str, documents: Vec<Document>) -> DbResult<Vec<String>>;

    /// Merges `update` into the first matching document. With `upsert`, a
    /// missing document is created from the filter's equality fields.
    ///
    /// Returns `true` when a document was modified or created.
    fn update_one(&self, collection: &str, filter: &Filter, update: &Update, upsert: bool) -> DbResult<bool>;

    /// Merges `update` into every matching document and returns how many
    /// were modified.
    fn update_many(&self, collection: &str, filter: &Filter, update: &Update) -> DbResult<u64>;

    /// Deletes the first matching document.
    fn delete_one(&self, collection: &str, filter: &Filter) -> DbResult<bool>;

    /// Deletes every matching document and returns how many were removed.
    fn delete_many(&self, collection: &str, filter: &Filter) -> DbResult<u64>;

    /// Counts the documents matching `filter`.
    fn count_documents(&self, collection: &str, filter: &Filter) -> DbResult<u64>;

    /// Runs an aggregation pipeline over a collection.
    ///
    /// Backends without a native pipeline interpret `$match`, `$sort`,
    /// `$limit`, `$skip` and `$project` and skip other stages with a warning,
    /// so callers must tolerate partial execution.
    fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> DbResult<Vec<Document>>;
}

/// Shared handle to a database adapter.
///
/// Cloning is cheap; all clones point at the same backend connection. The
/// handle dereferences to the provider, so every [DatabaseAdapterProvider]
/// method is available directly, and adds the domain helpers such as
/// [get_companies](DatabaseAdapter::get_companies).
///
/// ```rust,ignore
/// let adapter = DatabaseAdapter::new(MockFirebaseAdapter::new());
/// adapter.connect()?;
/// let id = adapter.insert_one("companies", doc! { "name": "Acme" })?;
/// let company = adapter.find_one("companies", &by_id(&id), None)?;
/// ```
#[derive(Clone)]
pub struct DatabaseAdapter {
    inner: Arc<dyn DatabaseAdapterProvider>,
}

impl DatabaseAdapter {
    pub fn new<T: DatabaseAdapterProvider + 'static>(inner: T) -> Self {
        DatabaseAdapter { inner: Arc::new(inner) }
    }

    /// Wraps an adapter that is already shared.
    pub fn from_arc(inner: Arc<dyn DatabaseAdapterProvider>) -> Self {
        DatabaseAdapter { inner }
    }
}

impl Deref for DatabaseAdapter {
    type Target = Arc<dyn DatabaseAdapterProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl std::fmt::Debug for DatabaseAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseAdapter")
            .field("kind", &self.inner.kind())
            .field("fallback", &self.inner.is_fallback())
            .finish()
    }
}
