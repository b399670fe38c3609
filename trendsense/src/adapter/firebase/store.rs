use parking_lot::RwLock;
use serde_json::Value;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use super::{build_query, plan_filter, FirestoreOps, ServiceAccount};
use crate::adapter::mock::MockFirebaseAdapter;
use crate::adapter::{AdapterKind, CollectionHandle, DatabaseAdapterProvider};
use crate::aggregate::{run_stage, run_stages, Pipeline, Stage};
use crate::collection::{apply_update, auto_id, prepare_insert, upsert_document, Document, FindOptions, Update};
use crate::common::{now_timestamp, DOC_ID};
use crate::config::FirebaseConfig;
use crate::errors::{DbError, DbResult, ErrorKind};
use crate::filter::{all, Filter};

/// Why the Firebase adapter is serving from its in-memory store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// The crate was built without the `firebase` feature.
    NotCompiled,
    /// No credentials path is configured, or the file does not exist.
    MissingCredentials(String),
    /// The credentials file is not a usable service-account key.
    InvalidCredentials(String),
    /// The Firestore client could not be created.
    InitializationFailed(String),
}

impl Display for FallbackReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FallbackReason::NotCompiled => write!(f, "Firestore support is not compiled in"),
            FallbackReason::MissingCredentials(msg) => write!(f, "missing credentials: {}", msg),
            FallbackReason::InvalidCredentials(msg) => write!(f, "invalid credentials: {}", msg),
            FallbackReason::InitializationFailed(msg) => write!(f, "initialization failed: {}", msg),
        }
    }
}

/// Which store a connected Firebase adapter is using.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FirebaseBackend {
    Firestore,
    Fallback(FallbackReason),
}

enum Backend {
    Firestore(Arc<dyn FirestoreOps>),
    Fallback(FallbackReason),
}

enum Route {
    Firestore(Arc<dyn FirestoreOps>),
    Mock(MockFirebaseAdapter),
}

/// Cloud Firestore implementation of the adapter contract.
///
/// `connect()` never fails for lack of Firestore: when the client cannot be
/// created the adapter switches to an owned [MockFirebaseAdapter] and keeps
/// serving from memory. [backend](FirebaseAdapter::backend) tells the two
/// apart; [is_fallback](DatabaseAdapterProvider::is_fallback) reports the
/// same thing through the trait.
///
/// Firestore has no `_id` field. Reads synthesize it from the document key
/// and writes move it into the key. Simple equality, range and `in` clauses
/// run server-side; everything else is evaluated in memory on the fetched
/// documents.
#[derive(Clone)]
pub struct FirebaseAdapter {
    inner: Arc<FirebaseAdapterInner>,
}

impl FirebaseAdapter {
    pub fn new(config: FirebaseConfig) -> FirebaseAdapter {
        FirebaseAdapter {
            inner: Arc::new(FirebaseAdapterInner {
                config,
                injected: None,
                fallback_store: MockFirebaseAdapter::new(),
                backend: RwLock::new(None),
            }),
        }
    }

    /// Creates an adapter that uses an already initialized client instead of
    /// loading credentials.
    pub fn with_client(config: FirebaseConfig, client: Arc<dyn FirestoreOps>) -> FirebaseAdapter {
        FirebaseAdapter {
            inner: Arc::new(FirebaseAdapterInner {
                config,
                injected: Some(client),
                fallback_store: MockFirebaseAdapter::new(),
                backend: RwLock::new(None),
            }),
        }
    }

    /// The store in use, or `None` before `connect()`.
    pub fn backend(&self) -> Option<FirebaseBackend> {
        self.inner.backend.read().as_ref().map(|backend| match backend {
            Backend::Firestore(_) => FirebaseBackend::Firestore,
            Backend::Fallback(reason) => FirebaseBackend::Fallback(reason.clone()),
        })
    }

    fn route(&self) -> DbResult<Route> {
        match self.inner.backend.read().as_ref() {
            Some(Backend::Firestore(ops)) => Ok(Route::Firestore(ops.clone())),
            Some(Backend::Fallback(_)) => Ok(Route::Mock(self.inner.fallback_store.clone())),
            None => {
                log::error!("Firebase adapter is not connected");
                Err(DbError::new(
                    "Firebase adapter is not connected",
                    ErrorKind::StoreNotInitialized,
                ))
            }
        }
    }

    fn store<'a>(&'a self, ops: &'a dyn FirestoreOps) -> FirestoreStore<'a> {
        FirestoreStore {
            ops,
            legacy_stage_requery: self.inner.config.is_legacy_stage_requery(),
        }
    }
}

impl DatabaseAdapterProvider for FirebaseAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Firebase
    }

    fn connect(&self) -> DbResult<bool> {
        let mut backend = self.inner.backend.write();
        if backend.is_some() {
            return Ok(true);
        }

        let resolved = match self.inner.open_client() {
            Ok(ops) => {
                log::info!("Connected to Firestore");
                Backend::Firestore(ops)
            }
            Err(reason) => {
                log::warn!("Firestore unavailable ({}), using in-memory fallback store", reason);
                self.inner.fallback_store.connect()?;
                Backend::Fallback(reason)
            }
        };
        *backend = Some(resolved);
        Ok(true)
    }

    fn disconnect(&self) -> DbResult<()> {
        let mut backend = self.inner.backend.write();
        match backend.take() {
            Some(Backend::Fallback(_)) => self.inner.fallback_store.disconnect()?,
            Some(Backend::Firestore(_)) => log::info!("Disconnected from Firestore"),
            None => {}
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.inner.backend.read().is_some()
    }

    fn is_fallback(&self) -> bool {
        matches!(self.inner.backend.read().as_ref(), Some(Backend::Fallback(_)))
    }

    fn get_collection(&self, name: &str) -> DbResult<CollectionHandle> {
        self.route()?;
        let namespace = match self.inner.config.get_project_id() {
            Some(project) => format!("projects/{}/databases/(default)/documents/{}", project, name),
            None => name.to_string(),
        };
        Ok(CollectionHandle {
            name: name.to_string(),
            kind: AdapterKind::Firebase,
            namespace,
        })
    }

    fn initialize_collections(&self, names: &[&str]) -> DbResult<()> {
        match self.route()? {
            Route::Mock(mock) => mock.initialize_collections(names),
            Route::Firestore(_) => {
                // firestore creates collections on first write
                log::debug!("Skipping initialization of {} Firestore collections", names.len());
                Ok(())
            }
        }
    }

    fn list_collections(&self) -> DbResult<Vec<String>> {
        match self.route()? {
            Route::Mock(mock) => mock.list_collections(),
            Route::Firestore(ops) => ops.list_collections(),
        }
    }

    fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
        projection: Option<&[String]>,
    ) -> DbResult<Option<Document>> {
        match self.route()? {
            Route::Mock(mock) => mock.find_one(collection, filter, projection),
            Route::Firestore(ops) => {
                let found = self.store(ops.as_ref()).first(collection, filter)?;
                Ok(found.map(|doc| match projection {
                    Some(fields) => doc.project(fields),
                    None => doc,
                }))
            }
        }
    }

    fn find(&self, collection: &str, filter: &Filter, options: &FindOptions) -> DbResult<Vec<Document>> {
        match self.route()? {
            Route::Mock(mock) => mock.find(collection, filter, options),
            Route::Firestore(ops) => self.store(ops.as_ref()).fetch(collection, filter, options),
        }
    }

    fn insert_one(&self, collection: &str, document: Document) -> DbResult<String> {
        match self.route()? {
            Route::Mock(mock) => mock.insert_one(collection, document),
            Route::Firestore(ops) => self.store(ops.as_ref()).insert(collection, document, &now_timestamp()),
        }
    }

    fn insert_many(&self, collection: &str, documents: Vec<Document>) -> DbResult<Vec<String>> {
        match self.route()? {
            Route::Mock(mock) => mock.insert_many(collection, documents),
            Route::Firestore(ops) => {
                let store = self.store(ops.as_ref());
                let now = now_timestamp();
                documents
                    .into_iter()
                    .map(|document| store.insert(collection, document, &now))
                    .collect()
            }
        }
    }

    fn update_one(&self, collection: &str, filter: &Filter, update: &Update, upsert: bool) -> DbResult<bool> {
        match self.route()? {
            Route::Mock(mock) => mock.update_one(collection, filter, update, upsert),
            Route::Firestore(ops) => self.store(ops.as_ref()).update_one(collection, filter, update, upsert),
        }
    }

    fn update_many(&self, collection: &str, filter: &Filter, update: &Update) -> DbResult<u64> {
        match self.route()? {
            Route::Mock(mock) => mock.update_many(collection, filter, update),
            Route::Firestore(ops) => self.store(ops.as_ref()).update_many(collection, filter, update),
        }
    }

    fn delete_one(&self, collection: &str, filter: &Filter) -> DbResult<bool> {
        match self.route()? {
            Route::Mock(mock) => mock.delete_one(collection, filter),
            Route::Firestore(ops) => {
                let store = self.store(ops.as_ref());
                match store.first(collection, filter)?.and_then(|doc| doc.id()) {
                    Some(id) => {
                        ops.delete(collection, &id)?;
                        Ok(true)
                    }
                    None => Ok(false),
                }
            }
        }
    }

    fn delete_many(&self, collection: &str, filter: &Filter) -> DbResult<u64> {
        match self.route()? {
            Route::Mock(mock) => mock.delete_many(collection, filter),
            Route::Firestore(ops) => {
                let matched = self.store(ops.as_ref()).fetch(collection, filter, &FindOptions::new())?;
                let mut deleted = 0;
                for id in matched.iter().filter_map(Document::id) {
                    ops.delete(collection, &id)?;
                    deleted += 1;
                }
                Ok(deleted)
            }
        }
    }

    fn count_documents(&self, collection: &str, filter: &Filter) -> DbResult<u64> {
        match self.route()? {
            Route::Mock(mock) => mock.count_documents(collection, filter),
            Route::Firestore(ops) => {
                let matched = self.store(ops.as_ref()).fetch(collection, filter, &FindOptions::new())?;
                Ok(matched.len() as u64)
            }
        }
    }

    fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> DbResult<Vec<Document>> {
        match self.route()? {
            Route::Mock(mock) => mock.aggregate(collection, pipeline),
            Route::Firestore(ops) => self.store(ops.as_ref()).aggregate(collection, pipeline),
        }
    }
}

struct FirebaseAdapterInner {
    config: FirebaseConfig,
    injected: Option<Arc<dyn FirestoreOps>>,
    fallback_store: MockFirebaseAdapter,
    backend: RwLock<Option<Backend>>,
}

impl FirebaseAdapterInner {
    fn open_client(&self) -> Result<Arc<dyn FirestoreOps>, FallbackReason> {
        if let Some(client) = &self.injected {
            return Ok(client.clone());
        }

        let path = match self.config.get_credentials_path() {
            Some(path) if path.is_file() => path,
            Some(path) => {
                return Err(FallbackReason::MissingCredentials(format!(
                    "{} does not exist",
                    path.display()
                )))
            }
            None => {
                return Err(FallbackReason::MissingCredentials(
                    "no credentials path configured".to_string(),
                ))
            }
        };
        let account = ServiceAccount::load(path)
            .map_err(|e| FallbackReason::InvalidCredentials(e.message().to_string()))?;
        let project_id = self.config.get_project_id().unwrap_or(&account.project_id);
        create_client(project_id, path)
    }
}

#[cfg(feature = "firebase")]
fn create_client(project_id: &str, credentials: &std::path::Path) -> Result<Arc<dyn FirestoreOps>, FallbackReason> {
    match super::client::FirestoreClient::connect(project_id, credentials) {
        Ok(client) => Ok(Arc::new(client)),
        Err(err) => Err(FallbackReason::InitializationFailed(err.message().to_string())),
    }
}

#[cfg(not(feature = "firebase"))]
fn create_client(_project_id: &str, _credentials: &std::path::Path) -> Result<Arc<dyn FirestoreOps>, FallbackReason> {
    Err(FallbackReason::NotCompiled)
}

/// Adapter operations expressed over the Firestore primitives.
struct FirestoreStore<'a> {
    ops: &'a dyn FirestoreOps,
    legacy_stage_requery: bool,
}

impl FirestoreStore<'_> {
    fn fetch(&self, collection: &str, filter: &Filter, options: &FindOptions) -> DbResult<Vec<Document>> {
        let fetched: Vec<Document> = match filter.id_lookup() {
            Some(id) => self.ops.get(collection, &id)?.into_iter().collect(),
            None => {
                let query = build_query(plan_filter(filter), options);
                self.ops.query(collection, &query)?
            }
        };
        let matched = fetched.into_iter().filter(|doc| filter.apply(doc)).collect();
        Ok(options.apply(matched))
    }

    fn first(&self, collection: &str, filter: &Filter) -> DbResult<Option<Document>> {
        let mut found = self.fetch(collection, filter, &FindOptions::new().limit(1))?;
        Ok(found.pop())
    }

    fn insert(&self, collection: &str, document: Document, now: &str) -> DbResult<String> {
        let mut document = document;
        if matches!(document.get(DOC_ID), None | Some(Value::Null)) {
            document.set_id(auto_id());
        }
        let id = prepare_insert(&mut document, now)?;
        if self.ops.get(collection, &id)?.is_some() {
            log::error!("Document with _id {} already exists in {}", id, collection);
            return Err(DbError::new(
                &format!("Duplicate _id {} in collection {}", id, collection),
                ErrorKind::DuplicateKey,
            ));
        }
        self.ops.set(collection, &id, &document.without_id())?;
        log::debug!("Inserted document {} into Firestore collection {}", id, collection);
        Ok(id)
    }

    fn update_one(&self, collection: &str, filter: &Filter, update: &Update, upsert: bool) -> DbResult<bool> {
        let now = now_timestamp();
        if let Some(mut document) = self.first(collection, filter)? {
            if let Some(id) = document.id() {
                apply_update(&mut document, update, &now)?;
                self.ops.set(collection, &id, &document.without_id())?;
                return Ok(true);
            }
        }

        if !upsert {
            return Ok(false);
        }
        let (mut id, mut document) = upsert_document(filter, update, &now)?;
        if filter.id_lookup().is_none() {
            id = auto_id();
            document.set_id(id.clone());
        }
        self.ops.set(collection, &id, &document.without_id())?;
        log::debug!("Upserted document {} into Firestore collection {}", id, collection);
        Ok(true)
    }

    fn update_many(&self, collection: &str, filter: &Filter, update: &Update) -> DbResult<u64> {
        let now = now_timestamp();
        let matched = self.fetch(collection, filter, &FindOptions::new())?;

        let mut staged = Vec::with_capacity(matched.len());
        for mut document in matched {
            if let Some(id) = document.id() {
                apply_update(&mut document, update, &now)?;
                staged.push((id, document));
            }
        }
        for (id, document) in &staged {
            self.ops.set(collection, id, &document.without_id())?;
        }
        Ok(staged.len() as u64)
    }

    /// The leading `$match` is pushed to Firestore and every later stage runs
    /// over the previous stage's output.
    fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> DbResult<Vec<Document>> {
        if self.legacy_stage_requery {
            return self.aggregate_requery(collection, pipeline);
        }

        let stages = pipeline.stages();
        let (documents, rest) = match stages.split_first() {
            Some((Stage::Match(filter), rest)) => (self.fetch(collection, filter, &FindOptions::new())?, rest),
            _ => (self.fetch(collection, &all(), &FindOptions::new())?, stages),
        };
        Ok(run_stages(AdapterKind::Firebase.as_str(), documents, rest))
    }

    /// `$match`, `$sort` and `$limit` each issue a fresh collection query
    /// that ignores earlier stages; `$skip` and `$project` shape the current
    /// results.
    fn aggregate_requery(&self, collection: &str, pipeline: &Pipeline) -> DbResult<Vec<Document>> {
        let mut documents = Vec::new();
        for stage in pipeline.stages() {
            documents = match stage {
                Stage::Match(filter) => self.fetch(collection, filter, &FindOptions::new())?,
                Stage::Sort(keys) => {
                    let mut options = FindOptions::new();
                    for (field, order) in keys {
                        options = options.sort_by(field, *order);
                    }
                    self.fetch(collection, &all(), &options)?
                }
                Stage::Limit(limit) => self.fetch(collection, &all(), &FindOptions::new().limit(*limit))?,
                other => run_stage(AdapterKind::Firebase.as_str(), documents, other),
            };
        }
        Ok(documents)
    }
}
