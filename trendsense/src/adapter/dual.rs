use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::adapter::{AdapterKind, CollectionHandle, DatabaseAdapter, DatabaseAdapterProvider};
use crate::aggregate::Pipeline;
use crate::collection::{Document, FindOptions, Update};
use crate::common::now_timestamp;
use crate::errors::DbResult;
use crate::filter::Filter;

/// Composes two adapters: reads come from the primary only, writes go to the
/// primary and are then replayed on the secondary.
///
/// A primary failure fails the call and leaves the secondary untouched. A
/// secondary failure is logged as a warning and never reaches the caller, so
/// the two stores may drift apart. There is no cross-store atomicity.
///
/// Inserts are stamped once before they reach the primary, and the key the
/// primary assigns is forced onto the secondary copy, so both stores hold the
/// same document under the same `_id`.
#[derive(Clone)]
pub struct DualDatabaseAdapter {
    inner: Arc<DualAdapterInner>,
}

struct DualAdapterInner {
    primary: DatabaseAdapter,
    secondary: DatabaseAdapter,
    secondary_connected: AtomicBool,
}

impl DualDatabaseAdapter {
    pub fn new(primary: DatabaseAdapter, secondary: DatabaseAdapter) -> DualDatabaseAdapter {
        DualDatabaseAdapter {
            inner: Arc::new(DualAdapterInner {
                primary,
                secondary,
                secondary_connected: AtomicBool::new(false),
            }),
        }
    }

    pub fn primary(&self) -> &DatabaseAdapter {
        &self.inner.primary
    }

    pub fn secondary(&self) -> &DatabaseAdapter {
        &self.inner.secondary
    }

    /// Connects the secondary if it is not connected yet.
    fn ensure_secondary(&self) -> bool {
        if self.inner.secondary_connected.load(Ordering::Acquire) {
            return true;
        }
        match self.inner.secondary.connect() {
            Ok(true) => {
                self.inner.secondary_connected.store(true, Ordering::Release);
                true
            }
            Ok(false) => false,
            Err(err) => {
                log::warn!("Secondary {} adapter failed to connect: {}", self.inner.secondary.kind(), err);
                false
            }
        }
    }

    fn replicate<F>(&self, operation: &str, collection: &str, write: F)
    where
        F: FnOnce(&DatabaseAdapter) -> DbResult<()>,
    {
        if !self.ensure_secondary() {
            log::warn!(
                "Skipping {} on {} for secondary {} adapter: not connected",
                operation,
                collection,
                self.inner.secondary.kind()
            );
            return;
        }
        if let Err(err) = write(&self.inner.secondary) {
            log::warn!(
                "Secondary {} adapter failed {} on {}: {}",
                self.inner.secondary.kind(),
                operation,
                collection,
                err
            );
        }
    }
}

impl DatabaseAdapterProvider for DualDatabaseAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Dual
    }

    fn connect(&self) -> DbResult<bool> {
        if !self.inner.primary.connect()? {
            log::error!("Primary {} adapter failed to connect", self.inner.primary.kind());
            return Ok(false);
        }
        if !self.ensure_secondary() {
            log::warn!(
                "Secondary {} adapter is unavailable, writes will retry it",
                self.inner.secondary.kind()
            );
        }
        log::info!(
            "Dual adapter connected (primary {}, secondary {})",
            self.inner.primary.kind(),
            self.inner.secondary.kind()
        );
        Ok(true)
    }

    fn disconnect(&self) -> DbResult<()> {
        self.inner.primary.disconnect()?;
        if self.inner.secondary_connected.swap(false, Ordering::AcqRel) {
            if let Err(err) = self.inner.secondary.disconnect() {
                log::warn!("Secondary {} adapter failed to disconnect: {}", self.inner.secondary.kind(), err);
            }
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.inner.primary.is_connected()
    }

    fn is_fallback(&self) -> bool {
        self.inner.primary.is_fallback()
    }

    fn get_collection(&self, name: &str) -> DbResult<CollectionHandle> {
        self.inner.primary.get_collection(name)
    }

    fn initialize_collections(&self, names: &[&str]) -> DbResult<()> {
        self.inner.primary.initialize_collections(names)?;
        self.replicate("initialize_collections", &names.join(","), |secondary| {
            secondary.initialize_collections(names)
        });
        Ok(())
    }

    fn list_collections(&self) -> DbResult<Vec<String>> {
        self.inner.primary.list_collections()
    }

    fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
        projection: Option<&[String]>,
    ) -> DbResult<Option<Document>> {
        self.inner.primary.find_one(collection, filter, projection)
    }

    fn find(&self, collection: &str, filter: &Filter, options: &FindOptions) -> DbResult<Vec<Document>> {
        self.inner.primary.find(collection, filter, options)
    }

    fn insert_one(&self, collection: &str, document: Document) -> DbResult<String> {
        let mut document = document;
        document.stamp_created(&now_timestamp());

        let id = self.inner.primary.insert_one(collection, document.clone())?;
        document.set_id(id.clone());
        self.replicate("insert_one", collection, |secondary| {
            secondary.insert_one(collection, document).map(|_| ())
        });
        Ok(id)
    }

    fn insert_many(&self, collection: &str, documents: Vec<Document>) -> DbResult<Vec<String>> {
        let now = now_timestamp();
        let mut documents = documents;
        for document in documents.iter_mut() {
            document.stamp_created(&now);
        }

        let ids = self.inner.primary.insert_many(collection, documents.clone())?;
        for (document, id) in documents.iter_mut().zip(&ids) {
            document.set_id(id.clone());
        }
        self.replicate("insert_many", collection, |secondary| {
            secondary.insert_many(collection, documents).map(|_| ())
        });
        Ok(ids)
    }

    fn update_one(&self, collection: &str, filter: &Filter, update: &Update, upsert: bool) -> DbResult<bool> {
        let changed = self.inner.primary.update_one(collection, filter, update, upsert)?;
        if changed {
            self.replicate("update_one", collection, |secondary| {
                secondary.update_one(collection, filter, update, upsert).map(|_| ())
            });
        }
        Ok(changed)
    }

    fn update_many(&self, collection: &str, filter: &Filter, update: &Update) -> DbResult<u64> {
        let modified = self.inner.primary.update_many(collection, filter, update)?;
        if modified > 0 {
            self.replicate("update_many", collection, |secondary| {
                secondary.update_many(collection, filter, update).map(|_| ())
            });
        }
        Ok(modified)
    }

    fn delete_one(&self, collection: &str, filter: &Filter) -> DbResult<bool> {
        let deleted = self.inner.primary.delete_one(collection, filter)?;
        if deleted {
            self.replicate("delete_one", collection, |secondary| {
                secondary.delete_one(collection, filter).map(|_| ())
            });
        }
        Ok(deleted)
    }

    fn delete_many(&self, collection: &str, filter: &Filter) -> DbResult<u64> {
        let deleted = self.inner.primary.delete_many(collection, filter)?;
        if deleted > 0 {
            self.replicate("delete_many", collection, |secondary| {
                secondary.delete_many(collection, filter).map(|_| ())
            });
        }
        Ok(deleted)
    }

    fn count_documents(&self, collection: &str, filter: &Filter) -> DbResult<u64> {
        self.inner.primary.count_documents(collection, filter)
    }

    fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> DbResult<Vec<Document>> {
        self.inner.primary.aggregate(collection, pipeline)
    }
}
