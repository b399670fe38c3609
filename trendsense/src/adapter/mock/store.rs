use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::adapter::{AdapterKind, CollectionHandle, DatabaseAdapterProvider};
use crate::aggregate::{run_stages, Pipeline};
use crate::collection::{apply_update, prepare_insert, upsert_document, Document, FindOptions, Update};
use crate::common::now_timestamp;
use crate::errors::{DbError, DbResult, ErrorKind};
use crate::filter::Filter;

type DocumentMap = IndexMap<String, Document>;

/// In-memory implementation of the adapter contract.
///
/// # Characteristics
/// - **Thread-Safe**: all collections sit behind one `parking_lot` lock
/// - **Full filter support**: every [Filter] operator is evaluated in memory
///   with a linear scan
/// - **Volatile**: nothing survives the process; disconnecting keeps the
///   data so a reconnect sees it again
///
/// Clones share the same data.
#[derive(Clone, Default)]
pub struct MockFirebaseAdapter {
    inner: Arc<MockStoreInner>,
}

impl MockFirebaseAdapter {
    pub fn new() -> MockFirebaseAdapter {
        MockFirebaseAdapter::default()
    }

    /// Drops every collection.
    pub fn clear(&self) {
        self.inner.collections.write().clear();
    }
}

impl DatabaseAdapterProvider for MockFirebaseAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::MockFirebase
    }

    fn connect(&self) -> DbResult<bool> {
        if !self.inner.connected.swap(true, Ordering::AcqRel) {
            log::info!("Connected to in-memory Mock Firebase store");
        }
        Ok(true)
    }

    fn disconnect(&self) -> DbResult<()> {
        if self.inner.connected.swap(false, Ordering::AcqRel) {
            log::info!("Disconnected from in-memory Mock Firebase store");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Acquire)
    }

    fn get_collection(&self, name: &str) -> DbResult<CollectionHandle> {
        self.inner.check_connected()?;
        Ok(CollectionHandle {
            name: name.to_string(),
            kind: AdapterKind::MockFirebase,
            namespace: name.to_string(),
        })
    }

    fn initialize_collections(&self, names: &[&str]) -> DbResult<()> {
        self.inner.check_connected()?;
        let mut collections = self.inner.collections.write();
        for name in names {
            collections.entry(name.to_string()).or_default();
        }
        log::debug!("Initialized {} collections in Mock Firebase store", names.len());
        Ok(())
    }

    fn list_collections(&self) -> DbResult<Vec<String>> {
        self.inner.check_connected()?;
        Ok(self.inner.collections.read().keys().cloned().collect())
    }

    fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
        projection: Option<&[String]>,
    ) -> DbResult<Option<Document>> {
        self.inner.check_connected()?;
        let collections = self.inner.collections.read();
        let found = collections
            .get(collection)
            .and_then(|docs| first_match(docs, filter))
            .map(|(_, doc)| match projection {
                Some(fields) => doc.project(fields),
                None => doc.clone(),
            });
        Ok(found)
    }

    fn find(&self, collection: &str, filter: &Filter, options: &FindOptions) -> DbResult<Vec<Document>> {
        self.inner.check_connected()?;
        let matched = {
            let collections = self.inner.collections.read();
            match collections.get(collection) {
                Some(docs) => docs.values().filter(|doc| filter.apply(doc)).cloned().collect(),
                None => Vec::new(),
            }
        };
        Ok(options.apply(matched))
    }

    fn insert_one(&self, collection: &str, document: Document) -> DbResult<String> {
        self.inner.check_connected()?;
        let mut document = document;
        let id = prepare_insert(&mut document, &now_timestamp())?;

        let mut collections = self.inner.collections.write();
        let docs = collections.entry(collection.to_string()).or_default();
        insert_new(docs, collection, id.clone(), document)?;
        log::debug!("Inserted document {} into {}", id, collection);
        Ok(id)
    }

    fn insert_many(&self, collection: &str, documents: Vec<Document>) -> DbResult<Vec<String>> {
        self.inner.check_connected()?;
        let now = now_timestamp();
        let mut prepared = Vec::with_capacity(documents.len());
        for mut document in documents {
            let id = prepare_insert(&mut document, &now)?;
            prepared.push((id, document));
        }

        // ordered insert: documents before a duplicate stay inserted
        let mut collections = self.inner.collections.write();
        let docs = collections.entry(collection.to_string()).or_default();
        let mut ids = Vec::with_capacity(prepared.len());
        for (id, document) in prepared {
            insert_new(docs, collection, id.clone(), document)?;
            ids.push(id);
        }
        log::debug!("Inserted {} documents into {}", ids.len(), collection);
        Ok(ids)
    }

    fn update_one(&self, collection: &str, filter: &Filter, update: &Update, upsert: bool) -> DbResult<bool> {
        self.inner.check_connected()?;
        let now = now_timestamp();
        let mut collections = self.inner.collections.write();

        if let Some(docs) = collections.get_mut(collection) {
            if let Some(id) = first_match(docs, filter).map(|(id, _)| id.clone()) {
                if let Some(stored) = docs.get_mut(&id) {
                    let mut updated = stored.clone();
                    apply_update(&mut updated, update, &now)?;
                    *stored = updated;
                    return Ok(true);
                }
            }
        }

        if !upsert {
            return Ok(false);
        }
        let (id, document) = upsert_document(filter, update, &now)?;
        let docs = collections.entry(collection.to_string()).or_default();
        insert_new(docs, collection, id.clone(), document)?;
        log::debug!("Upserted document {} into {}", id, collection);
        Ok(true)
    }

    fn update_many(&self, collection: &str, filter: &Filter, update: &Update) -> DbResult<u64> {
        self.inner.check_connected()?;
        let now = now_timestamp();
        let mut collections = self.inner.collections.write();
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };

        // stage every change first so a failing update leaves the collection untouched
        let mut staged = Vec::new();
        for (id, doc) in docs.iter().filter(|(_, doc)| filter.apply(doc)) {
            let mut updated = doc.clone();
            apply_update(&mut updated, update, &now)?;
            staged.push((id.clone(), updated));
        }

        let count = staged.len() as u64;
        for (id, updated) in staged {
            docs.insert(id, updated);
        }
        Ok(count)
    }

    fn delete_one(&self, collection: &str, filter: &Filter) -> DbResult<bool> {
        self.inner.check_connected()?;
        let mut collections = self.inner.collections.write();
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(false);
        };
        match first_match(docs, filter).map(|(id, _)| id.clone()) {
            Some(id) => Ok(docs.shift_remove(&id).is_some()),
            None => Ok(false),
        }
    }

    fn delete_many(&self, collection: &str, filter: &Filter) -> DbResult<u64> {
        self.inner.check_connected()?;
        let mut collections = self.inner.collections.write();
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|_, doc| !filter.apply(doc));
        Ok((before - docs.len()) as u64)
    }

    fn count_documents(&self, collection: &str, filter: &Filter) -> DbResult<u64> {
        self.inner.check_connected()?;
        let collections = self.inner.collections.read();
        let count = collections
            .get(collection)
            .map(|docs| docs.values().filter(|doc| filter.apply(doc)).count())
            .unwrap_or(0);
        Ok(count as u64)
    }

    fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> DbResult<Vec<Document>> {
        self.inner.check_connected()?;
        let documents: Vec<Document> = {
            let collections = self.inner.collections.read();
            collections
                .get(collection)
                .map(|docs| docs.values().cloned().collect())
                .unwrap_or_default()
        };
        Ok(run_stages(AdapterKind::MockFirebase.as_str(), documents, pipeline.stages()))
    }
}

#[derive(Default)]
struct MockStoreInner {
    connected: AtomicBool,
    collections: RwLock<IndexMap<String, DocumentMap>>,
}

impl MockStoreInner {
    fn check_connected(&self) -> DbResult<()> {
        if self.connected.load(Ordering::Acquire) {
            Ok(())
        } else {
            log::error!("Mock Firebase store is not connected");
            Err(DbError::new(
                "Mock Firebase store is not connected",
                ErrorKind::StoreNotInitialized,
            ))
        }
    }
}

fn first_match<'a>(docs: &'a DocumentMap, filter: &Filter) -> Option<(&'a String, &'a Document)> {
    if let Some(id) = filter.id_lookup() {
        return docs.get_key_value(&id).filter(|(_, doc)| filter.apply(doc));
    }
    docs.iter().find(|(_, doc)| filter.apply(doc))
}

fn insert_new(docs: &mut DocumentMap, collection: &str, id: String, document: Document) -> DbResult<()> {
    if docs.contains_key(&id) {
        log::error!("Document with _id {} already exists in {}", id, collection);
        return Err(DbError::new(
            &format!("Duplicate _id {} in collection {}", id, collection),
            ErrorKind::DuplicateKey,
        ));
    }
    docs.insert(id, document);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Pipeline;
    use crate::common::SortOrder;
    use crate::doc;
    use crate::filter::{all, by_id, field};
    use serde_json::json;
    use std::thread;

    fn connected() -> MockFirebaseAdapter {
        let adapter = MockFirebaseAdapter::new();
        assert!(adapter.connect().unwrap());
        adapter
    }

    #[test]
    fn test_requires_connect() {
        let adapter = MockFirebaseAdapter::new();
        assert!(!adapter.is_connected());
        let err = adapter.insert_one("c", doc! { "a": 1 }).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::StoreNotInitialized);
        assert!(adapter.get_collection("c").is_err());
    }

    #[test]
    fn test_connect_and_disconnect_idempotent() {
        let adapter = connected();
        assert!(adapter.connect().unwrap());
        adapter.disconnect().unwrap();
        adapter.disconnect().unwrap();
        assert!(!adapter.is_connected());
    }

    #[test]
    fn test_round_trip() {
        let adapter = connected();
        let id = adapter.insert_one("companies", doc! { "name": "Acme", "score": 3 }).unwrap();
        let found = adapter.find_one("companies", &by_id(&id), None).unwrap().unwrap();
        assert_eq!(found.id(), Some(id));
        assert_eq!(found.get_str("name"), Some("Acme"));
        assert!(found.contains_key("created_at"));
        assert!(found.contains_key("updated_at"));
    }

    #[test]
    fn test_numeric_id_round_trip() {
        let adapter = connected();
        let id = adapter.insert_one("c", doc! { "_id": 5, "a": 1 }).unwrap();
        assert_eq!(id, "5");

        let found = adapter.find_one("c", &by_id(&id), None).unwrap().unwrap();
        assert_eq!(found.get("_id"), Some(&json!("5")));
        assert_eq!(found.get("a"), Some(&json!(1)));

        let err = adapter.insert_one("c", doc! { "_id": "5", "a": 2 }).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::DuplicateKey);
        assert_eq!(adapter.count_documents("c", &by_id("5")).unwrap(), 1);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let adapter = connected();
        adapter.insert_one("c", doc! { "_id": "x" }).unwrap();
        let err = adapter.insert_one("c", doc! { "_id": "x" }).unwrap_err();
        assert!(err.is_duplicate_key());
    }

    #[test]
    fn test_insert_many_preserves_order_and_stops_at_duplicate() {
        let adapter = connected();
        let ids = adapter
            .insert_many("c", vec![doc! { "n": 1 }, doc! { "_id": "fixed", "n": 2 }])
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[1], "fixed");

        let err = adapter
            .insert_many("c", vec![doc! { "_id": "new" }, doc! { "_id": "fixed" }, doc! { "_id": "late" }])
            .unwrap_err();
        assert!(err.is_duplicate_key());
        assert!(adapter.find_one("c", &by_id("new"), None).unwrap().is_some());
        assert!(adapter.find_one("c", &by_id("late"), None).unwrap().is_none());
    }

    #[test]
    fn test_initialize_collections_idempotent() {
        let adapter = connected();
        adapter.initialize_collections(&["a", "b"]).unwrap();
        adapter.insert_one("a", doc! { "x": 1 }).unwrap();
        adapter.initialize_collections(&["a", "b"]).unwrap();
        assert_eq!(adapter.list_collections().unwrap(), vec!["a", "b"]);
        assert_eq!(adapter.count_documents("a", &all()).unwrap(), 1);
    }

    #[test]
    fn test_find_with_operators_and_options() {
        let adapter = connected();
        for (name, score) in [("a", 10), ("b", 50), ("c", 30), ("d", 70)] {
            adapter.insert_one("c", doc! { "name": name, "score": score }).unwrap();
        }
        let options = FindOptions::new()
            .sort_by("score", SortOrder::Descending)
            .skip(1)
            .limit(2)
            .projection(&["name"]);
        let docs = adapter.find("c", &field("score").gte(20), &options).unwrap();
        let names: Vec<_> = docs.iter().filter_map(|d| d.get_str("name")).collect();
        assert_eq!(names, vec!["b", "c"]);
        assert!(!docs[0].contains_key("score"));
        assert!(docs[0].has_id());
    }

    #[test]
    fn test_missing_collection_reads_empty() {
        let adapter = connected();
        assert!(adapter.find("nope", &all(), &FindOptions::new()).unwrap().is_empty());
        assert!(adapter.find_one("nope", &all(), None).unwrap().is_none());
        assert_eq!(adapter.count_documents("nope", &all()).unwrap(), 0);
        assert!(!adapter.update_one("nope", &all(), &Update::set("a", 1), false).unwrap());
        assert!(adapter.list_collections().unwrap().is_empty());
    }

    #[test]
    fn test_update_merges_fields() {
        let adapter = connected();
        let id = adapter.insert_one("c", doc! { "b": 2 }).unwrap();
        let before = adapter.find_one("c", &by_id(&id), None).unwrap().unwrap();

        assert!(adapter.update_one("c", &by_id(&id), &Update::set("a", 1), false).unwrap());
        let after = adapter.find_one("c", &by_id(&id), None).unwrap().unwrap();
        assert_eq!(after.get("a"), Some(&json!(1)));
        assert_eq!(after.get("b"), Some(&json!(2)));
        assert_eq!(after.get("created_at"), before.get("created_at"));
        assert_eq!(after.id(), Some(id));
    }

    #[test]
    fn test_upsert_creates_document() {
        let adapter = connected();
        let created = adapter
            .update_one("c", &by_id("new").and(field("kind").eq("x")), &Update::set("v", 1), true)
            .unwrap();
        assert!(created);
        let doc = adapter.find_one("c", &by_id("new"), None).unwrap().unwrap();
        assert_eq!(doc.get_str("kind"), Some("x"));
        assert_eq!(doc.get("v"), Some(&json!(1)));
        assert!(doc.contains_key("created_at"));
    }

    #[test]
    fn test_update_many_is_all_or_nothing() {
        let adapter = connected();
        adapter.insert_one("c", doc! { "_id": "1", "n": 1 }).unwrap();
        adapter.insert_one("c", doc! { "_id": "2", "n": "text" }).unwrap();
        assert!(adapter.update_many("c", &all(), &Update::inc("n", 1)).is_err());
        let first = adapter.find_one("c", &by_id("1"), None).unwrap().unwrap();
        assert_eq!(first.get("n"), Some(&json!(1)));

        assert_eq!(adapter.update_many("c", &field("n").eq(1), &Update::inc("n", 1)).unwrap(), 1);
    }

    #[test]
    fn test_delete_one_and_many() {
        let adapter = connected();
        for i in 0..3 {
            adapter.insert_one("c", doc! { "status": "draft", "i": i }).unwrap();
        }
        adapter.insert_one("c", doc! { "status": "live" }).unwrap();

        assert!(adapter.delete_one("c", &field("status").eq("draft")).unwrap());
        assert_eq!(adapter.delete_many("c", &field("status").eq("draft")).unwrap(), 2);
        assert_eq!(adapter.count_documents("c", &field("status").eq("draft")).unwrap(), 0);
        assert_eq!(adapter.count_documents("c", &all()).unwrap(), 1);
        assert!(!adapter.delete_one("c", &by_id("missing")).unwrap());
    }

    #[test]
    fn test_aggregate_match_limit() {
        let adapter = connected();
        for sector in ["Energy", "Mining", "Energy", "Water", "Energy"] {
            adapter.insert_one("companies", doc! { "sector": sector }).unwrap();
        }
        let pipeline = Pipeline::from_json(&json!([{"$match": {"sector": "Energy"}}, {"$limit": 2}])).unwrap();
        let docs = adapter.aggregate("companies", &pipeline).unwrap();
        assert_eq!(docs.len(), 2);
        assert!(docs.iter().all(|d| d.get_str("sector") == Some("Energy")));
    }

    #[test]
    fn test_concurrent_writers() {
        let adapter = connected();
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let adapter = adapter.clone();
                thread::spawn(move || {
                    for i in 0..25 {
                        adapter.insert_one("c", doc! { "t": t, "i": i }).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(adapter.count_documents("c", &all()).unwrap(), 200);
    }

    #[test]
    fn test_clear_drops_everything() {
        let adapter = connected();
        adapter.insert_one("c", doc! { "a": 1 }).unwrap();
        adapter.clear();
        assert!(adapter.list_collections().unwrap().is_empty());
    }
}
