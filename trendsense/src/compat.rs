//! Neutral-value facade for legacy call sites.
//!
//! Older route handlers expect database calls to never fail: a lookup that
//! cannot be served yields `None`, a listing yields `[]`, a count `0` and a
//! write `false`. [LenientAdapter] reproduces that contract on top of the
//! `Result` API, logging every swallowed error. New code should use
//! [DatabaseAdapter] directly.

use serde_json::Value;

use crate::adapter::DatabaseAdapter;
use crate::aggregate::Pipeline;
use crate::collection::{Document, FindOptions, Update};
use crate::errors::DbResult;
use crate::filter::Filter;

#[derive(Clone, Debug)]
pub struct LenientAdapter {
    adapter: DatabaseAdapter,
}

fn or_neutral<T>(operation: &str, collection: &str, result: DbResult<T>, neutral: T) -> T {
    match result {
        Ok(value) => value,
        Err(err) => {
            log::error!("{} on {} failed: {}", operation, collection, err);
            neutral
        }
    }
}

impl LenientAdapter {
    pub fn new(adapter: DatabaseAdapter) -> LenientAdapter {
        LenientAdapter { adapter }
    }

    pub fn adapter(&self) -> &DatabaseAdapter {
        &self.adapter
    }

    pub fn connect(&self) -> bool {
        or_neutral("connect", "-", self.adapter.connect(), false)
    }

    pub fn is_connected(&self) -> bool {
        self.adapter.is_connected()
    }

    /// `query` is a MongoDB-style filter document; `null` matches everything.
    pub fn find_one(&self, collection: &str, query: &Value, projection: Option<&[String]>) -> Option<Document> {
        let result = Filter::from_json(query).and_then(|filter| self.adapter.find_one(collection, &filter, projection));
        or_neutral("find_one", collection, result, None)
    }

    pub fn find(&self, collection: &str, query: &Value, options: &FindOptions) -> Vec<Document> {
        let result = Filter::from_json(query).and_then(|filter| self.adapter.find(collection, &filter, options));
        or_neutral("find", collection, result, Vec::new())
    }

    pub fn insert_one(&self, collection: &str, document: Document) -> Option<String> {
        or_neutral("insert_one", collection, self.adapter.insert_one(collection, document).map(Some), None)
    }

    pub fn insert_many(&self, collection: &str, documents: Vec<Document>) -> Vec<String> {
        or_neutral("insert_many", collection, self.adapter.insert_many(collection, documents), Vec::new())
    }

    /// `update` is either a literal mapping of fields to set or a
    /// `$set`/`$unset`/`$inc` envelope.
    pub fn update_one(&self, collection: &str, query: &Value, update: &Value, upsert: bool) -> bool {
        let result = Filter::from_json(query).and_then(|filter| {
            let update = Update::from_json(update)?;
            self.adapter.update_one(collection, &filter, &update, upsert)
        });
        or_neutral("update_one", collection, result, false)
    }

    pub fn update_many(&self, collection: &str, query: &Value, update: &Value) -> u64 {
        let result = Filter::from_json(query).and_then(|filter| {
            let update = Update::from_json(update)?;
            self.adapter.update_many(collection, &filter, &update)
        });
        or_neutral("update_many", collection, result, 0)
    }

    pub fn delete_one(&self, collection: &str, query: &Value) -> bool {
        let result = Filter::from_json(query).and_then(|filter| self.adapter.delete_one(collection, &filter));
        or_neutral("delete_one", collection, result, false)
    }

    pub fn delete_many(&self, collection: &str, query: &Value) -> u64 {
        let result = Filter::from_json(query).and_then(|filter| self.adapter.delete_many(collection, &filter));
        or_neutral("delete_many", collection, result, 0)
    }

    pub fn count_documents(&self, collection: &str, query: &Value) -> u64 {
        let result = Filter::from_json(query).and_then(|filter| self.adapter.count_documents(collection, &filter));
        or_neutral("count_documents", collection, result, 0)
    }

    /// `pipeline` is a JSON array of single-key stage documents.
    pub fn aggregate(&self, collection: &str, pipeline: &Value) -> Vec<Document> {
        let result = Pipeline::from_json(pipeline).and_then(|pipeline| self.adapter.aggregate(collection, &pipeline));
        or_neutral("aggregate", collection, result, Vec::new())
    }

    pub fn get_metrics(&self, category: Option<&str>) -> Vec<Document> {
        or_neutral("get_metrics", "metrics", self.adapter.get_metrics(category), Vec::new())
    }

    pub fn get_insights(&self, category: Option<&str>) -> Vec<Document> {
        or_neutral("get_insights", "insights", self.adapter.get_insights(category), Vec::new())
    }

    pub fn get_companies(&self, sector: Option<&str>) -> Vec<Document> {
        or_neutral("get_companies", "companies", self.adapter.get_companies(sector), Vec::new())
    }

    pub fn create_story(&self, story: Document) -> Option<String> {
        or_neutral("create_story", "stories", self.adapter.create_story(story).map(Some), None)
    }

    pub fn get_stories(&self, limit: u64) -> Vec<Document> {
        or_neutral("get_stories", "stories", self.adapter.get_stories(limit), Vec::new())
    }
}
