use super::DatabaseAdapter;
use crate::collection::{Document, FindOptions};
use crate::common::{
    SortOrder, COMPANIES_COLLECTION, CREATED_AT, INSIGHTS_COLLECTION, METRICS_COLLECTION,
    STORIES_COLLECTION, TRENDS_COLLECTION,
};
use crate::errors::DbResult;
use crate::filter::{all, by_id, field, Filter};

fn optional_eq(name: &str, value: Option<&str>) -> Filter {
    match value {
        Some(value) => field(name).eq(value),
        None => all(),
    }
}

/// Domain helpers shared by every backend. They are thin wrappers over the
/// provider primitives against fixed collection names.
impl DatabaseAdapter {
    /// Sustainability metrics, optionally restricted to one `category`.
    pub fn get_metrics(&self, category: Option<&str>) -> DbResult<Vec<Document>> {
        self.find(METRICS_COLLECTION, &optional_eq("category", category), &FindOptions::new())
    }

    /// Insights, optionally restricted to one `category`.
    pub fn get_insights(&self, category: Option<&str>) -> DbResult<Vec<Document>> {
        self.find(INSIGHTS_COLLECTION, &optional_eq("category", category), &FindOptions::new())
    }

    /// Companies, optionally restricted to one `sector`.
    pub fn get_companies(&self, sector: Option<&str>) -> DbResult<Vec<Document>> {
        self.find(COMPANIES_COLLECTION, &optional_eq("sector", sector), &FindOptions::new())
    }

    /// Trends, optionally restricted to one `category`.
    pub fn get_trends(&self, category: Option<&str>) -> DbResult<Vec<Document>> {
        self.find(TRENDS_COLLECTION, &optional_eq("category", category), &FindOptions::new())
    }

    /// Stores a story and returns its `_id`.
    pub fn create_story(&self, story: Document) -> DbResult<String> {
        self.insert_one(STORIES_COLLECTION, story)
    }

    /// The most recent stories, newest `created_at` first. `limit == 0`
    /// returns all of them.
    pub fn get_stories(&self, limit: u64) -> DbResult<Vec<Document>> {
        let options = FindOptions::new()
            .sort_by(CREATED_AT, SortOrder::Descending)
            .limit(limit);
        self.find(STORIES_COLLECTION, &all(), &options)
    }

    pub fn get_story(&self, id: &str) -> DbResult<Option<Document>> {
        self.find_one(STORIES_COLLECTION, &by_id(id), None)
    }
}
