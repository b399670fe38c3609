use serde_json::Value;
use std::cmp::Ordering;

use crate::collection::Document;
use crate::common::{compare_values, SortOrder};

/// Options controlling projection, ordering and paging of a `find`.
///
/// `limit == 0` means unbounded. Sort keys are applied in the order they were
/// added; documents missing a sort field sort as `null`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub(crate) projection: Option<Vec<String>>,
    pub(crate) sort_by: Vec<(String, SortOrder)>,
    pub(crate) skip: u64,
    pub(crate) limit: u64,
}

pub fn order_by(field_name: &str, sort_order: SortOrder) -> FindOptions {
    FindOptions::new().sort_by(field_name, sort_order)
}

pub fn skip_by(skip: u64) -> FindOptions {
    FindOptions::new().skip(skip)
}

pub fn limit_to(limit: u64) -> FindOptions {
    FindOptions::new().limit(limit)
}

pub fn project(fields: &[&str]) -> FindOptions {
    FindOptions::new().projection(fields)
}

impl FindOptions {
    pub fn new() -> FindOptions {
        FindOptions::default()
    }

    pub fn skip(mut self, skip: u64) -> FindOptions {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: u64) -> FindOptions {
        self.limit = limit;
        self
    }

    pub fn sort_by(mut self, field_name: &str, sort_order: SortOrder) -> FindOptions {
        self.sort_by.push((field_name.to_string(), sort_order));
        self
    }

    /// Adds sort keys from MongoDB-style `(field, direction)` pairs.
    pub fn sort_spec(mut self, spec: &[(&str, i64)]) -> FindOptions {
        for (field, direction) in spec {
            self.sort_by
                .push((field.to_string(), SortOrder::from_direction(*direction)));
        }
        self
    }

    pub fn projection(mut self, fields: &[&str]) -> FindOptions {
        self.projection = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }

    pub fn get_projection(&self) -> Option<&[String]> {
        self.projection.as_deref()
    }

    pub fn get_sort_by(&self) -> &[(String, SortOrder)] {
        &self.sort_by
    }

    pub fn get_skip(&self) -> u64 {
        self.skip
    }

    pub fn get_limit(&self) -> u64 {
        self.limit
    }

    /// Applies sort, skip, limit and projection to documents already in
    /// memory.
    pub(crate) fn apply(&self, mut documents: Vec<Document>) -> Vec<Document> {
        sort_documents(&mut documents, &self.sort_by);

        let skip = usize::try_from(self.skip).unwrap_or(usize::MAX);
        let iter = documents.into_iter().skip(skip);
        let paged: Vec<Document> = if self.limit > 0 {
            let limit = usize::try_from(self.limit).unwrap_or(usize::MAX);
            iter.take(limit).collect()
        } else {
            iter.collect()
        };

        match &self.projection {
            Some(fields) => paged.iter().map(|doc| doc.project(fields)).collect(),
            None => paged,
        }
    }
}

/// Stable multi-key sort over documents.
pub(crate) fn sort_documents(documents: &mut [Document], sort_by: &[(String, SortOrder)]) {
    if sort_by.is_empty() {
        return;
    }

    documents.sort_by(|a, b| {
        for (field, order) in sort_by {
            let left = a.get(field).unwrap_or(&Value::Null);
            let right = b.get(field).unwrap_or(&Value::Null);
            let ord = match order {
                SortOrder::Ascending => compare_values(left, right),
                SortOrder::Descending => compare_values(right, left),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}
