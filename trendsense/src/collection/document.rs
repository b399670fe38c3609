use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::{Debug, Display};

use crate::common::{
    id_to_string, lookup_path, CREATED_AT, DOC_ID, FIELD_SEPARATOR, UPDATED_AT,
};
use crate::errors::{DbError, DbResult, ErrorKind};

/// A schema-less record stored in a collection.
///
/// A document is an ordered mapping from field name to a JSON-compatible
/// [Value]. Field order is preserved as inserted. Nested values are addressed
/// with dotted paths, so `document.get("address.city")` reads the `city`
/// field of the embedded `address` object.
///
/// The adapter layer only imposes three conventions on top of the raw map:
///
/// * `_id` - the document key. Adapters populate it on every read from the
///   store's native key and generate one on insert when it is missing.
/// * `created_at` - stamped once, on first write.
/// * `updated_at` - refreshed on every write.
///
/// Documents are usually built with the [`doc!`](crate::doc) macro:
///
/// ```rust,ignore
/// let company = doc! {
///     "name": "Acme Solar",
///     "sector": "Energy",
///     "esg": { "score": 71.5 }
/// };
/// assert_eq!(company.get("esg.score"), Some(&json!(71.5)));
/// ```
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    data: Map<String, Value>,
}

impl Document {
    /// Creates a new empty document.
    pub fn new() -> Self {
        Document { data: Map::new() }
    }

    /// Builds a document from a JSON value that is expected to be an object.
    ///
    /// Anything other than an object yields an empty document; use
    /// [`Document::try_from`] when the input is untrusted.
    pub fn from_json_object(value: Value) -> Self {
        match value {
            Value::Object(data) => Document { data },
            other => {
                log::error!("Cannot build a document from non-object value {}", other);
                Document::new()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Associates `value` with `key`. Dotted keys create or descend into
    /// embedded objects.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is empty, or if a dotted key runs through
    /// an existing field that is not an object.
    pub fn put<T: Into<Value>>(&mut self, key: &str, value: T) -> DbResult<()> {
        if key.is_empty() {
            log::error!("Document does not support empty key");
            return Err(DbError::new(
                "Document does not support empty key",
                ErrorKind::InvalidOperation,
            ));
        }

        let value = value.into();
        if !key.contains(FIELD_SEPARATOR) {
            self.data.insert(key.to_string(), value);
            return Ok(());
        }

        let segments: Vec<&str> = key.split(FIELD_SEPARATOR).collect();
        deep_put(&mut self.data, &segments, value, key)
    }

    /// Returns the value stored at `key`, which may be a dotted path.
    pub fn get(&self, key: &str) -> Option<&Value> {
        lookup_path(&self.data, key)
    }

    /// Returns the value at `key` when it is a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Removes the value at `key`, which may be a dotted path, and returns it.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        if !key.contains(FIELD_SEPARATOR) {
            return self.data.shift_remove(key);
        }

        let (parent, leaf) = key.rsplit_once(FIELD_SEPARATOR)?;
        let mut current = &mut self.data;
        for segment in parent.split(FIELD_SEPARATOR) {
            current = current.get_mut(segment)?.as_object_mut()?;
        }
        current.shift_remove(leaf)
    }

    /// Returns the document key, if one is set.
    pub fn id(&self) -> Option<String> {
        self.data.get(DOC_ID).and_then(id_to_string)
    }

    pub fn has_id(&self) -> bool {
        self.id().is_some()
    }

    /// Sets the document key.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.data.insert(DOC_ID.to_string(), Value::String(id.into()));
    }

    /// Returns a copy of this document with `_id` removed. Firestore keeps the
    /// key outside the document body.
    pub fn without_id(&self) -> Document {
        let mut copy = self.clone();
        copy.data.shift_remove(DOC_ID);
        copy
    }

    /// Top-level field names, in insertion order.
    pub fn fields(&self) -> Vec<String> {
        self.data.keys().cloned().collect()
    }

    /// Merges `other` into this document. Embedded objects are merged
    /// recursively, every other value is overwritten.
    pub fn merge(&mut self, other: &Document) {
        merge_maps(&mut self.data, &other.data);
    }

    /// Keeps only `_id` and the listed fields (inclusion projection). An
    /// empty list leaves the document untouched.
    pub fn project(&self, fields: &[String]) -> Document {
        if fields.is_empty() {
            return self.clone();
        }

        let mut projected = Document::new();
        if let Some(id) = self.data.get(DOC_ID) {
            projected.data.insert(DOC_ID.to_string(), id.clone());
        }
        for field in fields {
            if let Some(value) = self.get(field) {
                // the path is known to be valid because it was just read
                let _ = projected.put(field, value.clone());
            }
        }
        projected
    }

    /// Stamps `created_at` and `updated_at` when they are not present yet.
    pub(crate) fn stamp_created(&mut self, now: &str) {
        if !self.data.contains_key(CREATED_AT) {
            self.data.insert(CREATED_AT.to_string(), Value::String(now.to_string()));
        }
        if !self.data.contains_key(UPDATED_AT) {
            self.data.insert(UPDATED_AT.to_string(), Value::String(now.to_string()));
        }
    }

    /// Refreshes `updated_at`.
    pub(crate) fn stamp_updated(&mut self, now: &str) {
        self.data.insert(UPDATED_AT.to_string(), Value::String(now.to_string()));
    }

    pub fn iter(&self) -> serde_json::map::Iter<'_> {
        self.data.iter()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.data
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.data)
    }
}

fn deep_put(
    map: &mut Map<String, Value>,
    segments: &[&str],
    value: Value,
    full_key: &str,
) -> DbResult<()> {
    match segments {
        [] => Ok(()),
        [leaf] => {
            map.insert(leaf.to_string(), value);
            Ok(())
        }
        [head, rest @ ..] => {
            let child = map
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            match child {
                Value::Object(inner) => deep_put(inner, rest, value, full_key),
                _ => {
                    log::error!("Cannot put {} as {} is not an object", full_key, head);
                    Err(DbError::new(
                        &format!("Cannot put {} as {} is not an object", full_key, head),
                        ErrorKind::InvalidOperation,
                    ))
                }
            }
        }
    }
}

fn merge_maps(target: &mut Map<String, Value>, source: &Map<String, Value>) {
    for (key, value) in source {
        match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge_maps(existing, incoming)
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

impl From<Map<String, Value>> for Document {
    fn from(data: Map<String, Value>) -> Self {
        Document { data }
    }
}

impl TryFrom<Value> for Document {
    type Error = DbError;

    fn try_from(value: Value) -> DbResult<Self> {
        match value {
            Value::Object(data) => Ok(Document { data }),
            other => Err(DbError::new(
                &format!("Expected a JSON object but found {}", other),
                ErrorKind::ObjectMappingError,
            )),
        }
    }
}

impl From<Document> for Value {
    fn from(document: Document) -> Self {
        Value::Object(document.data)
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = (&'a String, &'a Value);
    type IntoIter = serde_json::map::Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

impl Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", Value::Object(self.data.clone()))
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", Value::Object(self.data.clone()))
    }
}

/// Builds a [Document](crate::collection::Document) from JSON-like syntax.
///
/// ```rust,ignore
/// let story = doc! {
///     "title": "Wind capacity doubles",
///     "tags": ["energy", "wind"],
///     "metrics": { "growth": 2.1 }
/// };
/// ```
#[macro_export]
macro_rules! doc {
    () => {
        $crate::collection::Document::new()
    };
    ($($body:tt)+) => {
        $crate::collection::Document::from_json_object($crate::common::json!({ $($body)+ }))
    };
}
