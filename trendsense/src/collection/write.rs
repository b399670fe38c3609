use super::{new_document_id, Document, Update};
use crate::common::DOC_ID;
use crate::errors::{DbError, DbResult, ErrorKind};
use crate::filter::Filter;

/// Assigns an `_id` when missing and stamps both timestamps when absent.
/// A numeric `_id` is stored as its string key. Returns the document key.
pub(crate) fn prepare_insert(document: &mut Document, now: &str) -> DbResult<String> {
    let id = match document.get(DOC_ID) {
        None | Some(serde_json::Value::Null) => {
            let id = new_document_id();
            document.set_id(id.clone());
            id
        }
        Some(_) => {
            let id = document.id().ok_or_else(|| {
                log::error!("Document _id must be a non-empty string or a number");
                DbError::new(
                    "Document _id must be a non-empty string or a number",
                    ErrorKind::InvalidId,
                )
            })?;
            document.set_id(id.clone());
            id
        }
    };
    document.stamp_created(now);
    Ok(id)
}

/// Applies `update` to a stored document and refreshes `updated_at`.
pub(crate) fn apply_update(document: &mut Document, update: &Update, now: &str) -> DbResult<()> {
    update.apply(document)?;
    document.stamp_updated(now);
    Ok(())
}

/// Builds the document an upsert creates when nothing matched: the filter's
/// equality fields, then the update, then `_id` and both timestamps.
/// Returns the new key with the document.
pub(crate) fn upsert_document(filter: &Filter, update: &Update, now: &str) -> DbResult<(String, Document)> {
    let mut document = Document::new();
    for (field, value) in filter.equality_fields() {
        if field != DOC_ID {
            document.put(&field, value)?;
        }
    }
    update.apply(&mut document)?;

    let id = filter.id_lookup().unwrap_or_else(new_document_id);
    // _id goes first so the stored document reads naturally
    let mut seeded = Document::new();
    seeded.set_id(id.clone());
    seeded.merge(&document);
    seeded.stamp_created(now);
    seeded.stamp_updated(now);
    Ok((id, seeded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;
    use crate::filter::{by_id, field};

    #[test]
    fn test_prepare_insert_generates_id() {
        let mut doc = doc! { "name": "Acme" };
        let id = prepare_insert(&mut doc, "t0").unwrap();
        assert_eq!(doc.id(), Some(id));
        assert_eq!(doc.get_str("created_at"), Some("t0"));
        assert_eq!(doc.get_str("updated_at"), Some("t0"));
    }

    #[test]
    fn test_prepare_insert_keeps_caller_values() {
        let mut doc = doc! { "_id": "c1", "created_at": "old" };
        let id = prepare_insert(&mut doc, "t0").unwrap();
        assert_eq!(id, "c1");
        assert_eq!(doc.get_str("created_at"), Some("old"));
        assert_eq!(doc.get_str("updated_at"), Some("t0"));
    }

    #[test]
    fn test_prepare_insert_stores_numeric_id_as_key() {
        let mut doc = doc! { "name": "Acme", "_id": 5 };
        let id = prepare_insert(&mut doc, "t0").unwrap();
        assert_eq!(id, "5");
        assert_eq!(doc.get("_id"), Some(&serde_json::json!("5")));
        assert_eq!(doc.fields()[1], "_id");
    }

    #[test]
    fn test_prepare_insert_rejects_bad_id() {
        let mut doc = doc! { "_id": { "nested": true } };
        let err = prepare_insert(&mut doc, "t0").unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidId);
    }

    #[test]
    fn test_apply_update_refreshes_updated_at() {
        let mut doc = doc! { "_id": "x", "created_at": "t0", "updated_at": "t0", "a": 1 };
        apply_update(&mut doc, &Update::set("b", 2), "t1").unwrap();
        assert_eq!(doc.get_str("created_at"), Some("t0"));
        assert_eq!(doc.get_str("updated_at"), Some("t1"));
        assert_eq!(doc.get("a"), Some(&serde_json::json!(1)));
    }

    #[test]
    fn test_upsert_document_seeds_from_filter() {
        let filter = by_id("c9").and(field("sector").eq("Energy")).and(field("score").gt(3));
        let (id, doc) = upsert_document(&filter, &Update::set("name", "New"), "t0").unwrap();
        assert_eq!(id, "c9");
        assert_eq!(doc.id(), Some("c9".to_string()));
        assert_eq!(doc.get_str("sector"), Some("Energy"));
        assert_eq!(doc.get_str("name"), Some("New"));
        assert!(!doc.contains_key("score"));
        assert_eq!(doc.get_str("created_at"), Some("t0"));
    }

    #[test]
    fn test_upsert_document_generates_id() {
        let (id, doc) = upsert_document(&field("name").eq("x"), &Update::new(), "t0").unwrap();
        assert_eq!(doc.id(), Some(id));
        assert_eq!(doc.get_str("name"), Some("x"));
    }
}
