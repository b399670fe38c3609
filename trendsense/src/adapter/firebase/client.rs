use firestore::{
    FirestoreDb, FirestoreDbOptions, FirestoreDocument, FirestoreListCollectionIdsParams, FirestoreQueryDirection,
    FirestoreQueryFilter, FirestoreQueryFilterBuilder,
};
use serde_json::Value;
use std::path::Path;
use tokio::runtime::{Builder, Runtime};

use super::{ConditionOp, FieldCondition, FirestoreOps, FirestoreQuery};
use crate::collection::Document;
use crate::common::SortOrder;
use crate::errors::{DbError, DbResult, ErrorKind};

/// [FirestoreOps] over the `firestore` crate. Every call blocks on a private
/// current-thread runtime.
pub(crate) struct FirestoreClient {
    db: FirestoreDb,
    runtime: Runtime,
}

impl FirestoreClient {
    pub(crate) fn connect(project_id: &str, credentials: &Path) -> DbResult<FirestoreClient> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        let options = FirestoreDbOptions::new(project_id.to_string());
        let db = runtime
            .block_on(FirestoreDb::with_options_service_account_key_file(
                options,
                credentials.to_path_buf(),
            ))
            .map_err(|e| to_db_error("initialize Firestore client", e))?;
        log::debug!("Firestore client created for project {}", project_id);
        Ok(FirestoreClient { db, runtime })
    }
}

impl FirestoreOps for FirestoreClient {
    fn get(&self, collection: &str, id: &str) -> DbResult<Option<Document>> {
        let found: Option<FirestoreDocument> = self
            .runtime
            .block_on(self.db.fluent().select().by_id_in(collection).one(id))
            .map_err(|e| to_db_error("get document", e))?;
        found.as_ref().map(decode).transpose()
    }

    fn set(&self, collection: &str, id: &str, document: &Document) -> DbResult<()> {
        let value = Value::Object(document.as_map().clone());
        self.runtime
            .block_on(
                self.db
                    .fluent()
                    .update()
                    .in_col(collection)
                    .document_id(id)
                    .object(&value)
                    .execute::<Value>(),
            )
            .map_err(|e| to_db_error("write document", e))?;
        Ok(())
    }

    fn delete(&self, collection: &str, id: &str) -> DbResult<()> {
        self.runtime
            .block_on(self.db.fluent().delete().from(collection).document_id(id).execute())
            .map_err(|e| to_db_error("delete document", e))
    }

    fn query(&self, collection: &str, query: &FirestoreQuery) -> DbResult<Vec<Document>> {
        let conditions = query.conditions.clone();
        let mut select = self
            .db
            .fluent()
            .select()
            .from(collection)
            .filter(move |q| q.for_all(conditions.iter().map(|c| condition(&q, c))));
        if !query.order_by.is_empty() {
            let order: Vec<(String, FirestoreQueryDirection)> = query
                .order_by
                .iter()
                .map(|(field, order)| (field.clone(), direction(*order)))
                .collect();
            select = select.order_by(order);
        }
        if let Some(limit) = query.limit {
            select = select.limit(limit);
        }

        let documents: Vec<FirestoreDocument> = self
            .runtime
            .block_on(select.query())
            .map_err(|e| to_db_error("query collection", e))?;
        documents.iter().map(decode).collect()
    }

    fn list_collections(&self) -> DbResult<Vec<String>> {
        let listed = self
            .runtime
            .block_on(self.db.list_collection_ids(FirestoreListCollectionIdsParams::new()))
            .map_err(|e| to_db_error("list collections", e))?;
        Ok(listed.collection_ids)
    }
}

fn condition(q: &FirestoreQueryFilterBuilder, condition: &FieldCondition) -> Option<FirestoreQueryFilter> {
    let field = q.field(condition.field.as_str());
    let value = condition.value.clone();
    match condition.op {
        ConditionOp::Equal => field.eq(value),
        ConditionOp::LessThan => field.less_than(value),
        ConditionOp::LessThanOrEqual => field.less_than_or_equal(value),
        ConditionOp::GreaterThan => field.greater_than(value),
        ConditionOp::GreaterThanOrEqual => field.greater_than_or_equal(value),
        ConditionOp::In => field.is_in(value),
    }
}

fn direction(order: SortOrder) -> FirestoreQueryDirection {
    match order {
        SortOrder::Ascending => FirestoreQueryDirection::Ascending,
        SortOrder::Descending => FirestoreQueryDirection::Descending,
    }
}

/// Converts a Firestore document into a [Document] keyed by its id, the last
/// segment of the document name.
fn decode(document: &FirestoreDocument) -> DbResult<Document> {
    let value: Value = FirestoreDb::deserialize_doc_to(document).map_err(|e| to_db_error("decode document", e))?;
    let id = document.name.rsplit('/').next().unwrap_or_default().to_string();

    let mut decoded = Document::new();
    decoded.set_id(id);
    if let Value::Object(fields) = value {
        decoded.merge(&Document::from(fields));
    }
    Ok(decoded)
}

fn to_db_error(action: &str, err: firestore::errors::FirestoreError) -> DbError {
    log::error!("Firestore failed to {}: {}", action, err);
    DbError::new(&format!("Firestore failed to {}: {}", action, err), ErrorKind::BackendError)
}
