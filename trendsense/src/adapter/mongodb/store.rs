use mongodb::bson::{doc, Document as BsonDocument};
use mongodb::error::{Error as MongoError, ErrorKind as MongoErrorKind, WriteFailure};
use mongodb::options::ClientOptions;
use mongodb::sync::{Client, Collection, Database};
use parking_lot::RwLock;
use std::sync::Arc;

use super::convert::*;
use crate::adapter::{AdapterKind, CollectionHandle, DatabaseAdapterProvider};
use crate::aggregate::Pipeline;
use crate::collection::{Document, FindOptions, Update};
use crate::common::{now_timestamp, DOC_ID, MONGODB_DUPLICATE_KEY_CODE};
use crate::config::MongoConfig;
use crate::errors::{DbError, DbResult, ErrorKind};
use crate::filter::Filter;

const APP_NAME: &str = "trendsense";
const NAMESPACE_EXISTS_CODE: i32 = 48;

/// MongoDB implementation of the adapter contract, on top of the blocking
/// driver.
///
/// The driver keeps a connection pool sized by
/// [MongoConfig::max_pool_size]; clones of the adapter share it. Filters,
/// sorting, paging and aggregation pipelines all run natively on the
/// server, including pipeline stages other backends skip.
///
/// Keys generated on insert are ObjectIds, reported as 24-character hex
/// strings. Caller-supplied `_id` strings in that format are stored as
/// ObjectIds too.
#[derive(Clone)]
pub struct MongoDbAdapter {
    inner: Arc<MongoDbAdapterInner>,
}

impl MongoDbAdapter {
    pub fn new(config: MongoConfig) -> MongoDbAdapter {
        MongoDbAdapter {
            inner: Arc::new(MongoDbAdapterInner {
                config,
                client: RwLock::new(None),
            }),
        }
    }

    pub fn config(&self) -> &MongoConfig {
        &self.inner.config
    }
}

impl DatabaseAdapterProvider for MongoDbAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::MongoDb
    }

    fn connect(&self) -> DbResult<bool> {
        self.inner.connect()
    }

    fn disconnect(&self) -> DbResult<()> {
        if self.inner.client.write().take().is_some() {
            log::info!("Disconnected from MongoDB at {}", self.inner.config.redacted_uri());
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.inner.ping()
    }

    fn get_collection(&self, name: &str) -> DbResult<CollectionHandle> {
        let database = self.inner.database()?;
        Ok(CollectionHandle {
            name: name.to_string(),
            kind: AdapterKind::MongoDb,
            namespace: format!("{}.{}", database.name(), name),
        })
    }

    fn initialize_collections(&self, names: &[&str]) -> DbResult<()> {
        let database = self.inner.database()?;
        let existing = database
            .list_collection_names()
            .run()
            .map_err(|e| to_db_error(e, "Failed to list MongoDB collections"))?;

        for name in names.iter().filter(|n| !existing.iter().any(|e| e == *n)) {
            match database.create_collection(*name).run() {
                Ok(()) => log::debug!("Created MongoDB collection {}", name),
                // another process created it in between
                Err(e) if command_code(&e) == Some(NAMESPACE_EXISTS_CODE) => {}
                Err(e) => return Err(to_db_error(e, &format!("Failed to create collection {}", name))),
            }
        }
        Ok(())
    }

    fn list_collections(&self) -> DbResult<Vec<String>> {
        self.inner
            .database()?
            .list_collection_names()
            .run()
            .map_err(|e| to_db_error(e, "Failed to list MongoDB collections"))
    }

    fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
        projection: Option<&[String]>,
    ) -> DbResult<Option<Document>> {
        let coll = self.inner.collection(collection)?;
        let mut action = coll.find_one(filter_to_bson(filter)?);
        if let Some(fields) = projection.filter(|f| !f.is_empty()) {
            action = action.projection(projection_to_bson(fields));
        }
        let found = action
            .run()
            .map_err(|e| to_db_error(e, &format!("Failed to query {}", collection)))?;
        Ok(found.map(from_bson_document))
    }

    fn find(&self, collection: &str, filter: &Filter, options: &FindOptions) -> DbResult<Vec<Document>> {
        let coll = self.inner.collection(collection)?;
        let mut action = coll.find(filter_to_bson(filter)?);
        if !options.get_sort_by().is_empty() {
            action = action.sort(sort_to_bson(options.get_sort_by()));
        }
        if options.get_skip() > 0 {
            action = action.skip(options.get_skip());
        }
        if options.get_limit() > 0 {
            action = action.limit(i64::try_from(options.get_limit()).unwrap_or(i64::MAX));
        }
        if let Some(fields) = options.get_projection().filter(|f| !f.is_empty()) {
            action = action.projection(projection_to_bson(fields));
        }

        let cursor = action
            .run()
            .map_err(|e| to_db_error(e, &format!("Failed to query {}", collection)))?;
        cursor
            .map(|result| result.map(from_bson_document))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| to_db_error(e, &format!("Failed to read results from {}", collection)))
    }

    fn insert_one(&self, collection: &str, document: Document) -> DbResult<String> {
        let coll = self.inner.collection(collection)?;
        let encoded = prepare_document(document, &now_timestamp())?;
        let result = coll
            .insert_one(encoded)
            .run()
            .map_err(|e| to_db_error(e, &format!("Failed to insert into {}", collection)))?;
        let id = id_to_string(&result.inserted_id);
        log::debug!("Inserted document {} into {}", id, collection);
        Ok(id)
    }

    fn insert_many(&self, collection: &str, documents: Vec<Document>) -> DbResult<Vec<String>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }
        let coll = self.inner.collection(collection)?;
        let now = now_timestamp();
        let encoded = documents
            .into_iter()
            .map(|document| prepare_document(document, &now))
            .collect::<DbResult<Vec<_>>>()?;
        let count = encoded.len();

        let result = coll
            .insert_many(encoded)
            .run()
            .map_err(|e| to_db_error(e, &format!("Failed to insert into {}", collection)))?;

        // inserted_ids is keyed by the position in the batch
        let mut ids = Vec::with_capacity(count);
        for index in 0..count {
            if let Some(id) = result.inserted_ids.get(&index) {
                ids.push(id_to_string(id));
            }
        }
        Ok(ids)
    }

    fn update_one(&self, collection: &str, filter: &Filter, update: &Update, upsert: bool) -> DbResult<bool> {
        let coll = self.inner.collection(collection)?;
        let result = coll
            .update_one(filter_to_bson(filter)?, update_to_bson(update, &now_timestamp())?)
            .upsert(upsert)
            .run()
            .map_err(|e| to_db_error(e, &format!("Failed to update {}", collection)))?;
        Ok(result.modified_count > 0 || result.upserted_id.is_some())
    }

    fn update_many(&self, collection: &str, filter: &Filter, update: &Update) -> DbResult<u64> {
        let coll = self.inner.collection(collection)?;
        let result = coll
            .update_many(filter_to_bson(filter)?, update_to_bson(update, &now_timestamp())?)
            .run()
            .map_err(|e| to_db_error(e, &format!("Failed to update {}", collection)))?;
        Ok(result.modified_count)
    }

    fn delete_one(&self, collection: &str, filter: &Filter) -> DbResult<bool> {
        let coll = self.inner.collection(collection)?;
        let result = coll
            .delete_one(filter_to_bson(filter)?)
            .run()
            .map_err(|e| to_db_error(e, &format!("Failed to delete from {}", collection)))?;
        Ok(result.deleted_count > 0)
    }

    fn delete_many(&self, collection: &str, filter: &Filter) -> DbResult<u64> {
        let coll = self.inner.collection(collection)?;
        let result = coll
            .delete_many(filter_to_bson(filter)?)
            .run()
            .map_err(|e| to_db_error(e, &format!("Failed to delete from {}", collection)))?;
        Ok(result.deleted_count)
    }

    fn count_documents(&self, collection: &str, filter: &Filter) -> DbResult<u64> {
        let coll = self.inner.collection(collection)?;
        coll.count_documents(filter_to_bson(filter)?)
            .run()
            .map_err(|e| to_db_error(e, &format!("Failed to count documents in {}", collection)))
    }

    fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> DbResult<Vec<Document>> {
        let coll = self.inner.collection(collection)?;
        let cursor = coll
            .aggregate(pipeline_to_bson(pipeline)?)
            .run()
            .map_err(|e| to_db_error(e, &format!("Failed to aggregate {}", collection)))?;
        cursor
            .map(|result| result.map(from_bson_document))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| to_db_error(e, &format!("Failed to read aggregation results from {}", collection)))
    }
}

struct MongoDbAdapterInner {
    config: MongoConfig,
    client: RwLock<Option<Client>>,
}

impl MongoDbAdapterInner {
    fn connect(&self) -> DbResult<bool> {
        if self.client.read().is_some() {
            return Ok(true);
        }

        let uri = self.config.redacted_uri();
        let mut options = match ClientOptions::parse(self.config.get_uri()).run() {
            Ok(options) => options,
            Err(e) if matches!(*e.kind, MongoErrorKind::InvalidArgument { .. }) => {
                log::error!("Invalid MongoDB connection string {}: {}", uri, e);
                return Err(DbError::new(
                    &format!("Invalid MongoDB connection string: {}", e),
                    ErrorKind::ConfigError,
                ));
            }
            Err(e) => {
                // SRV lookups happen while parsing
                log::error!("Failed to resolve MongoDB at {}: {}", uri, e);
                return Ok(false);
            }
        };
        options.max_pool_size = Some(self.config.get_max_pool_size());
        options.server_selection_timeout = Some(self.config.get_server_selection_timeout());
        options.app_name = Some(APP_NAME.to_string());

        let client = Client::with_options(options).map_err(|e| {
            log::error!("Failed to create MongoDB client for {}: {}", uri, e);
            DbError::new(&format!("Failed to create MongoDB client: {}", e), ErrorKind::ConfigError)
        })?;

        match client.database("admin").run_command(doc! { "ping": 1 }).run() {
            Ok(_) => {
                *self.client.write() = Some(client);
                log::info!(
                    "Connected to MongoDB at {} (database {})",
                    uri,
                    self.config.get_database()
                );
                Ok(true)
            }
            Err(e) => {
                log::error!("Failed to connect to MongoDB at {}: {}", uri, e);
                Ok(false)
            }
        }
    }

    fn database(&self) -> DbResult<Database> {
        match self.client.read().as_ref() {
            Some(client) => Ok(client.database(self.config.get_database())),
            None => {
                log::error!("MongoDB adapter is not connected");
                Err(DbError::new("MongoDB adapter is not connected", ErrorKind::StoreNotInitialized))
            }
        }
    }

    fn collection(&self, name: &str) -> DbResult<Collection<BsonDocument>> {
        Ok(self.database()?.collection::<BsonDocument>(name))
    }

    fn ping(&self) -> bool {
        let client = self.client.read().clone();
        let Some(client) = client else {
            return false;
        };
        match client.database("admin").run_command(doc! { "ping": 1 }).run() {
            Ok(_) => true,
            Err(e) => {
                log::warn!("MongoDB ping failed: {}", e);
                false
            }
        }
    }
}

/// Stamps timestamps and encodes a document for insertion. A missing `_id`
/// is left to the driver, which generates an ObjectId.
fn prepare_document(mut document: Document, now: &str) -> DbResult<BsonDocument> {
    if document.get(DOC_ID).is_some_and(|v| v.is_null()) {
        document.remove(DOC_ID);
    }
    if document.contains_key(DOC_ID) && document.id().is_none() {
        log::error!("Document _id must be a non-empty string or a number");
        return Err(DbError::new(
            "Document _id must be a non-empty string or a number",
            ErrorKind::InvalidId,
        ));
    }
    document.stamp_created(now);
    Ok(to_bson_document(&document)?)
}

fn command_code(error: &MongoError) -> Option<i32> {
    match error.kind.as_ref() {
        MongoErrorKind::Command(command) => Some(command.code),
        _ => None,
    }
}

fn is_duplicate_key(error: &MongoError) -> bool {
    match error.kind.as_ref() {
        MongoErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            write_error.code == MONGODB_DUPLICATE_KEY_CODE
        }
        // bulk writes report per-document failures inside the message
        _ => error.to_string().contains("E11000"),
    }
}

/// Translates a driver error into a [DbError], logging it.
pub(crate) fn to_db_error(error: MongoError, context: &str) -> DbError {
    let kind = if is_duplicate_key(&error) {
        ErrorKind::DuplicateKey
    } else {
        match error.kind.as_ref() {
            MongoErrorKind::ServerSelection { .. }
            | MongoErrorKind::Io(_)
            | MongoErrorKind::Authentication { .. } => ErrorKind::ConnectionError,
            MongoErrorKind::InvalidArgument { .. } => ErrorKind::InvalidOperation,
            _ => ErrorKind::BackendError,
        }
    };
    log::error!("{}: {}", context, error);
    DbError::new(&format!("{}: {}", context, error), kind)
}
