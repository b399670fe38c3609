use mongodb::bson::oid::ObjectId;
use mongodb::bson::{self, doc, Bson, Document as BsonDocument};
use serde_json::{Map, Number, Value};
use thiserror::Error;

use crate::aggregate::{Pipeline, Stage};
use crate::collection::{Document, Update, UpdateOperation};
use crate::common::{SortOrder, CREATED_AT, DOC_ID, UPDATED_AT};
use crate::errors::{DbError, ErrorKind};
use crate::filter::Filter;

/// Failures while translating between documents and BSON.
#[derive(Error, Debug, Clone, PartialEq)]
pub(crate) enum BsonConvertError {
    /// A value could not be represented as BSON
    #[error("Cannot encode field {field} as BSON: {message}")]
    Encode { field: String, message: String },
}

impl From<BsonConvertError> for DbError {
    fn from(err: BsonConvertError) -> Self {
        DbError::new(&err.to_string(), ErrorKind::ObjectMappingError)
    }
}

pub(crate) type ConvertResult<T> = Result<T, BsonConvertError>;

fn encode(field: &str, value: &Value) -> ConvertResult<Bson> {
    bson::to_bson(value).map_err(|e| BsonConvertError::Encode {
        field: field.to_string(),
        message: e.to_string(),
    })
}

/// Encodes a value bound to `field`. A 24-hex `_id` string becomes an
/// ObjectId so it matches driver-generated keys.
fn field_value(field: &str, value: &Value) -> ConvertResult<Bson> {
    if field == DOC_ID {
        if let Some(oid) = value.as_str().and_then(|s| ObjectId::parse_str(s).ok()) {
            return Ok(Bson::ObjectId(oid));
        }
    }
    encode(field, value)
}

fn field_values(field: &str, values: &[Value]) -> ConvertResult<Bson> {
    let encoded = values
        .iter()
        .map(|v| field_value(field, v))
        .collect::<ConvertResult<Vec<_>>>()?;
    Ok(Bson::Array(encoded))
}

fn number(amount: &Number) -> Bson {
    match amount.as_i64() {
        Some(i) => Bson::Int64(i),
        None => Bson::Double(amount.as_f64().unwrap_or(0.0)),
    }
}

fn single(key: &str, value: impl Into<Bson>) -> BsonDocument {
    let mut document = BsonDocument::new();
    document.insert(key, value);
    document
}

fn operator(field: &str, op: &str, value: Bson) -> BsonDocument {
    single(field, single(op, value))
}

pub(crate) fn to_bson_document(document: &Document) -> ConvertResult<BsonDocument> {
    let mut encoded = BsonDocument::new();
    for (key, value) in document.iter() {
        encoded.insert(key.clone(), field_value(key, value)?);
    }
    Ok(encoded)
}

/// Decodes a stored document. Top-level ObjectIds become hex strings and
/// dates become RFC 3339 strings; everything else uses relaxed extended JSON.
pub(crate) fn from_bson_document(document: BsonDocument) -> Document {
    let mut map = Map::new();
    for (key, value) in document {
        let json = match value {
            Bson::ObjectId(oid) => Value::String(oid.to_hex()),
            Bson::DateTime(date) => match date.try_to_rfc3339_string() {
                Ok(text) => Value::String(text),
                Err(_) => Bson::DateTime(date).into_relaxed_extjson(),
            },
            other => other.into_relaxed_extjson(),
        };
        map.insert(key, json);
    }
    Document::from(map)
}

/// Renders a driver-reported key as the string handed back to callers.
pub(crate) fn id_to_string(id: &Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s.clone(),
        Bson::Int32(i) => i.to_string(),
        Bson::Int64(i) => i.to_string(),
        other => other.clone().into_relaxed_extjson().to_string(),
    }
}

pub(crate) fn filter_to_bson(filter: &Filter) -> ConvertResult<BsonDocument> {
    let translated = match filter {
        Filter::All => BsonDocument::new(),
        Filter::Eq(f, v) => operator(f, "$eq", field_value(f, v)?),
        Filter::Ne(f, v) => operator(f, "$ne", field_value(f, v)?),
        Filter::Gt(f, v) => operator(f, "$gt", field_value(f, v)?),
        Filter::Gte(f, v) => operator(f, "$gte", field_value(f, v)?),
        Filter::Lt(f, v) => operator(f, "$lt", field_value(f, v)?),
        Filter::Lte(f, v) => operator(f, "$lte", field_value(f, v)?),
        Filter::In(f, vs) => operator(f, "$in", field_values(f, vs)?),
        Filter::Nin(f, vs) => operator(f, "$nin", field_values(f, vs)?),
        Filter::Exists(f, b) => operator(f, "$exists", Bson::Boolean(*b)),
        Filter::And(filters) if filters.is_empty() => BsonDocument::new(),
        Filter::And(filters) => single("$and", clauses(filters)?),
        // an empty OR matches nothing, and every stored document has an _id
        Filter::Or(filters) if filters.is_empty() => operator(DOC_ID, "$exists", Bson::Boolean(false)),
        Filter::Or(filters) => single("$or", clauses(filters)?),
    };
    Ok(translated)
}

fn clauses(filters: &[Filter]) -> ConvertResult<Bson> {
    let encoded = filters
        .iter()
        .map(|f| filter_to_bson(f).map(Bson::Document))
        .collect::<ConvertResult<Vec<_>>>()?;
    Ok(Bson::Array(encoded))
}

/// Translates an update to `$set`/`$unset`/`$inc`, refreshing `updated_at`
/// and stamping `created_at` when the update inserts.
pub(crate) fn update_to_bson(update: &Update, now: &str) -> ConvertResult<BsonDocument> {
    let mut set = BsonDocument::new();
    let mut unset = BsonDocument::new();
    let mut inc = BsonDocument::new();

    // the timestamp refresh below supersedes any operation on updated_at
    for operation in update.effective_operations().filter(|op| op.field() != UPDATED_AT) {
        match operation {
            UpdateOperation::Set(f, v) => {
                set.insert(f.clone(), field_value(f, v)?);
            }
            UpdateOperation::Unset(f) => {
                unset.insert(f.clone(), "");
            }
            UpdateOperation::Inc(f, n) => {
                inc.insert(f.clone(), number(n));
            }
        }
    }
    set.insert(UPDATED_AT, now);

    let mut translated = doc! {
        "$set": set,
        "$setOnInsert": single(CREATED_AT, now),
    };
    if !unset.is_empty() {
        translated.insert("$unset", unset);
    }
    if !inc.is_empty() {
        translated.insert("$inc", inc);
    }
    Ok(translated)
}

pub(crate) fn sort_to_bson(sort_by: &[(String, SortOrder)]) -> BsonDocument {
    let mut sort = BsonDocument::new();
    for (field, order) in sort_by {
        sort.insert(field.clone(), order.as_direction());
    }
    sort
}

pub(crate) fn projection_to_bson(fields: &[String]) -> BsonDocument {
    let mut projection = BsonDocument::new();
    for field in fields {
        projection.insert(field.clone(), 1);
    }
    projection
}

pub(crate) fn pipeline_to_bson(pipeline: &Pipeline) -> ConvertResult<Vec<BsonDocument>> {
    pipeline
        .stages()
        .iter()
        .map(|stage| {
            let translated = match stage {
                Stage::Match(filter) => single("$match", filter_to_bson(filter)?),
                Stage::Sort(keys) => single("$sort", sort_to_bson(keys)),
                Stage::Limit(n) => single("$limit", i64::try_from(*n).unwrap_or(i64::MAX)),
                Stage::Skip(n) => single("$skip", i64::try_from(*n).unwrap_or(i64::MAX)),
                Stage::Project(fields) => single("$project", projection_to_bson(fields)),
                Stage::Unsupported { name, spec } => single(name, encode(name, spec)?),
            };
            Ok(translated)
        })
        .collect()
}
