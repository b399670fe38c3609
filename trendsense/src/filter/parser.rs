use serde_json::{Map, Value};

use super::Filter;
use crate::errors::{DbError, DbResult, ErrorKind};

impl Filter {
    /// Parses a MongoDB-style query document into a typed filter.
    ///
    /// Supported forms:
    ///
    /// * `{"field": value}` - equality
    /// * `{"field": {"$gt": 1, "$lte": 5}}` - `$eq`, `$ne`, `$gt`, `$gte`,
    ///   `$lt`, `$lte`, `$in`, `$nin`, `$exists`
    /// * `{"$and": [...]}`, `{"$or": [...]}`
    ///
    /// Several top-level clauses are combined with AND, and an empty
    /// document matches everything. Any other operator is rejected with
    /// [`ErrorKind::FilterError`].
    pub fn from_json(query: &Value) -> DbResult<Filter> {
        match query {
            Value::Null => Ok(Filter::All),
            Value::Object(map) => parse_clauses(map),
            other => {
                log::error!("Query must be an object, found {}", other);
                Err(filter_error("Query must be an object"))
            }
        }
    }
}

fn parse_clauses(map: &Map<String, Value>) -> DbResult<Filter> {
    let mut clauses = Vec::with_capacity(map.len());
    for (key, value) in map {
        match key.as_str() {
            "$and" => clauses.push(Filter::And(parse_list(key, value)?)),
            "$or" => clauses.push(Filter::Or(parse_list(key, value)?)),
            k if k.starts_with('$') => {
                log::error!("Unsupported top-level query operator {}", k);
                return Err(filter_error(&format!("Unsupported query operator {}", k)));
            }
            _ => clauses.push(parse_field(key, value)?),
        }
    }
    Ok(collapse(clauses))
}

fn parse_list(operator: &str, value: &Value) -> DbResult<Vec<Filter>> {
    let items = value.as_array().ok_or_else(|| {
        log::error!("{} expects an array, found {}", operator, value);
        filter_error(&format!("{} expects an array", operator))
    })?;
    items.iter().map(Filter::from_json).collect()
}

fn parse_field(field: &str, value: &Value) -> DbResult<Filter> {
    let operators = match value {
        Value::Object(map) if !map.is_empty() && map.keys().all(|k| k.starts_with('$')) => map,
        Value::Object(map) if map.keys().any(|k| k.starts_with('$')) => {
            log::error!("Query on {} mixes operators and plain fields", field);
            return Err(filter_error(&format!(
                "Query on {} mixes operators and plain fields",
                field
            )));
        }
        _ => return Ok(Filter::Eq(field.to_string(), value.clone())),
    };

    let mut clauses = Vec::with_capacity(operators.len());
    for (operator, operand) in operators {
        let name = field.to_string();
        let clause = match operator.as_str() {
            "$eq" => Filter::Eq(name, operand.clone()),
            "$ne" => Filter::Ne(name, operand.clone()),
            "$gt" => Filter::Gt(name, operand.clone()),
            "$gte" => Filter::Gte(name, operand.clone()),
            "$lt" => Filter::Lt(name, operand.clone()),
            "$lte" => Filter::Lte(name, operand.clone()),
            "$in" => Filter::In(name, expect_array(operator, operand)?),
            "$nin" => Filter::Nin(name, expect_array(operator, operand)?),
            "$exists" => Filter::Exists(name, truthy(operand)),
            other => {
                log::error!("Unsupported query operator {} on {}", other, field);
                return Err(filter_error(&format!("Unsupported query operator {}", other)));
            }
        };
        clauses.push(clause);
    }
    Ok(collapse(clauses))
}

fn expect_array(operator: &str, operand: &Value) -> DbResult<Vec<Value>> {
    operand.as_array().cloned().ok_or_else(|| {
        log::error!("{} expects an array, found {}", operator, operand);
        filter_error(&format!("{} expects an array", operator))
    })
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::Null => false,
        _ => true,
    }
}

fn collapse(mut clauses: Vec<Filter>) -> Filter {
    match clauses.len() {
        0 => Filter::All,
        1 => clauses.remove(0),
        _ => Filter::And(clauses),
    }
}

fn filter_error(message: &str) -> DbError {
    DbError::new(message, ErrorKind::FilterError)
}
