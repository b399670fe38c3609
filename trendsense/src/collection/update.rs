use serde_json::{Number, Value};

use crate::collection::Document;
use crate::common::PROTECTED_FIELDS;
use crate::errors::{DbError, DbResult, ErrorKind};

/// A single field-level modification.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOperation {
    /// Sets the field (dotted paths allowed) to the value.
    Set(String, Value),
    /// Removes the field.
    Unset(String),
    /// Adds the number to the field, creating it when missing.
    Inc(String, Number),
}

impl UpdateOperation {
    pub fn field(&self) -> &str {
        match self {
            UpdateOperation::Set(field, _) => field,
            UpdateOperation::Unset(field) => field,
            UpdateOperation::Inc(field, _) => field,
        }
    }

    fn is_protected(&self) -> bool {
        PROTECTED_FIELDS.contains(&self.field())
    }
}

/// An update specification.
///
/// Updates always merge the named fields into the stored document; they never
/// replace it wholesale. Operations naming `_id` or `created_at` are ignored,
/// and every adapter refreshes `updated_at` on each write.
///
/// ```rust,ignore
/// let update = Update::set("status", "published").and_inc("views", 1);
/// adapter.update_one("stories", &field("_id").eq(id), &update, false)?;
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    operations: Vec<UpdateOperation>,
}

impl Update {
    pub fn new() -> Update {
        Update::default()
    }

    pub fn set<T: Into<Value>>(field: &str, value: T) -> Update {
        Update::new().and_set(field, value)
    }

    pub fn unset(field: &str) -> Update {
        Update::new().and_unset(field)
    }

    pub fn inc<T: Into<Number>>(field: &str, amount: T) -> Update {
        Update::new().and_inc(field, amount)
    }

    /// Sets every top-level field of `document`. This is how a literal
    /// replacement mapping is interpreted.
    pub fn set_document(document: &Document) -> Update {
        let operations = document
            .iter()
            .map(|(k, v)| UpdateOperation::Set(k.clone(), v.clone()))
            .collect();
        Update { operations }
    }

    pub fn and_set<T: Into<Value>>(mut self, field: &str, value: T) -> Update {
        self.operations
            .push(UpdateOperation::Set(field.to_string(), value.into()));
        self
    }

    pub fn and_unset(mut self, field: &str) -> Update {
        self.operations.push(UpdateOperation::Unset(field.to_string()));
        self
    }

    pub fn and_inc<T: Into<Number>>(mut self, field: &str, amount: T) -> Update {
        self.operations
            .push(UpdateOperation::Inc(field.to_string(), amount.into()));
        self
    }

    pub fn operations(&self) -> &[UpdateOperation] {
        &self.operations
    }

    /// Operations that are allowed to touch a stored document.
    pub fn effective_operations(&self) -> impl Iterator<Item = &UpdateOperation> {
        self.operations.iter().filter(|op| !op.is_protected())
    }

    pub fn is_empty(&self) -> bool {
        self.effective_operations().next().is_none()
    }

    /// Parses the MongoDB-style update language: either a literal mapping of
    /// fields to set, or an envelope made of `$set`, `$unset` and `$inc`.
    pub fn from_json(value: &Value) -> DbResult<Update> {
        let map = value.as_object().ok_or_else(|| {
            log::error!("Update specification must be an object, found {}", value);
            DbError::new("Update specification must be an object", ErrorKind::UpdateError)
        })?;

        let operator_count = map.keys().filter(|k| k.starts_with('$')).count();
        if operator_count == 0 {
            let operations = map
                .iter()
                .map(|(k, v)| UpdateOperation::Set(k.clone(), v.clone()))
                .collect();
            return Ok(Update { operations });
        }
        if operator_count != map.len() {
            log::error!("Update mixes operators and plain fields: {}", value);
            return Err(DbError::new(
                "Update specification cannot mix operators and plain fields",
                ErrorKind::UpdateError,
            ));
        }

        let mut update = Update::new();
        for (operator, body) in map {
            match operator.as_str() {
                "$set" => {
                    for (field, v) in expect_object(operator, body)? {
                        update = update.and_set(field, v.clone());
                    }
                }
                "$unset" => match body {
                    Value::Array(fields) => {
                        for field in fields {
                            let name = field.as_str().ok_or_else(|| {
                                DbError::new("$unset field names must be strings", ErrorKind::UpdateError)
                            })?;
                            update = update.and_unset(name);
                        }
                    }
                    other => {
                        for field in expect_object(operator, other)?.keys() {
                            update = update.and_unset(field);
                        }
                    }
                },
                "$inc" => {
                    for (field, v) in expect_object(operator, body)? {
                        let amount = v.as_number().cloned().ok_or_else(|| {
                            log::error!("$inc amount for {} is not a number: {}", field, v);
                            DbError::new(
                                &format!("$inc amount for {} must be a number", field),
                                ErrorKind::UpdateError,
                            )
                        })?;
                        update = update.and_inc(field, amount);
                    }
                }
                other => {
                    log::error!("Unsupported update operator {}", other);
                    return Err(DbError::new(
                        &format!("Unsupported update operator {}", other),
                        ErrorKind::UpdateError,
                    ));
                }
            }
        }
        Ok(update)
    }

    /// Applies the update to a document in place. Does not touch timestamps.
    pub(crate) fn apply(&self, document: &mut Document) -> DbResult<()> {
        for operation in self.effective_operations() {
            match operation {
                UpdateOperation::Set(field, value) => document.put(field, value.clone())?,
                UpdateOperation::Unset(field) => {
                    document.remove(field);
                }
                UpdateOperation::Inc(field, amount) => {
                    let current = document.get(field).cloned();
                    let next = increment(field, current.as_ref(), amount)?;
                    document.put(field, next)?;
                }
            }
        }
        Ok(())
    }
}

fn expect_object<'a>(
    operator: &str,
    body: &'a Value,
) -> DbResult<&'a serde_json::Map<String, Value>> {
    body.as_object().ok_or_else(|| {
        log::error!("{} expects an object, found {}", operator, body);
        DbError::new(
            &format!("{} expects an object", operator),
            ErrorKind::UpdateError,
        )
    })
}

fn increment(field: &str, current: Option<&Value>, amount: &Number) -> DbResult<Value> {
    match current {
        None | Some(Value::Null) => Ok(Value::Number(amount.clone())),
        Some(Value::Number(existing)) => {
            if let (Some(a), Some(b)) = (existing.as_i64(), amount.as_i64()) {
                if let Some(sum) = a.checked_add(b) {
                    return Ok(Value::from(sum));
                }
            }
            let sum = existing.as_f64().unwrap_or(0.0) + amount.as_f64().unwrap_or(0.0);
            Number::from_f64(sum).map(Value::Number).ok_or_else(|| {
                DbError::new(
                    &format!("Increment of {} produced a non-finite number", field),
                    ErrorKind::UpdateError,
                )
            })
        }
        Some(other) => {
            log::error!("Cannot increment non-numeric field {} ({})", field, other);
            Err(DbError::new(
                &format!("Cannot increment non-numeric field {}", field),
                ErrorKind::UpdateError,
            ))
        }
    }
}
