use itertools::Itertools;
use serde_json::Value;
use std::fmt::Display;

use crate::common::SortOrder;
use crate::errors::{DbError, DbResult, ErrorKind};
use crate::filter::Filter;

/// One step of an aggregation pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// Keeps documents matching the filter.
    Match(Filter),
    /// Orders documents by the given keys.
    Sort(Vec<(String, SortOrder)>),
    /// Keeps at most this many documents.
    Limit(u64),
    /// Drops this many documents.
    Skip(u64),
    /// Inclusion projection; `_id` is always kept.
    Project(Vec<String>),
    /// Any other stage, kept verbatim. MongoDB executes it natively, the
    /// in-memory engine skips it.
    Unsupported { name: String, spec: Value },
}

impl Stage {
    pub fn name(&self) -> &str {
        match self {
            Stage::Match(_) => "$match",
            Stage::Sort(_) => "$sort",
            Stage::Limit(_) => "$limit",
            Stage::Skip(_) => "$skip",
            Stage::Project(_) => "$project",
            Stage::Unsupported { name, .. } => name,
        }
    }

    fn from_json(stage: &Value) -> DbResult<Stage> {
        let map = stage
            .as_object()
            .filter(|m| m.len() == 1)
            .ok_or_else(|| {
                log::error!("Pipeline stage must be a single-key object, found {}", stage);
                pipeline_error("Pipeline stage must be a single-key object")
            })?;
        // the filter above guarantees exactly one entry
        let (name, spec) = map.iter().next().ok_or_else(|| pipeline_error("Empty pipeline stage"))?;

        match name.as_str() {
            "$match" => Ok(Stage::Match(Filter::from_json(spec)?)),
            "$sort" => {
                let keys = spec.as_object().ok_or_else(|| pipeline_error("$sort expects an object"))?;
                let mut sort_by = Vec::with_capacity(keys.len());
                for (field, direction) in keys {
                    let direction = direction.as_i64().ok_or_else(|| {
                        log::error!("$sort direction for {} must be 1 or -1, found {}", field, direction);
                        pipeline_error("$sort direction must be 1 or -1")
                    })?;
                    sort_by.push((field.clone(), SortOrder::from_direction(direction)));
                }
                Ok(Stage::Sort(sort_by))
            }
            "$limit" => Ok(Stage::Limit(non_negative(name, spec)?)),
            "$skip" => Ok(Stage::Skip(non_negative(name, spec)?)),
            "$project" => Ok(parse_projection(spec)),
            _ => Ok(Stage::Unsupported {
                name: name.clone(),
                spec: spec.clone(),
            }),
        }
    }
}

/// Inclusion-only projections become [Stage::Project]; exclusions (`_id`
/// included) and computed fields are left to backends that understand them.
fn parse_projection(spec: &Value) -> Stage {
    let unsupported = || Stage::Unsupported {
        name: "$project".to_string(),
        spec: spec.clone(),
    };

    let Some(fields) = spec.as_object() else {
        return unsupported();
    };

    let mut included = Vec::with_capacity(fields.len());
    for (field, flag) in fields {
        match flag {
            Value::Bool(true) => included.push(field.clone()),
            Value::Number(n) if n.as_f64().map(|f| f != 0.0).unwrap_or(false) => {
                included.push(field.clone())
            }
            _ => return unsupported(),
        }
    }
    Stage::Project(included)
}

fn non_negative(name: &str, spec: &Value) -> DbResult<u64> {
    spec.as_u64().ok_or_else(|| {
        log::error!("{} expects a non-negative integer, found {}", name, spec);
        pipeline_error(&format!("{} expects a non-negative integer", name))
    })
}

fn pipeline_error(message: &str) -> DbError {
    DbError::new(message, ErrorKind::PipelineError)
}

/// An ordered list of aggregation stages.
///
/// ```rust,ignore
/// let pipeline = Pipeline::new()
///     .match_filter(field("sector").eq("Energy"))
///     .sort_by("score", SortOrder::Descending)
///     .limit(2);
/// let top = adapter.aggregate("companies", &pipeline)?;
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Pipeline {
        Pipeline::default()
    }

    /// Parses a MongoDB-style pipeline: an array of single-key stage objects.
    pub fn from_json(pipeline: &Value) -> DbResult<Pipeline> {
        let stages = pipeline.as_array().ok_or_else(|| {
            log::error!("Pipeline must be an array, found {}", pipeline);
            pipeline_error("Pipeline must be an array")
        })?;
        let stages = stages.iter().map(Stage::from_json).collect::<DbResult<Vec<_>>>()?;
        Ok(Pipeline { stages })
    }

    pub fn stage(mut self, stage: Stage) -> Pipeline {
        self.stages.push(stage);
        self
    }

    pub fn match_filter(self, filter: Filter) -> Pipeline {
        self.stage(Stage::Match(filter))
    }

    pub fn sort_by(mut self, field: &str, order: SortOrder) -> Pipeline {
        // consecutive sort keys belong to the same $sort stage
        if let Some(Stage::Sort(keys)) = self.stages.last_mut() {
            keys.push((field.to_string(), order));
            return self;
        }
        self.stage(Stage::Sort(vec![(field.to_string(), order)]))
    }

    pub fn limit(self, limit: u64) -> Pipeline {
        self.stage(Stage::Limit(limit))
    }

    pub fn skip(self, skip: u64) -> Pipeline {
        self.stage(Stage::Skip(skip))
    }

    pub fn project(self, fields: &[&str]) -> Pipeline {
        self.stage(Stage::Project(fields.iter().map(|f| f.to_string()).collect()))
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl Display for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.stages.iter().map(Stage::name).join(", "))
    }
}
