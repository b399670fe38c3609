use serde_json::Value;

use super::{ConditionOp, FieldCondition, FirestoreQuery};
use crate::collection::FindOptions;
use crate::common::DOC_ID;
use crate::filter::Filter;

/// Firestore rejects `in` clauses with more values than this.
const MAX_IN_VALUES: usize = 30;

/// How much of a [Filter] Firestore can evaluate itself.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct QueryPlan {
    pub conditions: Vec<FieldCondition>,
    /// `true` when the conditions express the whole filter, so ordering and
    /// limits may be pushed down as well.
    pub complete: bool,
}

/// Splits the top-level AND of `filter` into server-side conditions and a
/// remainder. The adapter always re-applies the full filter to what comes
/// back, so a partial plan only narrows the fetch.
pub(crate) fn plan_filter(filter: &Filter) -> QueryPlan {
    let clauses: Vec<&Filter> = match filter {
        Filter::All => vec![],
        Filter::And(filters) => filters.iter().collect(),
        other => vec![other],
    };

    let mut conditions = Vec::with_capacity(clauses.len());
    let mut complete = true;
    for clause in clauses {
        match condition(clause) {
            Some(c) => conditions.push(c),
            None => complete = false,
        }
    }
    QueryPlan { conditions, complete }
}

fn condition(filter: &Filter) -> Option<FieldCondition> {
    let (field, op, value) = match filter {
        Filter::Eq(f, v) if is_scalar(v) => (f, ConditionOp::Equal, v.clone()),
        Filter::Gt(f, v) if is_rangeable(v) => (f, ConditionOp::GreaterThan, v.clone()),
        Filter::Gte(f, v) if is_rangeable(v) => (f, ConditionOp::GreaterThanOrEqual, v.clone()),
        Filter::Lt(f, v) if is_rangeable(v) => (f, ConditionOp::LessThan, v.clone()),
        Filter::Lte(f, v) if is_rangeable(v) => (f, ConditionOp::LessThanOrEqual, v.clone()),
        Filter::In(f, vs) if !vs.is_empty() && vs.len() <= MAX_IN_VALUES && vs.iter().all(is_scalar) => {
            (f, ConditionOp::In, Value::Array(vs.clone()))
        }
        _ => return None,
    };
    // the key is not a stored field
    if field == DOC_ID {
        return None;
    }
    Some(FieldCondition::new(field, op, value))
}

/// Null never matches a missing field in Firestore, and arrays or maps
/// compare whole, so only plain scalars are pushed down.
fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::Bool(_) | Value::Number(_) | Value::String(_))
}

fn is_rangeable(value: &Value) -> bool {
    matches!(value, Value::Number(_) | Value::String(_))
}

/// Builds the Firestore query for a find. Ordering and the page window
/// (`skip + limit`, since Firestore has no offset here) are only pushed down
/// with a complete plan.
pub(crate) fn build_query(plan: QueryPlan, options: &FindOptions) -> FirestoreQuery {
    let mut query = FirestoreQuery::new();
    query.conditions = plan.conditions;
    if plan.complete {
        query.order_by = options.get_sort_by().to_vec();
        if options.get_limit() > 0 {
            let window = options.get_skip().saturating_add(options.get_limit());
            query.limit = Some(u32::try_from(window).unwrap_or(u32::MAX));
        }
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::SortOrder;
    use crate::filter::{all, by_id, field};
    use serde_json::json;

    #[test]
    fn test_all_is_complete_and_empty() {
        let plan = plan_filter(&all());
        assert!(plan.complete);
        assert!(plan.conditions.is_empty());
    }

    #[test]
    fn test_pushes_equality_and_ranges() {
        let plan = plan_filter(&field("sector").eq("Energy").and(field("score").gte(10)));
        assert!(plan.complete);
        assert_eq!(
            plan.conditions,
            vec![
                FieldCondition::new("sector", ConditionOp::Equal, json!("Energy")),
                FieldCondition::new("score", ConditionOp::GreaterThanOrEqual, json!(10)),
            ]
        );
    }

    #[test]
    fn test_unpushable_clauses_make_plan_partial() {
        let filter = field("sector")
            .eq("Energy")
            .and(field("ceo").exists())
            .and(field("meta").eq(json!({"a": 1})))
            .and(field("region").ne("EU"));
        let plan = plan_filter(&filter);
        assert!(!plan.complete);
        assert_eq!(plan.conditions.len(), 1);

        let plan = plan_filter(&field("a").eq(1).or(field("b").eq(2)));
        assert!(!plan.complete);
        assert!(plan.conditions.is_empty());

        assert!(!plan_filter(&by_id("x")).complete);
        assert!(!plan_filter(&field("a").eq(Value::Null)).complete);
    }

    #[test]
    fn test_in_clause_limits() {
        let plan = plan_filter(&field("a").in_array(vec![json!(1), json!(2)]));
        assert!(plan.complete);
        assert_eq!(plan.conditions[0].op, ConditionOp::In);

        let many: Vec<Value> = (0..31).map(|i| json!(i)).collect();
        assert!(!plan_filter(&field("a").in_array(many)).complete);
    }

    #[test]
    fn test_build_query_pushes_window_only_when_complete() {
        let options = FindOptions::new().sort_by("score", SortOrder::Descending).skip(5).limit(10);

        let query = build_query(plan_filter(&field("a").eq(1)), &options);
        assert_eq!(query.limit, Some(15));
        assert_eq!(query.order_by, vec![("score".to_string(), SortOrder::Descending)]);

        let query = build_query(plan_filter(&field("a").exists()), &options);
        assert_eq!(query.limit, None);
        assert!(query.order_by.is_empty());

        let query = build_query(plan_filter(&all()), &FindOptions::new());
        assert_eq!(query.limit, None);
    }
}
