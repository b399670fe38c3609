use serde_json::json;
use trendsense::aggregate::Pipeline;
use trendsense::common::SortOrder;
use trendsense::errors::DbResult;
use trendsense::filter::field;
use trendsense_int_test::test_util::{
    cleanup, create_firebase_test_context, create_test_context, create_test_docs, run_test, TestContext,
};

const CONTEXTS: [fn() -> DbResult<TestContext>; 2] = [create_test_context, create_firebase_test_context];

#[test]
fn test_match_then_limit() {
    for before in CONTEXTS {
        run_test(
            before,
            |ctx| {
                let db = ctx.adapter();
                db.insert_many(ctx.collection(), create_test_docs())?;

                let pipeline = Pipeline::from_json(&json!([
                    {"$match": {"sector": "Energy"}},
                    {"$limit": 2}
                ]))?;
                let docs = db.aggregate(ctx.collection(), &pipeline)?;
                assert_eq!(docs.len(), 2);
                assert!(docs.iter().all(|d| d.get_str("sector") == Some("Energy")));
                Ok(())
            },
            cleanup,
        );
    }
}

#[test]
fn test_full_stage_subset() {
    for before in CONTEXTS {
        run_test(
            before,
            |ctx| {
                let db = ctx.adapter();
                db.insert_many(ctx.collection(), create_test_docs())?;

                let pipeline = Pipeline::new()
                    .match_filter(field("esg_score").gte(50))
                    .sort_by("esg_score", SortOrder::Ascending)
                    .skip(1)
                    .limit(2)
                    .project(&["name"]);
                let docs = db.aggregate(ctx.collection(), &pipeline)?;
                let names: Vec<_> = docs.iter().filter_map(|d| d.get_str("name")).collect();
                assert_eq!(names, vec!["Cobalt Wind", "Equinox Grid"]);
                assert!(docs.iter().all(|d| !d.contains_key("sector")));
                Ok(())
            },
            cleanup,
        );
    }
}

#[test]
fn test_unsupported_stage_is_skipped() {
    for before in CONTEXTS {
        run_test(
            before,
            |ctx| {
                let db = ctx.adapter();
                db.insert_many(ctx.collection(), create_test_docs())?;

                let pipeline = Pipeline::from_json(&json!([
                    {"$match": {"sector": "Energy"}},
                    {"$group": {"_id": "$sector", "count": {"$sum": 1}}}
                ]))?;
                let docs = db.aggregate(ctx.collection(), &pipeline)?;
                assert_eq!(docs.len(), 3);
                Ok(())
            },
            cleanup,
        );
    }
}
