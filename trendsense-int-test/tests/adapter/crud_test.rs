use serde_json::json;
use std::collections::HashSet;
use trendsense::collection::{FindOptions, Update};
use trendsense::common::SortOrder;
use trendsense::doc;
use trendsense::errors::{DbResult, ErrorKind};
use trendsense::filter::{all, by_id, field, Filter};
use trendsense_int_test::test_util::{
    cleanup, create_firebase_test_context, create_test_context, create_test_docs, run_test, TestContext,
};

const CONTEXTS: [fn() -> DbResult<TestContext>; 2] = [create_test_context, create_firebase_test_context];

#[test]
fn test_insert_and_find_round_trip() {
    for before in CONTEXTS {
        run_test(
            before,
            |ctx| {
                let db = ctx.adapter();
                let id = db.insert_one(ctx.collection(), doc! { "name": "Acme", "score": 3 })?;

                let found = db.find_one(ctx.collection(), &by_id(&id), None)?.expect("inserted document");
                assert_eq!(found.id(), Some(id));
                assert_eq!(found.get_str("name"), Some("Acme"));
                assert_eq!(found.get("score"), Some(&json!(3)));
                assert!(found.get_str("created_at").is_some());
                assert_eq!(found.get_str("created_at"), found.get_str("updated_at"));
                Ok(())
            },
            cleanup,
        );
    }
}

#[test]
fn test_initialize_collections_is_idempotent() {
    for before in CONTEXTS {
        run_test(
            before,
            |ctx| {
                let db = ctx.adapter();
                db.initialize_collections(&[ctx.collection()])?;
                db.insert_one(ctx.collection(), doc! { "a": 1 })?;
                db.initialize_collections(&[ctx.collection()])?;

                assert_eq!(db.count_documents(ctx.collection(), &all())?, 1);
                assert!(db.list_collections()?.iter().any(|c| c == ctx.collection()));
                Ok(())
            },
            cleanup,
        );
    }
}

#[test]
fn test_update_merges_and_keeps_identity() {
    for before in CONTEXTS {
        run_test(
            before,
            |ctx| {
                let db = ctx.adapter();
                let id = db.insert_one(ctx.collection(), doc! { "b": 2 })?;
                let before = db.find_one(ctx.collection(), &by_id(&id), None)?.expect("stored");

                let update = Update::set("a", 1).and_set("_id", "hijack").and_set("created_at", "never");
                assert!(db.update_one(ctx.collection(), &by_id(&id), &update, false)?);

                let after = db.find_one(ctx.collection(), &by_id(&id), None)?.expect("stored");
                assert_eq!(after.get("a"), Some(&json!(1)));
                assert_eq!(after.get("b"), Some(&json!(2)));
                assert_eq!(after.id(), Some(id));
                assert_eq!(after.get_str("created_at"), before.get_str("created_at"));
                assert!(after.get_str("updated_at") >= before.get_str("updated_at"));
                Ok(())
            },
            cleanup,
        );
    }
}

#[test]
fn test_upsert_creates_from_query() {
    for before in CONTEXTS {
        run_test(
            before,
            |ctx| {
                let db = ctx.adapter();
                let query = field("x").eq(5);
                assert!(!db.update_one(ctx.collection(), &query, &Update::set("y", 6), false)?);
                assert!(db.update_one(ctx.collection(), &query, &Update::set("y", 6), true)?);

                let created = db.find_one(ctx.collection(), &query, None)?.expect("upserted");
                assert_eq!(created.get("x"), Some(&json!(5)));
                assert_eq!(created.get("y"), Some(&json!(6)));
                assert!(created.has_id());
                assert!(created.contains_key("created_at"));
                assert!(created.contains_key("updated_at"));
                Ok(())
            },
            cleanup,
        );
    }
}

#[test]
fn test_delete_many_returns_count() {
    for before in CONTEXTS {
        run_test(
            before,
            |ctx| {
                let db = ctx.adapter();
                db.insert_many(ctx.collection(), vec![doc! { "k": 1 }, doc! { "k": 1 }, doc! { "k": 2 }])?;

                assert_eq!(db.delete_many(ctx.collection(), &field("k").eq(1))?, 2);
                let remaining = db.find(ctx.collection(), &all(), &FindOptions::new())?;
                assert_eq!(remaining.len(), 1);
                assert_eq!(remaining[0].get("k"), Some(&json!(2)));
                Ok(())
            },
            cleanup,
        );
    }
}

#[test]
fn test_find_with_sort_skip_limit_projection() {
    for before in CONTEXTS {
        run_test(
            before,
            |ctx| {
                let db = ctx.adapter();
                db.insert_many(ctx.collection(), create_test_docs())?;

                let options = FindOptions::new()
                    .sort_by("esg_score", SortOrder::Descending)
                    .skip(1)
                    .limit(2)
                    .projection(&["name"]);
                let docs = db.find(ctx.collection(), &field("sector").eq("Energy"), &options)?;
                let names: Vec<_> = docs.iter().filter_map(|d| d.get_str("name")).collect();
                assert_eq!(names, vec!["Equinox Grid", "Cobalt Wind"]);
                assert!(docs.iter().all(|d| d.has_id() && !d.contains_key("esg_score")));

                let filter = Filter::from_json(&json!({"$or": [{"sector": "Mining"}, {"esg_score": {"$lt": 60}}]}))?;
                assert_eq!(db.count_documents(ctx.collection(), &filter)?, 2);
                Ok(())
            },
            cleanup,
        );
    }
}

#[test]
fn test_duplicate_id_is_rejected() {
    for before in CONTEXTS {
        run_test(
            before,
            |ctx| {
                let db = ctx.adapter();
                db.insert_one(ctx.collection(), doc! { "_id": "fixed", "v": 1 })?;
                let err = db
                    .insert_one(ctx.collection(), doc! { "_id": "fixed", "v": 2 })
                    .expect_err("duplicate _id");
                assert_eq!(err.kind(), &ErrorKind::DuplicateKey);

                let kept = db.find_one(ctx.collection(), &by_id("fixed"), None)?.expect("stored");
                assert_eq!(kept.get("v"), Some(&json!(1)));
                Ok(())
            },
            cleanup,
        );
    }
}

#[test]
fn test_get_companies_by_sector() {
    for before in CONTEXTS {
        run_test(
            before,
            |ctx| {
                let db = ctx.adapter();
                db.delete_many("companies", &all())?;
                db.insert_many("companies", create_test_docs())?;

                let energy = db.get_companies(Some("Energy"))?;
                assert_eq!(energy.len(), 3);
                assert!(energy.iter().all(|c| c.get_str("sector") == Some("Energy")));
                assert_eq!(db.get_companies(None)?.len(), 5);

                db.delete_many("companies", &all())?;
                Ok(())
            },
            cleanup,
        );
    }
}

#[test]
fn test_companies_insert_count_and_sort() {
    for before in CONTEXTS {
        run_test(
            before,
            |ctx| {
                let db = ctx.adapter();
                db.delete_many("companies", &all())?;
                let ids = db.insert_many(
                    "companies",
                    vec![
                        doc! { "name": "B", "esg": 70 },
                        doc! { "name": "A", "esg": 80 },
                        doc! { "name": "C", "esg": 60 },
                    ],
                )?;
                assert_eq!(ids.len(), 3);
                assert!(ids.iter().all(|id| !id.is_empty()));
                assert_eq!(ids.iter().collect::<HashSet<_>>().len(), 3);
                assert_eq!(db.count_documents("companies", &all())?, 3);

                let options = FindOptions::new().sort_spec(&[("name", 1)]);
                let names: Vec<String> = db
                    .find("companies", &all(), &options)?
                    .iter()
                    .filter_map(|c| c.get_str("name").map(String::from))
                    .collect();
                assert_eq!(names, vec!["A", "B", "C"]);

                db.delete_many("companies", &all())?;
                Ok(())
            },
            cleanup,
        );
    }
}

#[test]
fn test_stories_newest_first() {
    for before in CONTEXTS {
        run_test(
            before,
            |ctx| {
                let db = ctx.adapter();
                db.delete_many("stories", &all())?;
                db.create_story(doc! { "title": "old", "created_at": "2024-01-01T00:00:00.000000Z" })?;
                db.create_story(doc! { "title": "new", "created_at": "2025-01-01T00:00:00.000000Z" })?;
                let id = db.create_story(doc! { "title": "mid", "created_at": "2024-06-01T00:00:00.000000Z" })?;

                let titles: Vec<String> = db
                    .get_stories(2)?
                    .iter()
                    .filter_map(|s| s.get_str("title").map(String::from))
                    .collect();
                assert_eq!(titles, vec!["new", "mid"]);
                assert!(db.get_story(&id)?.is_some());

                db.delete_many("stories", &all())?;
                Ok(())
            },
            cleanup,
        );
    }
}
