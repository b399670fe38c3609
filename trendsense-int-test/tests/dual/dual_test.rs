use trendsense::collection::{FindOptions, Update};
use trendsense::doc;
use trendsense::filter::{all, by_id};
use trendsense::DatabaseAdapterProvider;
use trendsense_int_test::test_util::{cleanup, create_dual_test_context, run_test};

#[test]
fn test_write_reaches_both_stores() {
    run_test(
        create_dual_test_context,
        |ctx| {
            let db = ctx.adapter();
            let primary = ctx.primary().expect("dual context");
            let secondary = ctx.secondary().expect("dual context");

            let id = db.insert_one(ctx.collection(), doc! { "name": "Acme" })?;
            let first = primary.find_one(ctx.collection(), &by_id(&id), None)?.expect("primary copy");
            let second = secondary.find_one(ctx.collection(), &by_id(&id), None)?.expect("secondary copy");
            assert_eq!(first, second);

            db.update_one(ctx.collection(), &by_id(&id), &Update::set("status", "live"), false)?;
            let second = secondary.find_one(ctx.collection(), &by_id(&id), None)?.expect("secondary copy");
            assert_eq!(second.get_str("status"), Some("live"));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_reads_come_from_primary() {
    run_test(
        create_dual_test_context,
        |ctx| {
            let db = ctx.adapter();
            let secondary = ctx.secondary().expect("dual context");

            secondary.insert_one(ctx.collection(), doc! { "only": "secondary" })?;
            assert!(db.find(ctx.collection(), &all(), &FindOptions::new())?.is_empty());

            db.insert_one(ctx.collection(), doc! { "both": true })?;
            assert_eq!(db.count_documents(ctx.collection(), &all())?, 1);
            assert_eq!(secondary.count_documents(ctx.collection(), &all())?, 2);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_same_id_reads_primary_version() {
    run_test(
        create_dual_test_context,
        |ctx| {
            let db = ctx.adapter();
            let primary = ctx.primary().expect("dual context");
            let secondary = ctx.secondary().expect("dual context");

            primary.insert_one(ctx.collection(), doc! { "_id": "a", "v": "P" })?;
            secondary.insert_one(ctx.collection(), doc! { "_id": "a", "v": "S" })?;

            let found = db.find_one(ctx.collection(), &by_id("a"), None)?.expect("primary copy");
            assert_eq!(found.get_str("v"), Some("P"));
            let listed = db.find(ctx.collection(), &all(), &FindOptions::new())?;
            assert_eq!(listed.len(), 1);
            assert_eq!(listed[0].get_str("v"), Some("P"));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_secondary_outage_does_not_fail_writes() {
    run_test(
        create_dual_test_context,
        |ctx| {
            let db = ctx.adapter();
            let secondary = ctx.secondary().expect("dual context");
            secondary.disconnect()?;

            let id = db.insert_one(ctx.collection(), doc! { "a": 1 })?;
            assert!(db.find_one(ctx.collection(), &by_id(&id), None)?.is_some());
            Ok(())
        },
        cleanup,
    )
}
