use std::io::Write;
use trendsense::adapter::firebase::{FallbackReason, FirebaseAdapter, FirebaseBackend};
use trendsense::adapter::mock::MockFirebaseAdapter;
use trendsense::collection::FindOptions;
use trendsense::config::FirebaseConfig;
use trendsense::doc;
use trendsense::filter::{all, field};
use trendsense::{DatabaseAdapter, DatabaseAdapterProvider};
use trendsense_int_test::test_util::{cleanup, create_firebase_test_context, run_test};

#[test]
fn test_fallback_is_transparent() {
    run_test(
        create_firebase_test_context,
        |ctx| {
            let db = ctx.adapter();
            assert!(db.is_connected());
            assert!(db.is_fallback());

            let reference = DatabaseAdapter::new(MockFirebaseAdapter::new());
            reference.connect()?;

            for adapter in [&db, &reference] {
                adapter.insert_one(ctx.collection(), doc! { "_id": "a", "sector": "Energy" })?;
                adapter.insert_one(ctx.collection(), doc! { "_id": "b", "sector": "Tech" })?;
            }
            let from_firebase = db.find(ctx.collection(), &field("sector").eq("Energy"), &FindOptions::new())?;
            let from_mock = reference.find(ctx.collection(), &field("sector").eq("Energy"), &FindOptions::new())?;

            assert_eq!(from_firebase.len(), from_mock.len());
            assert_eq!(from_firebase[0].id(), from_mock[0].id());
            assert_eq!(from_firebase[0].get("sector"), from_mock[0].get("sector"));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_fallback_reasons() {
    let missing = FirebaseAdapter::new(FirebaseConfig::new());
    assert!(missing.connect().unwrap());
    assert!(matches!(
        missing.backend(),
        Some(FirebaseBackend::Fallback(FallbackReason::MissingCredentials(_)))
    ));

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(br#"{"type": "service_account", "project_id": ""}"#).unwrap();
    let invalid = FirebaseAdapter::new(FirebaseConfig::new().credentials_path(file.path()));
    assert!(invalid.connect().unwrap());
    assert!(matches!(
        invalid.backend(),
        Some(FirebaseBackend::Fallback(FallbackReason::InvalidCredentials(_)))
    ));
    assert_eq!(invalid.count_documents("anything", &all()).unwrap(), 0);
}
