use trendsense::adapter::mock::MockFirebaseAdapter;
use trendsense::common::COMPANIES_COLLECTION;
use trendsense::filter::by_id;
use trendsense::migration::{migrate_collections, MigrationOptions};
use trendsense::DatabaseAdapter;
use trendsense_int_test::test_util::create_test_docs;

#[test]
fn test_migrate_mock_to_firebase_fallback() {
    let source = DatabaseAdapter::new(MockFirebaseAdapter::new());
    source.connect().unwrap();
    let ids = source.insert_many(COMPANIES_COLLECTION, create_test_docs()).unwrap();

    let target = trendsense::factory::firebase_with_fallback(&Default::default());
    target.connect().unwrap();

    let report = migrate_collections(&source, &target, &[COMPANIES_COLLECTION], MigrationOptions::default()).unwrap();
    assert_eq!(report.total_copied(), 5);
    for id in &ids {
        let original = source.find_one(COMPANIES_COLLECTION, &by_id(id), None).unwrap();
        let copy = target.find_one(COMPANIES_COLLECTION, &by_id(id), None).unwrap();
        assert_eq!(original, copy);
    }

    let again = migrate_collections(&source, &target, &[COMPANIES_COLLECTION], MigrationOptions::default()).unwrap();
    assert_eq!(again.collections[COMPANIES_COLLECTION].skipped, 5);
}
