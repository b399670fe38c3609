use trendsense::adapter::AdapterKind;
use trendsense::config::DatabaseConfig;
use trendsense::service::DatabaseService;
use trendsense::doc;
use trendsense::filter::by_id;

fn config(adapter: &str) -> DatabaseConfig {
    DatabaseConfig::from_lookup(|key| match key {
        "DATABASE_ADAPTER" => Some(adapter.to_string()),
        "PRIMARY_DATABASE_ADAPTER" => Some("mock_firebase".to_string()),
        "SECONDARY_DATABASE_ADAPTER" => Some("mock_firebase".to_string()),
        _ => None,
    })
    .unwrap()
}

#[test]
fn test_service_from_config() {
    let service = DatabaseService::new(&config("mock_firebase")).unwrap();
    let status = service.status();
    assert_eq!(status.kind, AdapterKind::MockFirebase);
    assert!(status.connected);

    let handler = service.clone();
    let id = handler.adapter().create_story(doc! { "title": "Grid parity" }).unwrap();
    assert!(service.adapter().find_one("stories", &by_id(&id), None).unwrap().is_some());
}

#[test]
fn test_dual_service_writes_both() {
    let service = DatabaseService::new(&config("dual")).unwrap();
    assert_eq!(service.status().kind, AdapterKind::Dual);
    assert!(service.status().connected);
    service.initialize().unwrap();
}

#[test]
fn test_lenient_view_swallows_errors() {
    let service = DatabaseService::new(&config("mock_firebase")).unwrap();
    service.shutdown().unwrap();

    let lenient = service.lenient();
    assert!(lenient.get_companies(None).is_empty());
    assert_eq!(lenient.create_story(doc! { "title": "lost" }), None);
}

#[test]
fn test_unknown_adapter_rejected() {
    let err = DatabaseConfig::from_lookup(|key| (key == "DATABASE_ADAPTER").then(|| "cassandra".to_string())).unwrap_err();
    assert_eq!(err.kind(), &trendsense::ErrorKind::ConfigError);
}
