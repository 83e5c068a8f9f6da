//! Seeding behaviour against the in-memory target.

use bson::Bson;
use mongo_seed::testing::MemoryStore;
use mongo_seed::{SeedError, SeedOpts, Seeder, WriteFailure};
use serde_json::json;
use std::path::PathBuf;
use tempfile::TempDir;

const FLIGHTS: &str = r#"[{"_id":1,"code":"AA100"},{"_id":2,"code":"AA200"}]"#;

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter("mongo_seed=debug")
        .with_test_writer()
        .try_init()
        .ok();
}

fn seeder(store: &MemoryStore, overwrite: bool) -> Seeder<mongo_seed::testing::MemoryConnector> {
    let opts = SeedOpts::new("localhost", "cit_test").with_overwrite(overwrite);
    Seeder::with_connector(store.connector("cit_test"), opts).unwrap()
}

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[tokio::test]
async fn test_in_memory_records_all_inserted() {
    init_logging();
    let store = MemoryStore::new();
    let records: Vec<_> = (0..25)
        .map(|i| json!({"_id": i, "name": format!("crew {i}")}))
        .collect();

    let report = seeder(&store, false)
        .seed(records, Some("crews"))
        .await
        .unwrap();

    let result = report.get("crews").unwrap();
    assert_eq!(result.inserted, 25);
    assert_eq!(result.skipped_duplicates, 0);
    assert!(result.success);
    assert_eq!(store.count("crews"), 25);
}

#[tokio::test]
async fn test_records_without_id_get_generated_ids() {
    let store = MemoryStore::new();
    let records = vec![json!({"name": "Ada"}), json!({"name": "Grace"})];

    let report = seeder(&store, false)
        .seed(records.clone(), Some("crews"))
        .await
        .unwrap();
    assert_eq!(report.total_inserted(), 2);

    // No shared unique key, so a second run inserts again
    let report = seeder(&store, false)
        .seed(records, Some("crews"))
        .await
        .unwrap();
    assert_eq!(report.total_skipped_duplicates(), 0);
    assert_eq!(store.count("crews"), 4);
}

#[tokio::test]
async fn test_flights_file_then_repeat_skips_duplicates() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "flights.json", FLIGHTS);
    let store = MemoryStore::new();
    let seeder = seeder(&store, false);

    let first = seeder.seed(path.as_path(), None).await.unwrap();
    let result = first.get("flights").unwrap();
    assert_eq!(result.inserted, 2);
    assert_eq!(result.skipped_duplicates, 0);
    assert_eq!(store.count("flights"), 2);

    let second = seeder.seed(path.as_path(), None).await.unwrap();
    let result = second.get("flights").unwrap();
    assert_eq!(result.inserted, 0);
    assert_eq!(result.skipped_duplicates, 2);
    assert!(result.success);
    assert_eq!(store.count("flights"), 2);
}

#[tokio::test]
async fn test_repeat_in_memory_seed_skips_all_five() {
    let store = MemoryStore::new();
    let records: Vec<_> = (1..=5).map(|i| json!({"_id": i})).collect();
    let seeder = seeder(&store, false);

    seeder.seed(records.clone(), Some("crews")).await.unwrap();
    let report = seeder.seed(records, Some("crews")).await.unwrap();

    let result = report.get("crews").unwrap();
    assert_eq!(result.skipped_duplicates, 5);
    assert!(result.success);
}

#[tokio::test]
async fn test_overwrite_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "flights.json", FLIGHTS);
    let store = MemoryStore::new();
    store.add_index("flights", "code_1");
    let seeder = seeder(&store, true);

    let first = seeder.seed(path.as_path(), None).await.unwrap();
    assert_eq!(store.count("flights"), 2);
    assert_eq!(first.total_skipped_duplicates(), 0);

    let second = seeder.seed(path.as_path(), None).await.unwrap();
    assert_eq!(store.count("flights"), 2);
    assert_eq!(second.total_skipped_duplicates(), 0);
    assert_eq!(second.get("flights").unwrap().inserted, 2);

    // Second run found the collection and recreated it without extra indexes
    assert_eq!(store.dropped(), vec!["flights".to_string()]);
    assert!(store.indexes("flights").is_empty());
}

#[tokio::test]
async fn test_overwrite_skips_duplicates_within_batch() {
    init_logging();
    let store = MemoryStore::new();
    store.put("crews", vec![bson::doc! {"_id": 7}]);
    let records = vec![json!({"_id": 1}), json!({"_id": 1}), json!({"_id": 2})];

    let report = seeder(&store, true)
        .seed(records, Some("crews"))
        .await
        .unwrap();

    let result = report.get("crews").unwrap();
    assert_eq!(result.inserted, 2);
    assert_eq!(result.skipped_duplicates, 1);
    assert!(result.success);
    assert_eq!(store.count("crews"), 2);
    assert_eq!(store.dropped(), vec!["crews".to_string()]);
}

#[tokio::test]
async fn test_directory_one_collection_per_file() {
    init_logging();
    let dir = TempDir::new().unwrap();
    write(&dir, "flights.json", FLIGHTS);
    write(&dir, "airports.json", r#"[{"_id":"JFK"},{"_id":"LAX"},{"_id":"SFO"}]"#);
    write(&dir, "crews.json", r#"{"_id":{"$oid":"5f1d7f1f8f1b2c3d4e5f6a7b"},"name":"Ada"}"#);
    let store = MemoryStore::new();

    let report = seeder(&store, false)
        .seed(dir.path(), None)
        .await
        .unwrap();

    let names: Vec<_> = report.results.iter().map(|r| r.collection.as_str()).collect();
    assert_eq!(names, vec!["airports", "crews", "flights"]);
    assert_eq!(store.count("airports"), 3);
    assert_eq!(store.count("crews"), 1);
    assert_eq!(store.count("flights"), 2);
    assert_eq!(report.total_inserted(), 6);

    let crew = &store.documents("crews")[0];
    assert!(crew.get_object_id("_id").is_ok());
}

#[tokio::test]
async fn test_directory_with_non_json_file_inserts_nothing() {
    let dir = TempDir::new().unwrap();
    write(&dir, "flights.json", FLIGHTS);
    write(&dir, "notes.txt", "remember to seed crews");
    let store = MemoryStore::new();

    let err = seeder(&store, false)
        .seed(dir.path(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, SeedError::Format { .. }), "{err}");
    assert!(store.collection_names().is_empty());
    // The connection was still released
    assert_eq!(store.connects(), store.shutdowns());
}

#[tokio::test]
async fn test_directory_with_subdirectory_inserts_nothing() {
    let dir = TempDir::new().unwrap();
    write(&dir, "flights.json", FLIGHTS);
    let archive = dir.path().join("archive");
    std::fs::create_dir(&archive).unwrap();
    let store = MemoryStore::new();

    let err = seeder(&store, false)
        .seed(dir.path(), None)
        .await
        .unwrap_err();

    match err {
        SeedError::Format { path } => assert_eq!(path, archive),
        other => panic!("unexpected error: {other}"),
    }
    assert!(store.collection_names().is_empty());
}

#[tokio::test]
async fn test_empty_file_creates_no_collection() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "flights.json", "");
    let store = MemoryStore::new();

    let err = seeder(&store, true)
        .seed(path.as_path(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, SeedError::File { .. }), "{err}");
    assert!(store.collection_names().is_empty());
    assert!(store.created().is_empty());
}

#[tokio::test]
async fn test_invalid_json_is_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "flights.json", r#"[{"_id":1,"code":"#);
    let store = MemoryStore::new();

    let err = seeder(&store, false)
        .seed(path.as_path(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, SeedError::Parse { .. }), "{err}");
}

#[tokio::test]
async fn test_missing_path_is_file_error() {
    let store = MemoryStore::new();
    let err = seeder(&store, false)
        .seed("/nonexistent/json/flights.json", None)
        .await
        .unwrap_err();
    assert!(matches!(err, SeedError::File { .. }), "{err}");
}

#[tokio::test]
async fn test_connection_failure() {
    let store = MemoryStore::new();
    let connector = store.connector("cit_test").failing("connection refused");
    let seeder =
        Seeder::with_connector(connector, SeedOpts::new("localhost", "cit_test")).unwrap();

    let err = seeder
        .seed(vec![json!({"_id": 1})], Some("crews"))
        .await
        .unwrap_err();

    match err {
        SeedError::Connection { target, source } => {
            assert_eq!(target, "memory://cit_test");
            assert_eq!(source.to_string(), "connection refused");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(store.collection_names().is_empty());
}

#[tokio::test]
async fn test_hard_failure_in_one_collection_lets_others_finish() {
    let dir = TempDir::new().unwrap();
    write(&dir, "flights.json", FLIGHTS);
    write(&dir, "airports.json", r#"[{"_id":"JFK"},{"_id":"LAX"}]"#);
    let store = MemoryStore::new();
    store.fail_insert(
        "flights",
        Bson::Int32(2),
        WriteFailure::from_code(Some(121), "Document failed validation"),
    );

    let err = seeder(&store, false)
        .seed(dir.path(), None)
        .await
        .unwrap_err();

    match err {
        SeedError::Insert { collection, failure } => {
            assert_eq!(collection, "flights");
            assert_eq!(
                failure,
                WriteFailure::Other {
                    code: Some(121),
                    message: "Document failed validation".to_string(),
                }
            );
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(store.count("airports"), 2);
}

#[tokio::test]
async fn test_empty_records_with_overwrite_clears_collection() {
    let store = MemoryStore::new();
    store.put("crews", vec![bson::doc! {"_id": 1}]);

    let report = seeder(&store, true)
        .seed(Vec::<serde_json::Value>::new(), Some("crews"))
        .await
        .unwrap();

    assert_eq!(report.get("crews").unwrap().inserted, 0);
    assert_eq!(store.count("crews"), 0);
    assert_eq!(store.dropped(), vec!["crews".to_string()]);
}

#[tokio::test]
async fn test_drop_database() {
    let store = MemoryStore::new();
    store.put("flights", vec![bson::doc! {"_id": 1}]);

    seeder(&store, false).drop_database().await.unwrap();

    assert!(store.collection_names().is_empty());
    assert_eq!(store.database_drops(), 1);
    assert_eq!(store.shutdowns(), 1);
}

#[tokio::test]
async fn test_concurrency_limit_from_options() {
    let store = MemoryStore::new();
    let opts = SeedOpts::new("localhost", "cit_test").with_max_concurrent_inserts(3);
    let seeder = Seeder::with_connector(store.connector("cit_test"), opts).unwrap();
    let records: Vec<_> = (0..40).map(|i| json!({"_id": i})).collect();

    let report = seeder.seed(records, Some("crews")).await.unwrap();

    assert_eq!(report.total_inserted(), 40);
    assert!(store.max_in_flight() <= 3);
}

#[tokio::test]
async fn test_iso_date_coercion_option() {
    let store = MemoryStore::new();
    let opts = SeedOpts::new("localhost", "cit_test").with_coerce_iso_dates(true);
    let seeder = Seeder::with_connector(store.connector("cit_test"), opts).unwrap();

    seeder
        .seed(
            vec![json!({"_id": 1, "departs": "2024-03-01T08:30:00Z"})],
            Some("flights"),
        )
        .await
        .unwrap();

    let doc = &store.documents("flights")[0];
    assert!(doc.get_datetime("departs").is_ok());
}
