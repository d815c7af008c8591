mod common;

use std::fs;

use serde_json::Value;
use tempfile::tempdir;

use common::{backends, interaction};
use crm_logger::export::{export_path, from_csv_str, to_csv_string, write_table_to_file, ExportFormat};
use crm_logger::query::{sort_by_column, SortOrder};
use crm_logger::schema::interactions;
use crm_logger::{InteractionStore, UpsertPolicy};

#[test]
fn test_loaded_snapshot_survives_csv_export() {
    let dir = tempdir().expect("Failed to create temp directory");
    for (kind, backend) in backends(dir.path()) {
        let store = InteractionStore::new(backend, UpsertPolicy::default());
        store.initialize().unwrap();
        let mut tricky = interaction("Carla");
        tricky.notes = "said \"bravo\", twice\nthen left".to_string();
        store.upsert_interaction(&interaction("Ana")).unwrap();
        store.upsert_interaction(&tricky).unwrap();

        let snapshot = store.load_snapshot();
        let document = to_csv_string(&snapshot).unwrap();
        assert!(document.starts_with("Date,Customer Name,Contact"), "{kind}");
        assert_eq!(from_csv_str(&document).unwrap(), snapshot, "{kind}");
    }
}

#[test]
fn test_export_writes_sorted_view_as_json() {
    let dir = tempdir().expect("Failed to create temp directory");
    let (_, backend) = backends(dir.path()).remove(0);
    let store = InteractionStore::new(backend, UpsertPolicy::default());
    store.initialize().unwrap();
    store.upsert_interaction(&interaction("Bo")).unwrap();
    store.upsert_interaction(&interaction("Ana")).unwrap();

    let view = sort_by_column(&store.load_snapshot(), interactions::CUSTOMER_NAME, SortOrder::Ascending);
    let path = export_path(&dir.path().join("out"), interactions::TABLE, ExportFormat::Json, "20240110_0915");
    assert!(path.ends_with("customer_log_20240110_0915.json"));

    write_table_to_file(&view, ExportFormat::Json, &path).unwrap();

    let parsed: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    let rows = parsed.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["Customer Name"], "Ana");
    assert_eq!(rows[1]["Total Visits"], "1");

    let keys: Vec<&str> = rows[0].as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(keys, interactions::HEADER.to_vec());
}

#[test]
fn test_export_csv_file_matches_view() {
    let dir = tempdir().expect("Failed to create temp directory");
    let (_, backend) = backends(dir.path()).remove(1);
    let store = InteractionStore::new(backend, UpsertPolicy::default());
    store.initialize().unwrap();
    store.upsert_interaction(&interaction("Ana")).unwrap();

    let view = store.load_snapshot();
    let path = dir.path().join("exports").join("log.csv");
    write_table_to_file(&view, ExportFormat::Csv, &path).unwrap();

    assert_eq!(from_csv_str(&fs::read_to_string(&path).unwrap()).unwrap(), view);
}

#[test]
fn test_export_format_parsing() {
    assert_eq!("JSON".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
    assert_eq!(" csv ".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
    assert!("xlsx".parse::<ExportFormat>().is_err());
}
