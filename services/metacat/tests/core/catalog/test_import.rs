// Integration tests for importing record files into a catalog

use crate::common::{create_test_services, RecordDir};
use metacat::core::catalog::{import_directory, RecordCatalog, RecordFileWalker};
use tempfile::TempDir;

#[tokio::test]
async fn test_import_mixed_directory() {
    let records = RecordDir::mixed();
    let services = create_test_services();

    let stats = services.import("main", records.path()).await.unwrap();
    assert_eq!(stats.inserted, 5);
    assert_eq!(stats.replaced, 0);
    assert_eq!(stats.skipped, 0);

    let catalog = services.catalogs.open("main").await.unwrap();
    let mut ids = catalog.list_identifiers().await.unwrap();
    ids.sort();
    assert_eq!(
        ids,
        vec![
            "dc-soil",
            "fc-hydro",
            "gen-plain",
            "iso-rivers",
            "urn:example:roads"
        ]
    );

    let location = catalog.location_of("iso-rivers").await.unwrap().unwrap();
    assert!(location.ends_with("rivers.xml"));
}

#[tokio::test]
async fn test_reimport_replaces_locations() {
    let records = RecordDir::mixed();
    let services = create_test_services();

    services.import("main", records.path()).await.unwrap();
    let stats = services.import("main", records.path()).await.unwrap();

    assert_eq!(stats.inserted, 0);
    assert_eq!(stats.replaced, 5);

    let catalog = services.catalogs.open("main").await.unwrap();
    assert_eq!(catalog.count().await.unwrap(), 5);
}

#[tokio::test]
async fn test_import_skips_malformed_and_uses_file_stem() {
    let records = RecordDir::with_files(&[
        ("broken.xml", "<open><never-closed>"),
        ("anonymous.xml", "<note><title>No id here</title></note>"),
        ("notes.txt", "not a record"),
    ]);
    let temp_dir = TempDir::new().unwrap();
    let catalog = RecordCatalog::open(&temp_dir.path().join("catalog.db"))
        .await
        .unwrap();

    let stats = import_directory(&catalog, records.path(), &["**/*.xml".to_string()])
        .await
        .unwrap();

    assert_eq!(stats.inserted, 1);
    assert_eq!(stats.skipped, 1);
    assert_eq!(catalog.list_identifiers().await.unwrap(), vec!["anonymous"]);
}

#[test]
fn test_walker_ignores_hidden_directories() {
    let records = RecordDir::with_files(&[
        ("visible/a.xml", "<a/>"),
        (".git/b.xml", "<b/>"),
        ("c.json", "{}"),
    ]);

    let walker = RecordFileWalker::new(&["**/*.xml".to_string()]).unwrap();
    let files = walker.collect_files(records.path()).unwrap();

    assert_eq!(files.len(), 1);
    assert!(files[0].ends_with("visible/a.xml"));
}

#[test]
fn test_walker_rejects_bad_pattern() {
    let err = RecordFileWalker::new(&["[".to_string()]).unwrap_err();
    assert!(err.is_configuration());
}
