// Integration tests for full index builds

use crate::common::{
    create_test_indexer, create_test_services, stored_identifiers, stored_values, MemoryRecord,
    MemorySource, RecordDir, DC_RECORD, ISO_RECORD, TEST_HEAP,
};
use metacat::core::indexer::FieldMode;
use metacat::core::record::XmlRecord;
use metacat::core::storage::IndexStorage;
use metacat::core::types::{sort_field_name, BuildState};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_build_full_publishes_index() {
    let temp_dir = TempDir::new().unwrap();
    let indexer = create_test_indexer(temp_dir.path(), FieldMode::Concurrent);
    let source = MemorySource::new(vec![
        MemoryRecord::new("iso-rivers", ISO_RECORD),
        MemoryRecord::new("dc-soil", DC_RECORD),
    ]);

    let report = indexer
        .build_full("main", &source, CancellationToken::new())
        .await
        .expect("Build failed");

    assert_eq!(report.state, BuildState::Completed);
    assert_eq!(report.records_indexed, 2);
    assert_eq!(report.records_skipped, 0);
    assert_eq!(indexer.state("main"), BuildState::Completed);

    let storage = IndexStorage::new(temp_dir.path());
    assert!(storage.has_index("main"));
    assert!(!storage.has_staging("main"));

    let index = storage.open_index("main", TEST_HEAP).unwrap();
    assert_eq!(index.num_docs().unwrap(), 2);
    assert_eq!(stored_identifiers(&index), vec!["dc-soil", "iso-rivers"]);
    assert_eq!(
        stored_values(&index, &sort_field_name("Title")),
        vec!["Rivers of Europe", "Soil map"]
    );
}

#[tokio::test]
async fn test_metadata_matches_report() {
    let temp_dir = TempDir::new().unwrap();
    let indexer = create_test_indexer(temp_dir.path(), FieldMode::Sequential);
    let source = MemorySource::new(vec![
        MemoryRecord::new("iso-rivers", ISO_RECORD),
        MemoryRecord::new("dc-soil", DC_RECORD),
        MemoryRecord::new("broken", "<unclosed>"),
    ]);

    let report = indexer
        .build_full("main", &source, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.records_indexed, 2);
    assert_eq!(report.records_skipped, 1);

    let metadata = IndexStorage::new(temp_dir.path())
        .get_metadata("main")
        .unwrap();
    assert_eq!(metadata.instance_id, "main");
    assert_eq!(metadata.records_indexed, report.records_indexed);
    assert_eq!(metadata.records_skipped, report.records_skipped);
    assert_eq!(metadata.families.get("iso19139"), Some(&1));
    assert_eq!(metadata.families.get("dublincore"), Some(&1));
    assert!(metadata.index_size_bytes > 0);
}

#[tokio::test]
async fn test_failed_fetch_skips_only_that_record() {
    let temp_dir = TempDir::new().unwrap();
    let indexer = create_test_indexer(temp_dir.path(), FieldMode::Concurrent);
    let source = MemorySource::generic(5).failing("r-2");

    let report = indexer
        .build_full("main", &source, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.state, BuildState::Completed);
    assert_eq!(report.records_indexed, 4);
    assert_eq!(report.records_skipped, 1);

    let index = IndexStorage::new(temp_dir.path())
        .open_index("main", TEST_HEAP)
        .unwrap();
    assert_eq!(stored_identifiers(&index), vec!["r-0", "r-1", "r-3", "r-4"]);
}

#[tokio::test]
async fn test_filter_excludes_hidden_and_drafts() {
    let temp_dir = TempDir::new().unwrap();
    let indexer = create_test_indexer(temp_dir.path(), FieldMode::Concurrent);

    let mut hidden = MemoryRecord::new("hidden", "<item><title>H</title></item>");
    hidden.hidden = true;
    let mut draft = MemoryRecord::new("draft", "<item><title>D</title></item>");
    draft.draft = true;
    let source = MemorySource::new(vec![
        MemoryRecord::new("public", "<item><title>P</title></item>"),
        hidden,
        draft,
    ]);

    let report = indexer
        .build_full("main", &source, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.records_indexed, 1);
    assert_eq!(source.fetched(), 1);
}

#[tokio::test]
async fn test_all_sentinel_document_is_still_indexed() {
    let temp_dir = TempDir::new().unwrap();
    let indexer = create_test_indexer(temp_dir.path(), FieldMode::Concurrent);
    let record = XmlRecord::parse("empty", "<nothing/>").unwrap();

    let report = indexer
        .build_from("main", vec![record], CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.records_indexed, 1);

    let index = IndexStorage::new(temp_dir.path())
        .open_index("main", TEST_HEAP)
        .unwrap();
    assert_eq!(stored_identifiers(&index), vec!["empty"]);
    assert_eq!(stored_values(&index, "Title"), vec!["null"]);
}

#[tokio::test]
async fn test_modes_produce_identical_indexes() {
    let mut titles = Vec::new();

    for mode in [FieldMode::Sequential, FieldMode::Concurrent] {
        let temp_dir = TempDir::new().unwrap();
        let indexer = create_test_indexer(temp_dir.path(), mode);
        let source = MemorySource::new(vec![
            MemoryRecord::new("iso-rivers", ISO_RECORD),
            MemoryRecord::new("dc-soil", DC_RECORD),
        ]);
        indexer
            .build_full("main", &source, CancellationToken::new())
            .await
            .unwrap();

        let index = IndexStorage::new(temp_dir.path())
            .open_index("main", TEST_HEAP)
            .unwrap();
        titles.push((
            stored_values(&index, "Title"),
            stored_values(&index, "Subject"),
            stored_values(&index, "Modified"),
        ));
    }

    assert_eq!(titles[0], titles[1]);
}

#[tokio::test]
async fn test_rebuild_replaces_previous_index() {
    let temp_dir = TempDir::new().unwrap();
    let indexer = create_test_indexer(temp_dir.path(), FieldMode::Concurrent);

    indexer
        .build_full("main", &MemorySource::generic(3), CancellationToken::new())
        .await
        .unwrap();
    indexer
        .build_full("main", &MemorySource::generic(1), CancellationToken::new())
        .await
        .unwrap();

    let storage = IndexStorage::new(temp_dir.path());
    let index = storage.open_index("main", TEST_HEAP).unwrap();
    assert_eq!(stored_identifiers(&index), vec!["r-0"]);
    assert_eq!(storage.get_metadata("main").unwrap().records_indexed, 1);
}

#[tokio::test]
async fn test_services_build_from_catalog() {
    let records = RecordDir::mixed();
    let services = create_test_services();
    services.import("main", records.path()).await.unwrap();

    let report = services
        .build_instance("main", CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.state, BuildState::Completed);
    assert_eq!(report.records_indexed, 5);

    let metadata = services.storage.get_metadata("main").unwrap();
    assert_eq!(metadata.families.len(), 5);
    assert_eq!(metadata.families.get("ebrim30"), Some(&1));
    assert_eq!(metadata.families.get("generic"), Some(&1));
}
