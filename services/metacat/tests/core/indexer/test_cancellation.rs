// Integration tests for stopped, failed and overlapping builds

use crate::common::{create_test_indexer, stored_identifiers, FetchGate, MemorySource, TEST_HEAP};
use metacat::core::error::MetacatError;
use metacat::core::fields::FieldRegistry;
use metacat::core::indexer::{DocumentBuilder, FieldMode, FieldPool, Indexer, IndexerOptions};
use metacat::core::normalize::ValueNormalizer;
use metacat::core::source::RecordFilter;
use metacat::core::storage::IndexStorage;
use metacat::core::types::BuildState;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_stop_after_some_records() {
    let temp_dir = TempDir::new().unwrap();
    let indexer = create_test_indexer(temp_dir.path(), FieldMode::Concurrent);
    let token = CancellationToken::new();
    let source = MemorySource::generic(10).cancel_after(3, token.clone());

    let report = indexer.build_full("main", &source, token).await.unwrap();

    assert_eq!(report.state, BuildState::Stopped);
    assert_eq!(report.records_indexed, 3);
    assert_eq!(source.fetched(), 3);
    assert_eq!(indexer.state("main"), BuildState::Stopped);
    assert!(!indexer.is_building("main"));

    // No partial index is left behind
    let storage = IndexStorage::new(temp_dir.path());
    assert!(!storage.has_staging("main"));
    assert!(!storage.has_index("main"));
}

#[tokio::test]
async fn test_stopped_build_keeps_previous_index() {
    let temp_dir = TempDir::new().unwrap();
    let indexer = create_test_indexer(temp_dir.path(), FieldMode::Concurrent);

    indexer
        .build_full("main", &MemorySource::generic(2), CancellationToken::new())
        .await
        .unwrap();

    let token = CancellationToken::new();
    let source = MemorySource::generic(10).cancel_after(5, token.clone());
    let report = indexer.build_full("main", &source, token).await.unwrap();
    assert_eq!(report.state, BuildState::Stopped);

    let storage = IndexStorage::new(temp_dir.path());
    let index = storage.open_index("main", TEST_HEAP).unwrap();
    assert_eq!(stored_identifiers(&index), vec!["r-0", "r-1"]);
    assert_eq!(storage.get_metadata("main").unwrap().records_indexed, 2);
}

#[tokio::test]
async fn test_state_can_start_again_after_stop() {
    let temp_dir = TempDir::new().unwrap();
    let indexer = create_test_indexer(temp_dir.path(), FieldMode::Sequential);

    let token = CancellationToken::new();
    token.cancel();
    let stopped = indexer
        .build_full("main", &MemorySource::generic(4), token)
        .await
        .unwrap();
    assert_eq!(stopped.state, BuildState::Stopped);

    let completed = indexer
        .build_full("main", &MemorySource::generic(4), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(completed.state, BuildState::Completed);
    assert_eq!(completed.records_indexed, 4);
}

#[tokio::test]
async fn test_failed_build_keeps_previous_index() {
    let temp_dir = TempDir::new().unwrap();
    let healthy = create_test_indexer(temp_dir.path(), FieldMode::Concurrent);
    healthy
        .build_full("main", &MemorySource::generic(2), CancellationToken::new())
        .await
        .unwrap();

    // Writer heap below what tantivy accepts
    let documents = DocumentBuilder::new(
        Arc::new(FieldRegistry::builtin().unwrap()),
        Arc::new(ValueNormalizer::with_builtin_codelists()),
        FieldPool::new(1),
        FieldMode::Concurrent,
    );
    let broken = Indexer::new(
        Arc::new(IndexStorage::new(temp_dir.path())),
        documents,
        IndexerOptions {
            writer_heap_bytes: 1_000,
            filter: RecordFilter::default(),
        },
    );

    let err = broken
        .build_full("main", &MemorySource::generic(5), CancellationToken::new())
        .await
        .unwrap_err();
    assert!(err.is_storage());
    assert_eq!(broken.state("main"), BuildState::Failed);

    let storage = IndexStorage::new(temp_dir.path());
    assert!(!storage.has_staging("main"));
    let index = storage.open_index("main", TEST_HEAP).unwrap();
    assert_eq!(stored_identifiers(&index), vec!["r-0", "r-1"]);
}

#[tokio::test]
async fn test_second_build_is_rejected_while_running() {
    let temp_dir = TempDir::new().unwrap();
    let indexer = Arc::new(create_test_indexer(temp_dir.path(), FieldMode::Concurrent));
    let gate = Arc::new(FetchGate::default());
    let source = Arc::new(MemorySource::generic(5).hold_at(2, Arc::clone(&gate)));

    let first = {
        let indexer = Arc::clone(&indexer);
        let source = Arc::clone(&source);
        tokio::spawn(async move {
            indexer
                .build_full("main", source.as_ref(), CancellationToken::new())
                .await
        })
    };

    // The first build is parked inside its second fetch
    gate.entered().await;
    assert!(indexer.is_building("main"));
    assert_eq!(indexer.state("main"), BuildState::Building);

    let err = indexer
        .build_full("main", &MemorySource::generic(1), CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, MetacatError::BuildInProgress(ref id) if id == "main"));

    assert!(indexer.request_stop("main"));
    gate.release();

    let report = first.await.unwrap().unwrap();
    assert_eq!(report.state, BuildState::Stopped);
    assert_eq!(report.records_indexed, 2);
    assert!(!indexer.is_building("main"));
    assert!(!indexer.request_stop("main"));
}

#[tokio::test]
async fn test_request_stop_ends_running_build() {
    let temp_dir = TempDir::new().unwrap();
    let indexer = Arc::new(create_test_indexer(temp_dir.path(), FieldMode::Concurrent));
    let source = MemorySource::generic(10).stop_after(3, Arc::clone(&indexer), "main");

    let report = indexer
        .build_full("main", &source, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.state, BuildState::Stopped);
    assert_eq!(report.records_indexed, 3);
    assert_eq!(source.fetched(), 3);
    assert_eq!(indexer.state("main"), BuildState::Stopped);
    assert!(!indexer.is_building("main"));

    let storage = IndexStorage::new(temp_dir.path());
    assert!(!storage.has_staging("main"));
    assert!(!storage.has_index("main"));
}

#[tokio::test]
async fn test_catalog_failure_fails_build() {
    let temp_dir = TempDir::new().unwrap();
    let indexer = create_test_indexer(temp_dir.path(), FieldMode::Concurrent);
    indexer
        .build_full("main", &MemorySource::generic(2), CancellationToken::new())
        .await
        .unwrap();

    let source = MemorySource::generic(6).storage_failing("r-3");
    let err = indexer
        .build_full("main", &source, CancellationToken::new())
        .await
        .unwrap_err();

    assert!(err.is_storage());
    assert!(matches!(err, MetacatError::Catalog(_)));
    assert_eq!(source.fetched(), 4);
    assert_eq!(indexer.state("main"), BuildState::Failed);
    assert!(!indexer.is_building("main"));

    // The published index is the one from the first build
    let storage = IndexStorage::new(temp_dir.path());
    assert!(!storage.has_staging("main"));
    let index = storage.open_index("main", TEST_HEAP).unwrap();
    assert_eq!(stored_identifiers(&index), vec!["r-0", "r-1"]);
    assert_eq!(storage.get_metadata("main").unwrap().records_indexed, 2);
}

#[tokio::test]
async fn test_dropped_build_discards_staging() {
    let temp_dir = TempDir::new().unwrap();
    let indexer = create_test_indexer(temp_dir.path(), FieldMode::Concurrent);
    let storage = IndexStorage::new(temp_dir.path());
    let gate = Arc::new(FetchGate::default());
    let source = MemorySource::generic(4).hold_at(1, Arc::clone(&gate));

    let mut build = Box::pin(indexer.build_full("main", &source, CancellationToken::new()));
    tokio::select! {
        _ = &mut build => panic!("build finished while held at the gate"),
        _ = gate.entered() => {}
    }
    assert!(indexer.is_building("main"));
    assert!(storage.has_staging("main"));

    drop(build);

    assert!(!indexer.is_building("main"));
    assert_eq!(indexer.state("main"), BuildState::Stopped);
    assert!(!storage.has_staging("main"));
    assert!(!storage.has_index("main"));

    let report = indexer
        .build_full("main", &MemorySource::generic(2), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.state, BuildState::Completed);
}

#[tokio::test]
async fn test_other_instances_build_independently() {
    let temp_dir = TempDir::new().unwrap();
    let indexer = create_test_indexer(temp_dir.path(), FieldMode::Concurrent);

    let token = CancellationToken::new();
    token.cancel();
    indexer
        .build_full("stopped", &MemorySource::generic(3), token)
        .await
        .unwrap();
    let report = indexer
        .build_full("other", &MemorySource::generic(3), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.state, BuildState::Completed);
    assert_eq!(indexer.state("stopped"), BuildState::Stopped);
    assert_eq!(indexer.state("other"), BuildState::Completed);
    assert_eq!(indexer.state("never"), BuildState::Idle);
}
