// Test helper functions

use async_trait::async_trait;
use metacat::core::config::Config;
use metacat::core::error::{MetacatError, Result};
use metacat::core::fields::FieldRegistry;
use metacat::core::indexer::{DocumentBuilder, FieldMode, FieldPool, Indexer, IndexerOptions};
use metacat::core::normalize::ValueNormalizer;
use metacat::core::record::XmlRecord;
use metacat::core::services::Services;
use metacat::core::source::{RecordFilter, RecordSource};
use metacat::core::storage::{IndexStorage, TantivyIndex};
use metacat::core::types::IDENTIFIER_FIELD;
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tantivy::collector::TopDocs;
use tantivy::query::AllQuery;
use tantivy::schema::Value;
use tantivy::TantivyDocument;
use tokio_util::sync::CancellationToken;

/// Writer heap used by test builds
#[allow(dead_code)] // Used in integration tests
pub const TEST_HEAP: usize = 15_000_000;

/// Create test services with temporary storage
#[allow(dead_code)] // Used in integration tests
pub fn create_test_services() -> Services {
    let mut config = Config::default();

    // Use temporary directory for tests
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    config.storage.index_dir = temp_dir.path().join("indexes");
    config.storage.catalog_dir = temp_dir.path().join("catalogs");
    // Keep temp dir alive for duration of test
    std::mem::forget(temp_dir);

    Services::new(config).expect("Failed to create services")
}

/// Indexer over `root` with built-in fields and a private pool
#[allow(dead_code)] // Used in integration tests
pub fn create_test_indexer(root: &Path, mode: FieldMode) -> Indexer {
    let documents = DocumentBuilder::new(
        Arc::new(FieldRegistry::builtin().expect("Built-in fields parse")),
        Arc::new(ValueNormalizer::with_builtin_codelists()),
        FieldPool::new(3),
        mode,
    );
    let options = IndexerOptions {
        writer_heap_bytes: TEST_HEAP,
        filter: RecordFilter::default(),
    };
    Indexer::new(Arc::new(IndexStorage::new(root)), documents, options)
}

/// Stored values of `field` for every document, sorted
#[allow(dead_code)] // Used in integration tests
pub fn stored_values(index: &TantivyIndex, field: &str) -> Vec<String> {
    let field = index.schema().get_field(field).expect("Field exists");
    let searcher = index.reader().expect("Failed to open reader").searcher();
    let hits = searcher
        .search(&AllQuery, &TopDocs::with_limit(10_000))
        .expect("Search failed");

    let mut values: Vec<String> = hits
        .into_iter()
        .map(|(_, address)| {
            let doc: TantivyDocument = searcher.doc(address).expect("Failed to load doc");
            doc.get_first(field)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        })
        .collect();
    values.sort();
    values
}

/// Stored identifiers of every document, sorted
#[allow(dead_code)] // Used in integration tests
pub fn stored_identifiers(index: &TantivyIndex) -> Vec<String> {
    stored_values(index, IDENTIFIER_FIELD)
}

/// One record held by a [`MemorySource`]
#[derive(Debug, Clone)]
pub struct MemoryRecord {
    pub identifier: String,
    pub xml: String,
    pub hidden: bool,
    pub draft: bool,
}

impl MemoryRecord {
    #[allow(dead_code)] // Used in integration tests
    pub fn new(identifier: &str, xml: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            xml: xml.to_string(),
            hidden: false,
            draft: false,
        }
    }
}

/// Holds a fetch open until the test releases it
#[derive(Debug, Default)]
pub struct FetchGate {
    entered: Notify,
    release: Notify,
}

impl FetchGate {
    /// Resolves once a fetch is waiting at the gate
    #[allow(dead_code)] // Used in integration tests
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Let the waiting fetch continue
    #[allow(dead_code)] // Used in integration tests
    pub fn release(&self) {
        self.release.notify_one();
    }
}

/// In-memory record source with failure and cancellation hooks
#[derive(Default)]
pub struct MemorySource {
    records: Vec<MemoryRecord>,
    failing: HashSet<String>,
    storage_failing: HashSet<String>,
    cancel_after: Option<(usize, CancellationToken)>,
    stop_after: Option<(usize, Arc<Indexer>, String)>,
    hold_at: Option<(usize, Arc<FetchGate>)>,
    fetched: AtomicUsize,
}

impl MemorySource {
    #[allow(dead_code)] // Used in integration tests
    pub fn new(records: Vec<MemoryRecord>) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }

    /// `count` generic records `r-0`, `r-1`, ...
    #[allow(dead_code)] // Used in integration tests
    pub fn generic(count: usize) -> Self {
        Self::new(
            (0..count)
                .map(|i| {
                    MemoryRecord::new(
                        &format!("r-{i}"),
                        &format!("<item><title>Record {i}</title></item>"),
                    )
                })
                .collect(),
        )
    }

    /// Make fetching `identifier` fail
    #[allow(dead_code)] // Used in integration tests
    pub fn failing(mut self, identifier: &str) -> Self {
        self.failing.insert(identifier.to_string());
        self
    }

    /// Make fetching `identifier` fail as if the catalog were gone
    #[allow(dead_code)] // Used in integration tests
    pub fn storage_failing(mut self, identifier: &str) -> Self {
        self.storage_failing.insert(identifier.to_string());
        self
    }

    /// Call `request_stop` on `indexer` once `count` records have been fetched
    #[allow(dead_code)] // Used in integration tests
    pub fn stop_after(mut self, count: usize, indexer: Arc<Indexer>, instance_id: &str) -> Self {
        self.stop_after = Some((count, indexer, instance_id.to_string()));
        self
    }

    /// Wait at `gate` while fetching the `count`-th record
    #[allow(dead_code)] // Used in integration tests
    pub fn hold_at(mut self, count: usize, gate: Arc<FetchGate>) -> Self {
        self.hold_at = Some((count, gate));
        self
    }

    /// Cancel `token` once `count` records have been fetched
    #[allow(dead_code)] // Used in integration tests
    pub fn cancel_after(mut self, count: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((count, token));
        self
    }

    #[allow(dead_code)] // Used in integration tests
    pub fn fetched(&self) -> usize {
        self.fetched.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordSource for MemorySource {
    async fn list_identifiers(&self, filter: &RecordFilter) -> Result<Vec<String>> {
        Ok(self
            .records
            .iter()
            .filter(|r| filter.include_hidden || !r.hidden)
            .filter(|r| filter.include_drafts || !r.draft)
            .map(|r| r.identifier.clone())
            .collect())
    }

    async fn fetch(&self, identifier: &str) -> Result<XmlRecord> {
        let fetched = self.fetched.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((count, token)) = &self.cancel_after {
            if fetched >= *count {
                token.cancel();
            }
        }
        if let Some((count, indexer, instance_id)) = &self.stop_after {
            if fetched == *count {
                indexer.request_stop(instance_id);
            }
        }
        if let Some((count, gate)) = &self.hold_at {
            if fetched == *count {
                gate.entered.notify_one();
                gate.release.notified().await;
            }
        }

        if self.storage_failing.contains(identifier) {
            return Err(MetacatError::Catalog(sqlx::Error::PoolClosed));
        }

        if self.failing.contains(identifier) {
            return Err(MetacatError::RecordFetch {
                identifier: identifier.to_string(),
                message: "simulated failure".to_string(),
            });
        }

        let record = self
            .records
            .iter()
            .find(|r| r.identifier == identifier)
            .ok_or_else(|| MetacatError::RecordNotFound(identifier.to_string()))?;
        XmlRecord::parse(identifier, &record.xml)
    }
}
