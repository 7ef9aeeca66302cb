//! Index build orchestration.
//!
//! Coordinates a full rebuild of one instance's index:
//! 1. Enumerate records (record source or in-memory list)
//! 2. Fetch and classify each record
//! 3. Compute fields and assemble documents
//! 4. Write documents into a staging index
//! 5. Optimize and publish the staging index
//!
//! Cancellation is polled once per record. A stopped or failed build
//! deletes its staging index and leaves the published one untouched.

use crate::core::config::IndexingConfig;
use crate::core::error::{MetacatError, Result};
use crate::core::indexer::document::DocumentBuilder;
use crate::core::record::XmlRecord;
use crate::core::source::{RecordFilter, RecordSource};
use crate::core::storage::{IndexMetadata, IndexStorage, IndexStore, TantivyIndex};
use crate::core::types::{validate_instance_id, BuildReport, BuildState};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Records between progress log lines
const PROGRESS_INTERVAL: usize = 100;

/// Build settings taken from `[indexing]`
#[derive(Debug, Clone, Copy)]
pub struct IndexerOptions {
    pub writer_heap_bytes: usize,
    pub filter: RecordFilter,
}

impl IndexerOptions {
    pub fn from_config(config: &IndexingConfig) -> Self {
        Self {
            writer_heap_bytes: config.writer_heap_bytes,
            filter: RecordFilter {
                include_hidden: config.include_hidden,
                include_drafts: config.include_drafts,
            },
        }
    }
}

impl Default for IndexerOptions {
    fn default() -> Self {
        Self::from_config(&IndexingConfig::default())
    }
}

/// Per-instance build bookkeeping
#[derive(Debug, Default)]
struct Registry {
    states: HashMap<String, BuildState>,
    running: HashMap<String, CancellationToken>,
}

/// Clears the running marker when a build ends, however it ends.
///
/// A build whose future is dropped before reaching a terminal state
/// is marked `Stopped` and its staging index is deleted.
struct RunningBuild<'a> {
    indexer: &'a Indexer,
    instance_id: String,
    token: CancellationToken,
}

impl RunningBuild<'_> {
    fn finish(&self, state: BuildState) {
        self.indexer.set_state(&self.instance_id, state);
    }
}

impl Drop for RunningBuild<'_> {
    fn drop(&mut self) {
        let abandoned = {
            let mut registry = self.indexer.lock();
            registry.running.remove(&self.instance_id);
            let abandoned =
                registry.states.get(&self.instance_id) == Some(&BuildState::Building);
            if abandoned {
                registry
                    .states
                    .insert(self.instance_id.clone(), BuildState::Stopped);
            }
            abandoned
        };

        if abandoned {
            tracing::info!("Build for '{}' abandoned", self.instance_id);
            if let Err(e) = self.indexer.storage.discard_staging(&self.instance_id) {
                tracing::error!("Failed to discard staging index: {}", e);
            }
        }
    }
}

/// Where a build takes its records from
enum Batch<'a> {
    Source {
        source: &'a dyn RecordSource,
        identifiers: std::vec::IntoIter<String>,
    },
    Records(std::vec::IntoIter<XmlRecord>),
}

impl Batch<'_> {
    fn len(&self) -> usize {
        match self {
            Batch::Source { identifiers, .. } => identifiers.len(),
            Batch::Records(records) => records.len(),
        }
    }

    /// Next record, or the identifier that could not be fetched
    async fn next(&mut self) -> Option<std::result::Result<XmlRecord, (String, MetacatError)>> {
        match self {
            Batch::Source {
                source,
                identifiers,
            } => {
                let identifier = identifiers.next()?;
                Some(
                    source
                        .fetch(&identifier)
                        .await
                        .map_err(|e| (identifier, e)),
                )
            }
            Batch::Records(records) => records.next().map(Ok),
        }
    }
}

/// Orchestrates index builds for every instance
pub struct Indexer {
    storage: Arc<IndexStorage>,
    documents: DocumentBuilder,
    options: IndexerOptions,
    shutdown: CancellationToken,
    registry: Mutex<Registry>,
}

impl std::fmt::Debug for Indexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Indexer")
            .field("storage", &self.storage)
            .field("mode", &self.documents.mode())
            .finish()
    }
}

impl Indexer {
    /// Create a new indexer
    ///
    /// # Arguments
    ///
    /// * `storage` - Per-instance index layout
    /// * `documents` - Document builder (field sets, normalizer, pool)
    /// * `options` - Writer heap and record filter
    pub fn new(storage: Arc<IndexStorage>, documents: DocumentBuilder, options: IndexerOptions) -> Self {
        Self {
            storage,
            documents,
            options,
            shutdown: CancellationToken::new(),
            registry: Mutex::new(Registry::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Registry> {
        // Registry updates never panic midway, so a poisoned lock
        // still holds consistent maps
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_state(&self, instance_id: &str, state: BuildState) {
        self.lock().states.insert(instance_id.to_string(), state);
    }

    /// Current state of `instance_id` (`Idle` if never built)
    pub fn state(&self, instance_id: &str) -> BuildState {
        self.lock()
            .states
            .get(instance_id)
            .copied()
            .unwrap_or(BuildState::Idle)
    }

    /// Whether a build is running for `instance_id`
    pub fn is_building(&self, instance_id: &str) -> bool {
        self.lock().running.contains_key(instance_id)
    }

    /// Ask the running build of `instance_id` to stop.
    ///
    /// Returns `false` when no build is running. The build stops
    /// before its next record.
    pub fn request_stop(&self, instance_id: &str) -> bool {
        match self.lock().running.get(instance_id) {
            Some(token) => {
                tracing::info!("Stop requested for instance '{}'", instance_id);
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Stop every running build; builds started afterwards stop
    /// before their first record
    pub fn shutdown(&self) {
        tracing::info!("Indexer shutting down");
        self.shutdown.cancel();
    }

    /// Rebuild `instance_id` from every record `source` lists
    ///
    /// # Returns
    ///
    /// A report with state `Completed` or `Stopped`. Storage failures
    /// are returned as errors after the state becomes `Failed`.
    pub async fn build_full(
        &self,
        instance_id: &str,
        source: &dyn RecordSource,
        token: CancellationToken,
    ) -> Result<BuildReport> {
        let running = self.register(instance_id, token)?;

        let identifiers = match source.list_identifiers(&self.options.filter).await {
            Ok(identifiers) => identifiers,
            Err(e) => {
                tracing::error!("Failed to list records for '{}': {}", instance_id, e);
                running.finish(BuildState::Failed);
                return Err(e);
            }
        };

        let batch = Batch::Source {
            source,
            identifiers: identifiers.into_iter(),
        };
        self.run(&running, batch).await
    }

    /// Rebuild `instance_id` from an in-memory record list
    pub async fn build_from(
        &self,
        instance_id: &str,
        records: Vec<XmlRecord>,
        token: CancellationToken,
    ) -> Result<BuildReport> {
        let running = self.register(instance_id, token)?;
        self.run(&running, Batch::Records(records.into_iter())).await
    }

    fn register(&self, instance_id: &str, token: CancellationToken) -> Result<RunningBuild<'_>> {
        validate_instance_id(instance_id)?;

        let mut registry = self.lock();
        if registry.running.contains_key(instance_id) {
            return Err(MetacatError::BuildInProgress(instance_id.to_string()));
        }

        let token = token.child_token();
        registry
            .running
            .insert(instance_id.to_string(), token.clone());
        registry
            .states
            .insert(instance_id.to_string(), BuildState::Building);

        Ok(RunningBuild {
            indexer: self,
            instance_id: instance_id.to_string(),
            token,
        })
    }

    fn cancelled(&self, running: &RunningBuild<'_>) -> bool {
        self.shutdown.is_cancelled() || running.token.is_cancelled()
    }

    async fn run(&self, running: &RunningBuild<'_>, batch: Batch<'_>) -> Result<BuildReport> {
        let instance_id = running.instance_id.as_str();
        let start = Instant::now();

        tracing::info!(
            "Starting build for instance '{}' ({} records)",
            instance_id,
            batch.len()
        );

        // Step 1: fresh staging index
        let field_names = self.documents.registry().all_field_names();
        let index = match self.storage.create_staging(
            instance_id,
            &field_names,
            self.options.writer_heap_bytes,
        ) {
            Ok(index) => index,
            Err(e) => return Err(self.fail(running, e)),
        };

        // Step 2: index records
        let outcome = self.index_records(running, batch, index).await;

        let duration_ms = start.elapsed().as_millis() as u64;
        match outcome {
            Ok(Progress::Stopped { indexed, skipped }) => {
                if let Err(e) = self.storage.discard_staging(instance_id) {
                    return Err(self.fail(running, e));
                }
                running.finish(BuildState::Stopped);
                tracing::info!(
                    "Build for '{}' stopped after {} records in {}ms",
                    instance_id,
                    indexed + skipped,
                    duration_ms
                );
                Ok(BuildReport {
                    instance_id: instance_id.to_string(),
                    state: BuildState::Stopped,
                    records_indexed: indexed,
                    records_skipped: skipped,
                    duration_ms,
                })
            }
            Ok(Progress::Finished {
                indexed,
                skipped,
                families,
            }) => {
                // Step 3: publish
                let mut metadata = IndexMetadata::new(instance_id, indexed, skipped);
                metadata.families = families;
                if let Err(e) = self.storage.publish(instance_id, &metadata) {
                    return Err(self.fail(running, e));
                }

                running.finish(BuildState::Completed);
                tracing::info!(
                    "Build for '{}' complete: {} indexed, {} skipped in {}ms",
                    instance_id,
                    indexed,
                    skipped,
                    duration_ms
                );
                Ok(BuildReport {
                    instance_id: instance_id.to_string(),
                    state: BuildState::Completed,
                    records_indexed: indexed,
                    records_skipped: skipped,
                    duration_ms,
                })
            }
            Err(e) => Err(self.fail(running, e)),
        }
    }

    /// Write every record of `batch` into `index`.
    ///
    /// Consumes the index so its writer is released before the
    /// staging directory is published or deleted.
    async fn index_records(
        &self,
        running: &RunningBuild<'_>,
        mut batch: Batch<'_>,
        mut index: TantivyIndex,
    ) -> Result<Progress> {
        let total = batch.len();
        let mut indexed = 0;
        let mut skipped = 0;
        let mut families: BTreeMap<String, usize> = BTreeMap::new();

        loop {
            if self.cancelled(running) {
                return Ok(Progress::Stopped { indexed, skipped });
            }

            let record = match batch.next().await {
                None => break,
                Some(Ok(record)) => record,
                // Catalog and I/O failures end the build
                Some(Err((identifier, e))) if e.is_storage() => {
                    tracing::error!("Failed to fetch record {}: {}", identifier, e);
                    return Err(e);
                }
                Some(Err((identifier, e))) => {
                    tracing::warn!("Skipping record {}: {}", identifier, e);
                    skipped += 1;
                    continue;
                }
            };

            let document = self.documents.build(record).await;
            index.add_document(&document)?;
            *families.entry(document.family.name().to_string()).or_default() += 1;
            indexed += 1;

            let processed = indexed + skipped;
            if processed % PROGRESS_INTERVAL == 0 {
                tracing::info!("Progress: {}/{} records processed", processed, total);
            }
        }

        index.optimize()?;

        Ok(Progress::Finished {
            indexed,
            skipped,
            families,
        })
    }

    fn fail(&self, running: &RunningBuild<'_>, error: MetacatError) -> MetacatError {
        tracing::error!("Build for '{}' failed: {}", running.instance_id, error);
        if let Err(e) = self.storage.discard_staging(&running.instance_id) {
            tracing::error!("Failed to discard staging index: {}", e);
        }
        running.finish(BuildState::Failed);
        error
    }
}

enum Progress {
    Stopped {
        indexed: usize,
        skipped: usize,
    },
    Finished {
        indexed: usize,
        skipped: usize,
        families: BTreeMap<String, usize>,
    },
}
