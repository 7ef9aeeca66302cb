//! Unified service container for metacat
//!
//! Provides shared access to all core services.

use crate::core::catalog::{import_directory, CatalogRegistry};
use crate::core::config::Config;
use crate::core::error::Result;
use crate::core::fields::FieldRegistry;
use crate::core::indexer::{DocumentBuilder, FieldMode, FieldPool, Indexer, IndexerOptions};
use crate::core::source::CatalogRecordSource;
use crate::core::storage::IndexStorage;
use crate::core::types::{BuildReport, ImportStats};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Unified services container
#[derive(Clone)]
pub struct Services {
    /// Per-instance index layout
    pub storage: Arc<IndexStorage>,

    /// One record catalog handle per instance
    pub catalogs: Arc<CatalogRegistry>,

    /// Queryable fields per schema family
    pub fields: Arc<FieldRegistry>,

    /// Build orchestration
    pub indexer: Arc<Indexer>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl Services {
    /// Create services from configuration
    ///
    /// Sizes the process-wide field pool on first call. Fails when a
    /// configured field path does not parse.
    pub fn new(config: Config) -> Result<Self> {
        FieldPool::init_global(config.indexing.field_workers);

        let storage = Arc::new(IndexStorage::new(config.storage.index_dir.clone()));
        let catalogs = Arc::new(CatalogRegistry::new(config.storage.catalog_dir.clone()));
        let fields = Arc::new(config.field_registry()?);

        let mode = if config.indexing.concurrent_fields {
            FieldMode::Concurrent
        } else {
            FieldMode::Sequential
        };
        let documents = DocumentBuilder::new(
            Arc::clone(&fields),
            Arc::new(config.normalizer()),
            FieldPool::global(),
            mode,
        );
        let indexer = Arc::new(Indexer::new(
            Arc::clone(&storage),
            documents,
            IndexerOptions::from_config(&config.indexing),
        ));

        Ok(Self {
            storage,
            catalogs,
            fields,
            indexer,
            config: Arc::new(config),
        })
    }

    /// Catalog every record file under `dir` for `instance_id`
    pub async fn import(&self, instance_id: &str, dir: &Path) -> Result<ImportStats> {
        let catalog = self.catalogs.open(instance_id).await?;
        import_directory(&catalog, dir, &self.config.indexing.record_patterns).await
    }

    /// Rebuild `instance_id` from the records its catalog locates
    pub async fn build_instance(
        &self,
        instance_id: &str,
        token: CancellationToken,
    ) -> Result<BuildReport> {
        let catalog = self.catalogs.open(instance_id).await?;
        let source = CatalogRecordSource::new(catalog);
        self.indexer.build_full(instance_id, &source, token).await
    }

    /// Stop running builds and close every catalog
    pub async fn shutdown(&self) {
        self.indexer.shutdown();
        self.catalogs.shutdown_all().await;
    }
}
