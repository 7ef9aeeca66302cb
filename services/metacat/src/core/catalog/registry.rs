//! One shared catalog handle per serving instance.

use crate::core::catalog::store::RecordCatalog;
use crate::core::error::Result;
use crate::core::types::validate_instance_id;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// File name of an instance's catalog database
pub const CATALOG_FILE: &str = "catalog.db";

/// Owns the open catalog handles, keyed by instance id
#[derive(Debug)]
pub struct CatalogRegistry {
    /// Root directory for all instance catalogs
    root: PathBuf,

    handles: Mutex<HashMap<String, Arc<RecordCatalog>>>,
}

impl CatalogRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            handles: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Database file of `instance_id`
    pub fn catalog_path(&self, instance_id: &str) -> PathBuf {
        self.root.join(instance_id).join(CATALOG_FILE)
    }

    /// Shared handle for `instance_id`, opened on first use.
    ///
    /// The registry lock is held while a new handle is created, so
    /// concurrent callers always receive the same handle.
    pub async fn open(&self, instance_id: &str) -> Result<Arc<RecordCatalog>> {
        validate_instance_id(instance_id)?;

        let mut handles = self.handles.lock().await;
        if let Some(catalog) = handles.get(instance_id) {
            if !catalog.is_closed() {
                return Ok(Arc::clone(catalog));
            }
        }

        let catalog = Arc::new(RecordCatalog::open(&self.catalog_path(instance_id)).await?);
        handles.insert(instance_id.to_string(), Arc::clone(&catalog));
        tracing::info!("Opened catalog for instance '{}'", instance_id);

        Ok(catalog)
    }

    /// Close and forget the handle of `instance_id`.
    ///
    /// Returns whether a handle was open. The next [`open`] reopens
    /// the database.
    ///
    /// [`open`]: CatalogRegistry::open
    pub async fn shutdown(&self, instance_id: &str) -> bool {
        let removed = self.handles.lock().await.remove(instance_id);
        match removed {
            Some(catalog) => {
                catalog.close().await;
                tracing::info!("Closed catalog for instance '{}'", instance_id);
                true
            }
            None => false,
        }
    }

    /// Close every open handle
    pub async fn shutdown_all(&self) {
        let drained: Vec<(String, Arc<RecordCatalog>)> =
            self.handles.lock().await.drain().collect();
        for (instance_id, catalog) in drained {
            catalog.close().await;
            tracing::debug!("Closed catalog for instance '{}'", instance_id);
        }
    }

    /// Instances with an open handle, sorted
    pub async fn open_instances(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.handles.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}
