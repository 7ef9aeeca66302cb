//! Per-instance index storage.
//!
//! Each serving instance owns one directory holding its published
//! index, at most one in-progress staging index and the metadata
//! sidecar of the published index.

use crate::core::error::{MetacatError, Result};
use crate::core::storage::tantivy::{TantivyIndex, SCHEMA_VERSION};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Sidecar describing a published index (schema v1)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub instance_id: String,
    pub built_at: DateTime<Utc>,
    pub records_indexed: usize,
    pub records_skipped: usize,
    /// Documents per schema family name
    pub families: BTreeMap<String, usize>,
    pub index_size_bytes: u64,
    pub schema_version: u32,
}

impl IndexMetadata {
    /// Metadata for a build finishing now
    pub fn new(instance_id: &str, records_indexed: usize, records_skipped: usize) -> Self {
        Self {
            instance_id: instance_id.to_string(),
            built_at: Utc::now(),
            records_indexed,
            records_skipped,
            families: BTreeMap::new(),
            index_size_bytes: 0,
            schema_version: SCHEMA_VERSION,
        }
    }
}

/// Directory layout of every instance's index
#[derive(Debug, Clone)]
pub struct IndexStorage {
    /// Root directory for all instances
    root: PathBuf,
}

impl IndexStorage {
    /// Create a new storage manager
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get instance directory path
    pub fn instance_dir(&self, instance_id: &str) -> PathBuf {
        self.root.join(instance_id)
    }

    /// Published index directory
    pub fn index_dir(&self, instance_id: &str) -> PathBuf {
        self.instance_dir(instance_id).join("index")
    }

    /// In-progress build directory
    pub fn staging_dir(&self, instance_id: &str) -> PathBuf {
        self.instance_dir(instance_id).join("staging")
    }

    fn retired_dir(&self, instance_id: &str) -> PathBuf {
        self.instance_dir(instance_id).join("retired")
    }

    fn metadata_path(&self, instance_id: &str) -> PathBuf {
        self.instance_dir(instance_id).join("meta.json")
    }

    /// Whether a published index exists
    pub fn has_index(&self, instance_id: &str) -> bool {
        self.index_dir(instance_id).exists()
    }

    /// Whether a staging index is present
    pub fn has_staging(&self, instance_id: &str) -> bool {
        self.staging_dir(instance_id).exists()
    }

    /// Create a fresh staging index, discarding leftovers of a
    /// previous interrupted build
    pub fn create_staging(
        &self,
        instance_id: &str,
        field_names: &[String],
        heap_bytes: usize,
    ) -> Result<TantivyIndex> {
        self.discard_staging(instance_id)?;
        TantivyIndex::create(&self.staging_dir(instance_id), field_names, heap_bytes)
    }

    /// Delete the staging index if present
    pub fn discard_staging(&self, instance_id: &str) -> Result<()> {
        let staging = self.staging_dir(instance_id);
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
            tracing::debug!("Discarded staging index {:?}", staging);
        }
        Ok(())
    }

    /// Replace the published index with the staging index.
    ///
    /// The staging writer must be dropped first. The previous index
    /// is moved aside before the swap and removed afterwards.
    pub fn publish(&self, instance_id: &str, metadata: &IndexMetadata) -> Result<IndexMetadata> {
        let staging = self.staging_dir(instance_id);
        if !staging.exists() {
            return Err(MetacatError::StorageError(format!(
                "No staging index for instance '{instance_id}'"
            )));
        }

        let published = self.index_dir(instance_id);
        let retired = self.retired_dir(instance_id);

        // Step 1: retire the current index
        if retired.exists() {
            fs::remove_dir_all(&retired)?;
        }
        if published.exists() {
            fs::rename(&published, &retired)?;
        }

        // Step 2: promote staging
        if let Err(e) = fs::rename(&staging, &published) {
            if retired.exists() {
                fs::rename(&retired, &published)?;
            }
            return Err(MetacatError::StorageError(format!(
                "Failed to publish index for '{instance_id}': {e}"
            )));
        }

        // Step 3: record metadata, or put the old index back
        let mut metadata = metadata.clone();
        metadata.index_size_bytes = calculate_directory_size(&published);
        if let Err(e) = self.write_metadata(instance_id, &metadata) {
            self.restore_retired(instance_id)?;
            return Err(e);
        }

        // Step 4: drop the old index

        if retired.exists() {
            fs::remove_dir_all(&retired)?;
        }

        Ok(metadata)
    }

    /// Undo a swap whose metadata could not be written. The sidecar
    /// still describes the retired index, so that index returns.
    fn restore_retired(&self, instance_id: &str) -> Result<()> {
        let published = self.index_dir(instance_id);
        let retired = self.retired_dir(instance_id);

        tracing::warn!("Rolling back publication of '{}'", instance_id);
        if published.exists() {
            fs::remove_dir_all(&published)?;
        }
        if retired.exists() {
            fs::rename(&retired, &published)?;
        }
        Ok(())
    }

    /// Open the published index
    pub fn open_index(&self, instance_id: &str, heap_bytes: usize) -> Result<TantivyIndex> {
        let index_dir = self.index_dir(instance_id);
        if !index_dir.exists() {
            return Err(MetacatError::StorageError(format!(
                "No published index for instance '{instance_id}'"
            )));
        }
        TantivyIndex::open(&index_dir, heap_bytes)
    }

    /// Read the sidecar of the published index
    pub fn get_metadata(&self, instance_id: &str) -> Result<IndexMetadata> {
        let meta_path = self.metadata_path(instance_id);

        if !meta_path.exists() {
            return Err(MetacatError::StorageError(format!(
                "No index metadata for instance '{instance_id}'"
            )));
        }

        let contents = fs::read_to_string(&meta_path)?;
        let metadata: IndexMetadata = serde_json::from_str(&contents)?;

        Ok(metadata)
    }

    /// Write the sidecar (temp file then rename)
    pub fn write_metadata(&self, instance_id: &str, metadata: &IndexMetadata) -> Result<()> {
        let meta_path = self.metadata_path(instance_id);
        let tmp_path = meta_path.with_extension("json.tmp");

        let json = serde_json::to_string_pretty(metadata)?;
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &meta_path)?;

        Ok(())
    }

    /// Instances with a published index
    pub fn list_instances(&self) -> Result<Vec<IndexMetadata>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut instances = Vec::new();

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(instance_id) = entry.file_name().to_str() {
                    if let Ok(metadata) = self.get_metadata(instance_id) {
                        instances.push(metadata);
                    }
                }
            }
        }

        instances.sort_by(|a, b| a.instance_id.cmp(&b.instance_id));
        Ok(instances)
    }

    /// Delete everything stored for an instance
    pub fn delete_instance(&self, instance_id: &str) -> Result<()> {
        let dir = self.instance_dir(instance_id);
        if dir.exists() {
            fs::remove_dir_all(dir)?;
        }
        Ok(())
    }
}

/// Calculate directory size recursively
fn calculate_directory_size(path: &Path) -> u64 {
    let mut total = 0;

    if path.is_dir() {
        if let Ok(entries) = fs::read_dir(path) {
            for entry in entries.filter_map(|e| e.ok()) {
                if let Ok(metadata) = entry.metadata() {
                    if metadata.is_dir() {
                        total += calculate_directory_size(&entry.path());
                    } else {
                        total += metadata.len();
                    }
                }
            }
        }
    } else if path.is_file() {
        if let Ok(metadata) = fs::metadata(path) {
            total = metadata.len();
        }
    }

    total
}
