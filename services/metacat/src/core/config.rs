//! Configuration management for the metacat indexing engine.
//!
//! This module handles loading configuration from TOML files and
//! environment variables, with sensible defaults for all settings.

use crate::core::error::{MetacatError, Result};
use crate::core::fields::FieldRegistry;
use crate::core::normalize::{Codelists, ValueNormalizer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Smallest writer heap tantivy accepts (15 MB)
pub const MIN_WRITER_HEAP_BYTES: usize = 15_000_000;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub indexing: IndexingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Extra or replacement codelists, list name to labels in
    /// domain-code order
    #[serde(default)]
    pub codelists: BTreeMap<String, Vec<String>>,

    /// Field sets replacing the built-in set of a family
    #[serde(default)]
    pub fields: BTreeMap<String, Vec<FieldConfig>>,
}

/// Indexing configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexingConfig {
    /// Permits of the process-wide field pool
    #[serde(default = "default_field_workers")]
    pub field_workers: usize,

    /// Compute a record's fields concurrently (false: one at a time)
    #[serde(default = "default_concurrent_fields")]
    pub concurrent_fields: bool,

    /// Index writer heap in bytes
    #[serde(default = "default_writer_heap")]
    pub writer_heap_bytes: usize,

    /// Include records hidden from public listings
    #[serde(default)]
    pub include_hidden: bool,

    /// Include unpublished records
    #[serde(default)]
    pub include_drafts: bool,

    /// Glob patterns for record files on import
    #[serde(default = "default_record_patterns")]
    pub record_patterns: Vec<String>,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Root directory for per-instance indexes
    #[serde(default = "default_index_dir")]
    pub index_dir: PathBuf,

    /// Root directory for per-instance record catalogs
    #[serde(default = "default_catalog_dir")]
    pub catalog_dir: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

/// Output format of the log layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

/// One configured queryable field
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FieldConfig {
    pub name: String,
    pub paths: Vec<String>,
}

// Default value functions
fn default_field_workers() -> usize {
    5
}

fn default_concurrent_fields() -> bool {
    true
}

fn default_writer_heap() -> usize {
    50_000_000
}

fn default_record_patterns() -> Vec<String> {
    vec!["**/*.xml".to_string()]
}

fn default_index_dir() -> PathBuf {
    PathBuf::from("./data/indexes")
}

fn default_catalog_dir() -> PathBuf {
    PathBuf::from("./data/catalogs")
}

fn default_log_level() -> String {
    "metacat=info".to_string()
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            field_workers: default_field_workers(),
            concurrent_fields: default_concurrent_fields(),
            writer_heap_bytes: default_writer_heap(),
            include_hidden: false,
            include_drafts: false,
            record_patterns: default_record_patterns(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            index_dir: default_index_dir(),
            catalog_dir: default_catalog_dir(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| MetacatError::ConfigError(format!("Failed to read config file: {e}")))?;

        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load config with priority: env vars > TOML > defaults
    ///
    /// Priority order for the file:
    /// 1. METACAT_CONFIG env var
    /// 2. ./metacat.toml
    /// 3. Defaults
    pub fn load() -> Result<Self> {
        let mut config = if let Ok(config_path) = env::var("METACAT_CONFIG") {
            Self::from_file(config_path)?
        } else if Path::new("metacat.toml").exists() {
            Self::from_file("metacat.toml")?
        } else {
            Self::default()
        };

        // Override with environment variables
        config.merge_env();

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Merge configuration with environment variables
    pub fn merge_env(&mut self) {
        if let Ok(data_dir) = env::var("METACAT_DATA_DIR") {
            let data_dir = PathBuf::from(data_dir);
            self.storage.index_dir = data_dir.join("indexes");
            self.storage.catalog_dir = data_dir.join("catalogs");
        }

        if let Ok(workers) = env::var("METACAT_FIELD_WORKERS") {
            if let Ok(n) = workers.parse() {
                self.indexing.field_workers = n;
            }
        }
        if let Ok(concurrent) = env::var("METACAT_CONCURRENT_FIELDS") {
            if let Ok(flag) = concurrent.parse() {
                self.indexing.concurrent_fields = flag;
            }
        }

        if let Ok(level) = env::var("METACAT_LOG") {
            self.logging.level = level;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.indexing.field_workers == 0 {
            return Err(MetacatError::ConfigError(
                "Field workers must be non-zero".to_string(),
            ));
        }

        if self.indexing.writer_heap_bytes < MIN_WRITER_HEAP_BYTES {
            return Err(MetacatError::ConfigError(format!(
                "Writer heap must be at least {MIN_WRITER_HEAP_BYTES} bytes"
            )));
        }

        if self.indexing.record_patterns.is_empty() {
            return Err(MetacatError::ConfigError(
                "At least one record pattern is required".to_string(),
            ));
        }
        for pattern in &self.indexing.record_patterns {
            glob::Pattern::new(pattern).map_err(|e| {
                MetacatError::ConfigError(format!("Invalid record pattern '{pattern}': {e}"))
            })?;
        }

        for (name, labels) in &self.codelists {
            if labels.is_empty() {
                return Err(MetacatError::ConfigError(format!(
                    "Codelist '{name}' has no elements"
                )));
            }
        }

        // Parses every configured path
        self.field_registry()?;

        Ok(())
    }

    /// Field registry with configured families applied
    pub fn field_registry(&self) -> Result<FieldRegistry> {
        FieldRegistry::from_config(&self.fields)
    }

    /// Normalizer over the built-in plus configured codelists
    pub fn normalizer(&self) -> ValueNormalizer {
        let mut codelists = Codelists::builtin();
        for (name, labels) in &self.codelists {
            codelists.insert(name.clone(), labels.clone());
        }
        ValueNormalizer::new(codelists)
    }

    /// Log configuration
    pub fn log_config(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!("  Field workers: {}", self.indexing.field_workers);
        tracing::info!("  Concurrent fields: {}", self.indexing.concurrent_fields);
        tracing::info!("  Writer heap: {} bytes", self.indexing.writer_heap_bytes);
        tracing::info!(
            "  Include hidden/drafts: {}/{}",
            self.indexing.include_hidden,
            self.indexing.include_drafts
        );
        tracing::info!(
            "  Record patterns: {} patterns",
            self.indexing.record_patterns.len()
        );
        tracing::info!("  Index dir: {:?}", self.storage.index_dir);
        tracing::info!("  Catalog dir: {:?}", self.storage.catalog_dir);
        tracing::info!("  Extra codelists: {}", self.codelists.len());
        tracing::info!("  Overridden field sets: {}", self.fields.len());
    }
}
