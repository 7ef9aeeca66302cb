//! Error types and error handling for the metacat indexing engine.
//!
//! Errors fall into four families that drive different recovery
//! paths in the indexer:
//!
//! - configuration errors (malformed paths, unsupported values) are
//!   fatal and never retried
//! - record-level errors skip one identifier
//! - field-level errors degrade one field to the `"null"` sentinel
//! - storage errors fail the current build and reach the caller

use thiserror::Error;

/// Result type alias for metacat operations
pub type Result<T> = std::result::Result<T, MetacatError>;

/// Main error type for the metacat engine
#[derive(Error, Debug)]
pub enum MetacatError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid path expression '{expression}': {message}")]
    InvalidPath { expression: String, message: String },

    #[error("Unsupported value type: {0}")]
    UnsupportedValue(String),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Failed to fetch record {identifier}: {message}")]
    RecordFetch { identifier: String, message: String },

    #[error("Malformed record: {0}")]
    XmlError(String),

    #[error("Field '{field}' failed: {message}")]
    FieldComputation { field: String, message: String },

    #[error("A build is already running for instance: {0}")]
    BuildInProgress(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Catalog error: {0}")]
    Catalog(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl MetacatError {
    /// Build an [`MetacatError::InvalidPath`] for `expression`
    pub fn invalid_path(expression: &str, message: impl Into<String>) -> Self {
        MetacatError::InvalidPath {
            expression: expression.to_string(),
            message: message.into(),
        }
    }

    /// Get user-friendly error message
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Check if this is a configuration error (fail fast, never retried)
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            MetacatError::ConfigError(_)
                | MetacatError::InvalidPath { .. }
                | MetacatError::UnsupportedValue(_)
                | MetacatError::TomlError(_)
        )
    }

    /// Check if this error only concerns a single record
    pub fn is_record_level(&self) -> bool {
        matches!(
            self,
            MetacatError::RecordNotFound(_)
                | MetacatError::RecordFetch { .. }
                | MetacatError::XmlError(_)
        )
    }

    /// Check if this is a storage failure (fatal for the current build)
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            MetacatError::StorageError(_)
                | MetacatError::Catalog(_)
                | MetacatError::IoError(_)
                | MetacatError::SerdeError(_)
        )
    }
}
