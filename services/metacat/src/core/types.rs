//! Core data types for the metacat engine.
//!
//! This module defines the data structures shared between the
//! record adapters, the normalizer, the indexer and the catalog.

use crate::core::error::{MetacatError, Result};
use crate::core::record::SchemaFamily;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Literal stored for a field that resolved to nothing
pub const SENTINEL: &str = "null";

/// Name of the mandatory identifier field
pub const IDENTIFIER_FIELD: &str = "id";

/// Name of the schema family field
pub const FAMILY_FIELD: &str = "family";

/// Name of the aggregated free-text field
pub const ANY_FIELD: &str = "any";

/// Suffix of the not-analyzed sort twin of each field
pub const SORT_SUFFIX: &str = "_sort";

/// Sort twin name for `field`
pub fn sort_field_name(field: &str) -> String {
    format!("{field}{SORT_SUFFIX}")
}

/// Check that `instance_id` is usable as a directory name
pub fn validate_instance_id(instance_id: &str) -> Result<()> {
    let valid = !instance_id.is_empty()
        && instance_id != "."
        && instance_id != ".."
        && !instance_id.contains(&['/', '\\', '\0'][..]);
    if valid {
        Ok(())
    } else {
        Err(MetacatError::ConfigError(format!(
            "Invalid instance id '{instance_id}'"
        )))
    }
}

/// A value read out of a record, before normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    /// Explicitly absent (nil or empty element)
    Null,

    /// Free text
    Text(String),

    /// Codelist entry: list name plus the stored code
    Code { list: String, code: String },

    /// Date or date-time literal
    Date(String),

    /// Integer literal
    Integer(String),

    /// Real (floating point) literal
    Real(String),

    /// Decimal literal
    Decimal(String),

    /// Several values for one path
    List(Vec<RawValue>),

    /// A complex element with no scalar reading
    Node(String),
}

/// One named value of an index document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentField {
    pub name: String,
    pub value: String,
}

/// A flat, index-ready document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDocument {
    /// Record identifier (mandatory)
    pub identifier: String,

    /// Schema family the record was classified into
    pub family: SchemaFamily,

    /// Field values in configuration order
    pub fields: Vec<DocumentField>,

    /// Deduplicated concatenation of every non-sentinel value
    pub any_text: String,
}

impl IndexDocument {
    /// Assemble a document from computed `(field, value)` pairs.
    ///
    /// Values are appended to the aggregate text unless they are the
    /// sentinel or already appear in it as a substring.
    pub fn assemble(
        identifier: impl Into<String>,
        family: SchemaFamily,
        values: Vec<(String, String)>,
    ) -> Self {
        let mut any_text = String::new();
        let mut fields = Vec::with_capacity(values.len());

        for (name, value) in values {
            let value = if value.is_empty() {
                SENTINEL.to_string()
            } else {
                value
            };
            if value != SENTINEL && !any_text.contains(value.as_str()) {
                if !any_text.is_empty() {
                    any_text.push(' ');
                }
                any_text.push_str(&value);
            }
            fields.push(DocumentField { name, value });
        }

        Self {
            identifier: identifier.into(),
            family,
            fields,
            any_text,
        }
    }

    /// Value of `name`, if the document carries that field
    pub fn value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }

    /// `(sort field, value)` pairs, one per field
    pub fn sort_twins(&self) -> impl Iterator<Item = (String, &str)> {
        self.fields
            .iter()
            .map(|f| (sort_field_name(&f.name), f.value.as_str()))
    }
}

/// An identifier/location mapping held by the record catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub identifier: String,
    pub location: String,
}

/// Lifecycle of a build for one instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildState {
    Idle,
    Building,
    Completed,
    Stopped,
    Failed,
}

impl BuildState {
    /// Whether the build has finished one way or another
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BuildState::Completed | BuildState::Stopped | BuildState::Failed
        )
    }
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildState::Idle => "idle",
            BuildState::Building => "building",
            BuildState::Completed => "completed",
            BuildState::Stopped => "stopped",
            BuildState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Outcome of a build that reached `Completed` or `Stopped`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildReport {
    /// Serving instance the index belongs to
    pub instance_id: String,

    /// Terminal state
    pub state: BuildState,

    /// Documents committed to the index
    pub records_indexed: usize,

    /// Identifiers skipped because the record could not be fetched
    pub records_skipped: usize,

    /// Build duration in milliseconds
    pub duration_ms: u64,
}

/// Statistics from importing a directory of records into a catalog
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStats {
    /// New identifiers added
    pub inserted: usize,

    /// Existing identifiers whose location was rewritten
    pub replaced: usize,

    /// Files that could not be read or parsed
    pub skipped: usize,
}
