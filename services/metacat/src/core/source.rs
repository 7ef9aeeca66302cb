//! Record sources feeding the indexer.

use crate::core::catalog::RecordCatalog;
use crate::core::error::{MetacatError, Result};
use crate::core::record::XmlRecord;
use async_trait::async_trait;
use std::sync::Arc;

/// Which records a full build enumerates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordFilter {
    /// Include records not exposed to public listings
    pub include_hidden: bool,

    /// Include records that are not yet published
    pub include_drafts: bool,
}

/// Supplies identifiers and records by identifier
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Identifiers passing `filter`, in enumeration order
    async fn list_identifiers(&self, filter: &RecordFilter) -> Result<Vec<String>>;

    /// Load one record; `RecordNotFound` when unknown
    async fn fetch(&self, identifier: &str) -> Result<XmlRecord>;
}

/// Records stored as files, located through a catalog.
///
/// Files carry no visibility or publication flags, so every
/// cataloged record passes any filter.
#[derive(Debug, Clone)]
pub struct CatalogRecordSource {
    catalog: Arc<RecordCatalog>,
}

impl CatalogRecordSource {
    pub fn new(catalog: Arc<RecordCatalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl RecordSource for CatalogRecordSource {
    async fn list_identifiers(&self, _filter: &RecordFilter) -> Result<Vec<String>> {
        self.catalog
            .identifier_iterator()
            .await?
            .collect_remaining()
            .await
    }

    async fn fetch(&self, identifier: &str) -> Result<XmlRecord> {
        let location = self
            .catalog
            .location_of(identifier)
            .await?
            .ok_or_else(|| MetacatError::RecordNotFound(identifier.to_string()))?;

        let xml = tokio::fs::read_to_string(&location)
            .await
            .map_err(|e| MetacatError::RecordFetch {
                identifier: identifier.to_string(),
                message: format!("{location}: {e}"),
            })?;

        XmlRecord::parse(identifier, &xml)
    }
}
