//! Turning one record into one index document.

use crate::core::fields::{FieldRegistry, QueryableField};
use crate::core::indexer::pool::FieldPool;
use crate::core::normalize::ValueNormalizer;
use crate::core::record::{adapt, StructuredRecord, XmlRecord};
use crate::core::types::{IndexDocument, SENTINEL};
use std::sync::Arc;

/// How a record's fields are computed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldMode {
    /// One field at a time, in configuration order
    Sequential,

    /// One pool task per field, collected in submission order
    Concurrent,
}

/// Compute one field, degrading any failure to the sentinel
pub fn compute_field(
    field: &QueryableField,
    record: &dyn StructuredRecord,
    normalizer: &ValueNormalizer,
) -> String {
    match field.compute(record, normalizer) {
        Ok(value) => value,
        Err(e) => {
            tracing::error!("Record {}: {}", record.identifier(), e);
            SENTINEL.to_string()
        }
    }
}

/// Builds documents for every schema family
#[derive(Debug, Clone)]
pub struct DocumentBuilder {
    registry: Arc<FieldRegistry>,
    normalizer: Arc<ValueNormalizer>,
    pool: FieldPool,
    mode: FieldMode,
}

impl DocumentBuilder {
    pub fn new(
        registry: Arc<FieldRegistry>,
        normalizer: Arc<ValueNormalizer>,
        pool: FieldPool,
        mode: FieldMode,
    ) -> Self {
        Self {
            registry,
            normalizer,
            pool,
            mode,
        }
    }

    pub fn mode(&self) -> FieldMode {
        self.mode
    }

    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    /// Classify `record` and assemble its document
    pub async fn build(&self, record: XmlRecord) -> IndexDocument {
        let record = adapt(Arc::new(record));
        let family = record.family();
        let fields = self.registry.fields_for(family);

        let values = match self.mode {
            FieldMode::Sequential => self.compute_sequential(&fields, record.as_ref()),
            FieldMode::Concurrent => self.compute_concurrent(&fields, &record).await,
        };

        let document = IndexDocument::assemble(record.identifier(), family, values);
        tracing::debug!(
            "Built document {} ({}, {} fields)",
            document.identifier,
            family,
            document.fields.len()
        );
        document
    }

    fn compute_sequential(
        &self,
        fields: &[QueryableField],
        record: &dyn StructuredRecord,
    ) -> Vec<(String, String)> {
        fields
            .iter()
            .map(|field| {
                (
                    field.name.clone(),
                    compute_field(field, record, &self.normalizer),
                )
            })
            .collect()
    }

    async fn compute_concurrent(
        &self,
        fields: &Arc<Vec<QueryableField>>,
        record: &Arc<dyn StructuredRecord>,
    ) -> Vec<(String, String)> {
        // Step 1: submit every field, waiting for permits as needed
        let mut pending = Vec::with_capacity(fields.len());
        for index in 0..fields.len() {
            let fields = Arc::clone(fields);
            let record = Arc::clone(record);
            let normalizer = Arc::clone(&self.normalizer);

            let handle = self
                .pool
                .spawn(move || fields[index].compute(record.as_ref(), &normalizer))
                .await;
            pending.push(handle);
        }

        // Step 2: collect in submission order
        let mut values = Vec::with_capacity(fields.len());
        for (field, handle) in fields.iter().zip(pending) {
            let value = match handle {
                Ok(handle) => match handle.await {
                    Ok(Ok(value)) => value,
                    Ok(Err(e)) => {
                        tracing::error!("Record {}: {}", record.identifier(), e);
                        SENTINEL.to_string()
                    }
                    Err(e) => {
                        tracing::error!(
                            "Record {}: field '{}' task failed: {}",
                            record.identifier(),
                            field.name,
                            e
                        );
                        SENTINEL.to_string()
                    }
                },
                Err(e) => {
                    tracing::error!("Record {}: {}", record.identifier(), e);
                    SENTINEL.to_string()
                }
            };
            values.push((field.name.clone(), value));
        }

        values
    }
}
