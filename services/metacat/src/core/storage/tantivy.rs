//! Tantivy integration for metadata documents.
//!
//! This module wraps Tantivy operations for creating and
//! writing per-instance metadata indexes.

use crate::core::error::{MetacatError, Result};
use crate::core::types::{
    sort_field_name, IndexDocument, ANY_FIELD, FAMILY_FIELD, IDENTIFIER_FIELD,
};
use std::path::Path;
use tantivy::schema::*;
use tantivy::{Index, IndexReader, IndexWriter, TantivyDocument};

/// Current schema version
/// Version 1: identifier, family, fields with sort twins, aggregate text
pub const SCHEMA_VERSION: u32 = 1;

/// Documents are added in record order by a single indexing thread
const WRITER_THREADS: usize = 1;

/// Sink for assembled documents
pub trait IndexStore: Send {
    /// Add one document (visible after the next optimize)
    fn add_document(&mut self, document: &IndexDocument) -> Result<()>;

    /// Commit pending documents and merge segments
    fn optimize(&mut self) -> Result<()>;

    /// Remove every document
    fn delete_all(&mut self) -> Result<()>;
}

/// Create the Tantivy schema for metadata documents
///
/// Fields:
/// - id: Record identifier (STRING | STORED)
/// - family: Schema family name (STRING | STORED)
/// - one per queryable field (TEXT | STORED)
/// - `<field>_sort`: not-analyzed twin (STRING | STORED)
/// - any: Aggregated free text (TEXT)
pub fn create_schema(field_names: &[String]) -> Schema {
    let mut builder = Schema::builder();

    builder.add_text_field(IDENTIFIER_FIELD, STRING | STORED);
    builder.add_text_field(FAMILY_FIELD, STRING | STORED);

    for name in field_names {
        builder.add_text_field(name, TEXT | STORED);
        builder.add_text_field(&sort_field_name(name), STRING | STORED);
    }

    builder.add_text_field(ANY_FIELD, TEXT);

    builder.build()
}

/// Tantivy index wrapper
pub struct TantivyIndex {
    /// Tantivy index instance
    index: Index,

    /// Schema definition
    schema: Schema,

    /// Index writer (for adding documents)
    writer: IndexWriter,
}

impl std::fmt::Debug for TantivyIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TantivyIndex")
            .field("schema", &"<schema>")
            .finish()
    }
}

impl TantivyIndex {
    /// Create a new Tantivy index at the given path
    ///
    /// # Arguments
    ///
    /// * `index_dir` - Directory to create (must not hold an index)
    /// * `field_names` - Queryable field names of every family
    /// * `heap_bytes` - Writer memory budget
    pub fn create(index_dir: &Path, field_names: &[String], heap_bytes: usize) -> Result<Self> {
        let schema = create_schema(field_names);

        std::fs::create_dir_all(index_dir)?;

        let index = Index::create_in_dir(index_dir, schema.clone())
            .map_err(|e| MetacatError::StorageError(format!("Failed to create index: {e}")))?;

        let writer = index
            .writer_with_num_threads(WRITER_THREADS, heap_bytes)
            .map_err(|e| MetacatError::StorageError(format!("Failed to create writer: {e}")))?;

        Ok(Self {
            index,
            schema,
            writer,
        })
    }

    /// Open an existing Tantivy index
    pub fn open(index_dir: &Path, heap_bytes: usize) -> Result<Self> {
        let index = Index::open_in_dir(index_dir)
            .map_err(|e| MetacatError::StorageError(format!("Failed to open index: {e}")))?;

        let schema = index.schema();

        let writer = index
            .writer_with_num_threads(WRITER_THREADS, heap_bytes)
            .map_err(|e| MetacatError::StorageError(format!("Failed to create writer: {e}")))?;

        Ok(Self {
            index,
            schema,
            writer,
        })
    }

    fn field(&self, name: &str) -> Result<Field> {
        self.schema
            .get_field(name)
            .map_err(|e| MetacatError::StorageError(format!("Missing {name} field: {e}")))
    }

    /// Commit changes to disk
    pub fn commit(&mut self) -> Result<()> {
        self.writer
            .commit()
            .map_err(|e| MetacatError::StorageError(format!("Failed to commit: {e}")))?;
        Ok(())
    }

    /// Get an index reader
    pub fn reader(&self) -> Result<IndexReader> {
        self.index
            .reader()
            .map_err(|e| MetacatError::StorageError(format!("Failed to create reader: {e}")))
    }

    /// Number of committed documents
    pub fn num_docs(&self) -> Result<u64> {
        let reader = self.reader()?;
        reader
            .reload()
            .map_err(|e| MetacatError::StorageError(format!("Failed to reload reader: {e}")))?;
        Ok(reader.searcher().num_docs())
    }

    /// Number of searchable segments
    pub fn segment_count(&self) -> Result<usize> {
        self.index
            .searchable_segment_ids()
            .map(|ids| ids.len())
            .map_err(|e| MetacatError::StorageError(format!("Failed to list segments: {e}")))
    }

    /// Get the schema
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Get a reference to the underlying Tantivy index
    pub fn index(&self) -> &Index {
        &self.index
    }
}

impl IndexStore for TantivyIndex {
    fn add_document(&mut self, document: &IndexDocument) -> Result<()> {
        let mut doc = TantivyDocument::default();

        doc.add_text(self.field(IDENTIFIER_FIELD)?, &document.identifier);
        doc.add_text(self.field(FAMILY_FIELD)?, document.family.name());

        for field in &document.fields {
            doc.add_text(self.field(&field.name)?, &field.value);
        }
        for (sort_name, value) in document.sort_twins() {
            doc.add_text(self.field(&sort_name)?, value);
        }

        if !document.any_text.is_empty() {
            doc.add_text(self.field(ANY_FIELD)?, &document.any_text);
        }

        self.writer
            .add_document(doc)
            .map_err(|e| MetacatError::StorageError(format!("Failed to add document: {e}")))?;

        Ok(())
    }

    fn optimize(&mut self) -> Result<()> {
        self.commit()?;

        let segments = self
            .index
            .searchable_segment_ids()
            .map_err(|e| MetacatError::StorageError(format!("Failed to list segments: {e}")))?;

        if segments.len() > 1 {
            tracing::debug!("Merging {} segments", segments.len());
            self.writer
                .merge(&segments)
                .wait()
                .map_err(|e| MetacatError::StorageError(format!("Failed to merge: {e}")))?;
        }

        Ok(())
    }

    fn delete_all(&mut self) -> Result<()> {
        self.writer
            .delete_all_documents()
            .map_err(|e| MetacatError::StorageError(format!("Failed to delete documents: {e}")))?;
        self.commit()
    }
}
