//! Import record files from a directory tree into a catalog.
//!
//! Traverses directory trees and filters files using glob patterns.
//! Unreadable or malformed files are logged and skipped without
//! aborting the import.

use crate::core::catalog::store::RecordCatalog;
use crate::core::error::{MetacatError, Result};
use crate::core::record::{parse_document, SchemaFamily};
use crate::core::types::ImportStats;
use glob::Pattern;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Walker collecting record files by glob pattern
#[derive(Debug)]
pub struct RecordFileWalker {
    /// Patterns to include (e.g., "**/*.xml")
    include_patterns: Vec<Pattern>,
}

impl RecordFileWalker {
    /// Create a new walker
    ///
    /// # Arguments
    ///
    /// * `include_patterns` - Glob patterns, matched against the path
    ///   relative to the walk root and against the file name
    ///
    /// # Returns
    ///
    /// The walker, or a configuration error if a pattern is invalid
    pub fn new(include_patterns: &[String]) -> Result<Self> {
        let include = include_patterns
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|e| {
                    MetacatError::ConfigError(format!("Invalid record pattern '{p}': {e}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            include_patterns: include,
        })
    }

    /// Collect matching files, sorted by path
    pub fn collect_files(&self, root: &Path) -> Result<Vec<PathBuf>> {
        if !root.is_dir() {
            return Err(MetacatError::ConfigError(format!(
                "Record directory does not exist: {root:?}"
            )));
        }

        let mut files = Vec::new();

        for entry in WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_hidden_dir(e, root))
        {
            match entry {
                Ok(entry) => {
                    if entry.file_type().is_file() && self.matches(entry.path(), root) {
                        files.push(entry.path().to_path_buf());
                    }
                }
                Err(e) => {
                    tracing::warn!("Walk error: {}", e);
                }
            }
        }

        Ok(files)
    }

    fn matches(&self, path: &Path, root: &Path) -> bool {
        if self.include_patterns.is_empty() {
            return true;
        }

        let relative = path.strip_prefix(root).unwrap_or(path);
        let file_name = path.file_name().and_then(|f| f.to_str());

        self.include_patterns.iter().any(|p| {
            p.matches_path(relative) || file_name.map(|f| p.matches(f)).unwrap_or(false)
        })
    }
}

/// Skip hidden directories below the root
fn is_hidden_dir(entry: &DirEntry, root: &Path) -> bool {
    if entry.path() == root || !entry.file_type().is_dir() {
        return false;
    }
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Import every matching record file under `dir` into `catalog`.
///
/// Each file is parsed to find its identifier: the one embedded in
/// the record by its schema family, or the file stem when the record
/// carries none. New identifiers are inserted, known identifiers have
/// their location rewritten.
///
/// # Returns
///
/// ImportStats with inserted, replaced and skipped counts
pub async fn import_directory(
    catalog: &RecordCatalog,
    dir: &Path,
    patterns: &[String],
) -> Result<ImportStats> {
    let walker = RecordFileWalker::new(patterns)?;
    let files = walker.collect_files(dir)?;

    tracing::info!("Importing {} record files from {:?}", files.len(), dir);

    let mut stats = ImportStats::default();

    for path in files {
        let identifier = match read_identifier(&path).await {
            Ok(identifier) => identifier,
            Err(e) => {
                tracing::warn!("Skipping {:?}: {}", path, e);
                stats.skipped += 1;
                continue;
            }
        };

        let location = path.to_string_lossy();
        if catalog.exists(&identifier).await? {
            catalog.update(&identifier, &location).await?;
            stats.replaced += 1;
        } else {
            catalog.put(&identifier, &location).await?;
            stats.inserted += 1;
        }
    }

    tracing::info!(
        "Import finished: {} inserted, {} replaced, {} skipped",
        stats.inserted,
        stats.replaced,
        stats.skipped
    );

    Ok(stats)
}

async fn read_identifier(path: &Path) -> Result<String> {
    let xml = tokio::fs::read_to_string(path).await?;
    let root = parse_document(&xml)?;
    let family = SchemaFamily::classify(&root);

    family
        .extract_identifier(&root)
        .or_else(|| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .map(str::to_string)
        })
        .ok_or_else(|| MetacatError::XmlError(format!("no identifier for {path:?}")))
}
