//! SQLite-backed identifier to location store.

use crate::core::catalog::cursor::{CatalogCursor, CursorColumn};
use crate::core::error::Result;
use crate::core::types::CatalogEntry;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::{Path, PathBuf};

const CREATE_TABLE: &str = "CREATE TABLE records (\
     identifier TEXT NOT NULL UNIQUE, \
     location TEXT NOT NULL)";

/// Durable identifier to location mapping for one instance.
///
/// Identifiers are unique. Listing and iteration follow insertion
/// order; rewriting a location keeps an identifier's position.
#[derive(Debug)]
pub struct RecordCatalog {
    pool: SqlitePool,
    path: PathBuf,
}

impl RecordCatalog {
    /// Open (creating if needed) the catalog database at `path`.
    ///
    /// - Creates the database file and parent directories if missing.
    /// - Enables WAL journal mode.
    /// - Creates the `records` table unless it already exists.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        ensure_schema(&pool).await?;

        tracing::debug!("Opened record catalog {:?}", path);

        Ok(Self {
            pool,
            path: path.to_path_buf(),
        })
    }

    /// Database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert a new mapping.
    ///
    /// Fails with a catalog error if `identifier` is already present;
    /// check with [`RecordCatalog::exists`] first.
    pub async fn put(&self, identifier: &str, location: &str) -> Result<()> {
        sqlx::query("INSERT INTO records (identifier, location) VALUES (?, ?)")
            .bind(identifier)
            .bind(location)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Rewrite the location of `identifier`; no-op if absent
    pub async fn update(&self, identifier: &str, location: &str) -> Result<()> {
        sqlx::query("UPDATE records SET location = ? WHERE identifier = ?")
            .bind(location)
            .bind(identifier)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Delete `identifier`; no-op if absent
    pub async fn remove(&self, identifier: &str) -> Result<()> {
        sqlx::query("DELETE FROM records WHERE identifier = ?")
            .bind(identifier)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn exists(&self, identifier: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM records WHERE identifier = ?")
            .bind(identifier)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    pub async fn location_of(&self, identifier: &str) -> Result<Option<String>> {
        let location = sqlx::query_scalar::<_, String>(
            "SELECT location FROM records WHERE identifier = ?",
        )
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;
        Ok(location)
    }

    pub async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    /// All identifiers in insertion order
    pub async fn list_identifiers(&self) -> Result<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT identifier FROM records ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    /// All entries in insertion order
    pub async fn entries(&self) -> Result<Vec<CatalogEntry>> {
        let rows = sqlx::query("SELECT identifier, location FROM records ORDER BY rowid")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| -> Result<CatalogEntry> {
                Ok(CatalogEntry {
                    identifier: row.try_get("identifier")?,
                    location: row.try_get("location")?,
                })
            })
            .collect()
    }

    /// Stream identifiers in insertion order
    pub async fn identifier_iterator(&self) -> Result<CatalogCursor> {
        CatalogCursor::open(&self.pool, CursorColumn::Identifier).await
    }

    /// Stream locations in insertion order
    pub async fn location_iterator(&self) -> Result<CatalogCursor> {
        CatalogCursor::open(&self.pool, CursorColumn::Location).await
    }

    /// Close the connection pool; later calls fail
    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

/// Create the records table unless it already exists
async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
    let existing: Option<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'records'",
    )
    .fetch_optional(pool)
    .await?;

    if existing.is_none() {
        sqlx::query(CREATE_TABLE).execute(pool).await?;
        tracing::debug!("Created records table");
    }

    Ok(())
}
