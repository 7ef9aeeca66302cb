//! Streaming, read-only iteration over a catalog.
//!
//! A cursor owns one pooled connection for its whole life. The
//! connection is switched to `query_only` while rows are streamed and
//! switched back before it returns to the pool. Rows cross a bounded
//! channel, so at most [`CURSOR_BUFFER`] values are held in memory.

use crate::core::error::{MetacatError, Result};
use futures::TryStreamExt;
use sqlx::SqlitePool;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Rows buffered between the reader task and the consumer
pub const CURSOR_BUFFER: usize = 64;

/// Column a cursor yields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorColumn {
    Identifier,
    Location,
}

impl CursorColumn {
    fn query(self) -> &'static str {
        match self {
            CursorColumn::Identifier => "SELECT identifier FROM records ORDER BY rowid",
            CursorColumn::Location => "SELECT location FROM records ORDER BY rowid",
        }
    }
}

/// Forward-only cursor over catalog rows in insertion order
#[derive(Debug)]
pub struct CatalogCursor {
    rows: mpsc::Receiver<Result<String>>,
    reader: JoinHandle<()>,
}

impl CatalogCursor {
    pub(crate) async fn open(pool: &SqlitePool, column: CursorColumn) -> Result<Self> {
        let mut conn = pool.acquire().await?;
        sqlx::query("PRAGMA query_only = ON")
            .execute(&mut *conn)
            .await?;

        let (tx, rows) = mpsc::channel(CURSOR_BUFFER);

        let reader = tokio::spawn(async move {
            {
                let mut stream = sqlx::query_scalar::<_, String>(column.query()).fetch(&mut *conn);
                loop {
                    match stream.try_next().await {
                        Ok(Some(value)) => {
                            // Consumer went away
                            if tx.send(Ok(value)).await.is_err() {
                                break;
                            }
                        }
                        Ok(None) => break,
                        Err(e) => {
                            let _ = tx.send(Err(MetacatError::Catalog(e))).await;
                            break;
                        }
                    }
                }
            }

            if let Err(e) = sqlx::query("PRAGMA query_only = OFF")
                .execute(&mut *conn)
                .await
            {
                tracing::warn!("Failed to restore catalog connection: {}", e);
            }
        });

        Ok(Self { rows, reader })
    }

    /// Next value, or `None` once exhausted
    pub async fn next(&mut self) -> Option<Result<String>> {
        self.rows.recv().await
    }

    /// Drain the remaining values
    pub async fn collect_remaining(mut self) -> Result<Vec<String>> {
        let mut values = Vec::new();
        while let Some(value) = self.next().await {
            values.push(value?);
        }
        self.close().await;
        Ok(values)
    }

    /// Release the cursor and its connection.
    ///
    /// Waits for the reader to restore the connection, so the pool
    /// gets it back read-write.
    pub async fn close(self) {
        let Self { rows, reader } = self;
        drop(rows);
        if let Err(e) = reader.await {
            tracing::warn!("Catalog cursor reader failed: {}", e);
        }
    }
}
