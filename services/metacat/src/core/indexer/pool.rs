//! Bounded worker pool for field computation.
//!
//! Field work is CPU-bound, so each task runs on tokio's blocking
//! threads. A semaphore caps how many run at once across the whole
//! process; the permit is taken before the task is spawned and
//! released when it finishes, panics included.

use crate::core::error::{MetacatError, Result};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Permits of the process-wide pool unless configured otherwise
pub const DEFAULT_FIELD_WORKERS: usize = 5;

static GLOBAL: OnceCell<FieldPool> = OnceCell::new();

/// Fixed-capacity pool; clones share the same permits
#[derive(Debug, Clone)]
pub struct FieldPool {
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl FieldPool {
    /// Create a pool with `capacity` permits (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// The process-wide pool, created on first use
    pub fn global() -> FieldPool {
        GLOBAL
            .get_or_init(|| FieldPool::new(DEFAULT_FIELD_WORKERS))
            .clone()
    }

    /// Size the process-wide pool before its first use.
    ///
    /// Returns `false` if the pool already exists; its capacity is
    /// then left unchanged.
    pub fn init_global(capacity: usize) -> bool {
        let created = GLOBAL.set(FieldPool::new(capacity)).is_ok();
        if !created {
            tracing::debug!(
                "Field pool already initialized with {} workers",
                FieldPool::global().capacity()
            );
        }
        created
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits not currently held by a running task
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Run `work` on a blocking thread once a permit is free
    pub async fn spawn<F, T>(&self, work: F) -> Result<JoinHandle<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| MetacatError::FieldComputation {
                field: String::from("<pool>"),
                message: e.to_string(),
            })?;

        Ok(tokio::task::spawn_blocking(move || {
            let _permit = permit;
            work()
        }))
    }
}
