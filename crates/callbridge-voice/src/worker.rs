//! Bounded offload for blocking client code.
//!
//! Pipeline stages run as cooperative tasks; a blocking HTTP client called
//! directly from one of them would stall every other call scheduled on the
//! same worker thread. All blocking engine work goes through a
//! [`WorkerPool`], which caps how many blocking jobs run at once.

use crate::error::VoiceError;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Default number of concurrent blocking engine calls.
pub const DEFAULT_WORKER_POOL_SIZE: usize = 8;

#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_WORKER_POOL_SIZE)
    }
}

impl WorkerPool {
    /// Creates a pool that runs at most `size` jobs concurrently (minimum 1).
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of jobs that could start right now without waiting.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Runs `job` on the blocking thread pool once a slot is free.
    ///
    /// The slot is held until the job returns, even if the caller stops
    /// waiting for it.
    pub async fn run<F, T>(&self, job: F) -> Result<T, VoiceError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| VoiceError::WorkerPool("worker pool is closed".to_string()))?;

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job()
        })
        .await
        .map_err(|e| VoiceError::WorkerPool(format!("blocking job failed: {}", e)))
    }
}
