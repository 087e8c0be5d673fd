//! Worker pool sized once per query.

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use crate::error::RfError;

/// A dedicated rayon pool plus the row partitioning it implies.
///
/// Rows are split into at most `n_threads` contiguous chunks; each chunk is
/// one work unit that owns its output rows and its own counters. A single
/// worker means no pool at all: the work runs on the calling thread.
pub(crate) struct WorkerPool {
    pool: Option<ThreadPool>,
    n_threads: usize,
}

impl WorkerPool {
    /// Size the workers for `n_rows` rows.
    ///
    /// Uses `n_threads` workers, but never more than there are rows and
    /// never fewer than one.
    pub(crate) fn new(n_threads: usize, n_rows: usize) -> Result<Self, RfError> {
        let n_threads = n_threads.min(n_rows).max(1);
        let pool = if n_threads == 1 {
            None
        } else {
            Some(
                ThreadPoolBuilder::new()
                    .num_threads(n_threads)
                    .thread_name(|i| format!("sylva-worker-{i}"))
                    .build()?,
            )
        };
        debug!(n_threads, sequential = pool.is_none(), "worker pool ready");
        Ok(Self { pool, n_threads })
    }

    /// Return the number of workers.
    pub(crate) fn n_threads(&self) -> usize {
        self.n_threads
    }

    /// Return `true` if work runs on the calling thread.
    pub(crate) fn is_sequential(&self) -> bool {
        self.pool.is_none()
    }

    /// Return the rows per chunk for `n_rows` rows (never zero).
    pub(crate) fn chunk_len(&self, n_rows: usize) -> usize {
        n_rows.div_ceil(self.n_threads).max(1)
    }

    /// Run `work` inside the pool, or directly when sequential.
    pub(crate) fn install<T, F>(&self, work: F) -> T
    where
        T: Send,
        F: FnOnce() -> T + Send,
    {
        match &self.pool {
            Some(pool) => pool.install(work),
            None => work(),
        }
    }
}
