use std::io;
use std::time::Duration;

use tokio::runtime::{Builder, Handle, Runtime};

/// Async workers only await blocking searches.
const ASYNC_WORKERS: usize = 2;
/// Upper bound on concurrently running engine processes.
const MAX_CONCURRENT_SEARCHES: usize = 8;

/// Owns the tokio runtime that background searches are spawned on.
pub struct AsyncRuntime {
    runtime: Runtime,
}

impl AsyncRuntime {
    pub fn new() -> io::Result<Self> {
        Self::with_search_limit(MAX_CONCURRENT_SEARCHES)
    }

    pub fn with_search_limit(max_searches: usize) -> io::Result<Self> {
        let max_searches = max_searches.max(1);
        let runtime = Builder::new_multi_thread()
            .worker_threads(ASYNC_WORKERS)
            .max_blocking_threads(max_searches)
            .thread_name("zsearch-worker")
            .enable_all()
            .build()
            .or_else(|e| {
                tracing::error!(
                    error = %e,
                    "multi-thread runtime unavailable, searches will share one thread"
                );
                Builder::new_current_thread()
                    .max_blocking_threads(max_searches)
                    .enable_all()
                    .build()
            })?;
        tracing::debug!(max_searches, "search runtime ready");
        Ok(Self { runtime })
    }

    pub fn tokio_handle(&self) -> Handle {
        self.runtime.handle().clone()
    }

    /// Stops the runtime without waiting more than `grace` for blocking
    /// searches that are still draining their engine.
    pub fn shutdown(self, grace: Duration) {
        self.runtime.shutdown_timeout(grace);
    }
}
