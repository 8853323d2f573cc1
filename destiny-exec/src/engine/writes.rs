use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::{JoinError, JoinSet};

/// Client cache writes that outlive the request that queued them.
///
/// Dropping the last handle aborts writes still in flight.
#[derive(Debug, Clone, Default)]
pub(crate) struct CacheWrites {
    tasks: Arc<Mutex<JoinSet<()>>>,
}

impl CacheWrites {
    /// Start a write without waiting for it; finished writes are reaped here.
    pub(crate) fn spawn<F>(&self, write: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.lock();
        while let Some(done) = tasks.try_join_next() {
            log_failure(done);
        }
        tasks.spawn(write);
    }

    /// Wait for every write started so far.
    pub(crate) async fn flush(&self) {
        let mut tasks = std::mem::take(&mut *self.lock());
        while let Some(done) = tasks.join_next().await {
            log_failure(done);
        }
    }

    fn lock(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn log_failure(done: Result<(), JoinError>) {
    if let Err(e) = done {
        tracing::warn!(target: "destiny", "client cache write task failed: {e}");
    }
}
