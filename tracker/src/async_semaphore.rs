//! The blocking primitive behind the coordinator/worker notify+wait
//! handshake (§4.7) and `PullSgArrayBlocking`'s `SyncCtx` (§4.4): a thread
//! signals readiness by releasing permits, waiters block with a deadline and
//! get a [`crate::error::Error::DeadlockTimeout`] rather than hanging
//! forever (§5 "`Semaphore::enter` in the coordinator/worker handshake;
//! timeouts are errors").

use crate::error::{DeadlockTimeoutSnafu, Result};
use clock::TimeProviderRef;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};

/// A counting semaphore with a named deadline-based `acquire`, used wherever
/// the spec calls for "wait up to `deadlockTimeoutSec`" (§4.7).
pub struct AsyncSemaphore {
    inner: Semaphore,
    clock: TimeProviderRef,
}

impl fmt::Debug for AsyncSemaphore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncSemaphore")
            .field("available_permits", &self.inner.available_permits())
            .finish()
    }
}

impl AsyncSemaphore {
    pub fn new(permits: usize, clock: TimeProviderRef) -> Self {
        Self {
            inner: Semaphore::new(permits),
            clock,
        }
    }

    /// Acquire one permit, waiting up to `timeout`. `waiting_on` names the
    /// resource in the error message (e.g. a worker instance id) so a failed
    /// handshake is diagnosable without re-deriving context from the caller.
    pub async fn acquire_timeout(&self, timeout: Duration, waiting_on: &str) -> Result<()> {
        let start = self.clock.now_instant();
        match tokio::time::timeout(timeout, self.inner.acquire()).await {
            Ok(Ok(permit)) => {
                permit.forget();
                Ok(())
            }
            Ok(Err(_closed)) => DeadlockTimeoutSnafu {
                waiting_on,
                elapsed_ms: start.elapsed().as_millis() as u64,
            }
            .fail(),
            Err(_elapsed) => DeadlockTimeoutSnafu {
                waiting_on,
                elapsed_ms: start.elapsed().as_millis() as u64,
            }
            .fail(),
        }
    }

    pub fn release(&self, permits: usize) {
        self.inner.add_permits(permits);
    }
}

/// A one-shot-per-signal notification used by `PullSgArrayBlocking::pull_attributes`
/// (§4.4) to block until any of several per-attribute callbacks fires.
#[derive(Debug, Default)]
pub struct SyncCtx {
    notify: Notify,
}

impl SyncCtx {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn signal(&self) {
        self.notify.notify_waiters();
    }

    pub async fn wait(&self) {
        self.notify.notified().await;
    }

    pub async fn wait_timeout(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.notify.notified())
            .await
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn acquire_succeeds_when_permit_available() {
        let sem = AsyncSemaphore::new(1, clock::system());
        sem.acquire_timeout(Duration::from_millis(50), "worker-0")
            .await
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn acquire_times_out_with_deadlock_error() {
        let sem = AsyncSemaphore::new(0, clock::system());
        let err = sem
            .acquire_timeout(Duration::from_millis(10), "worker-1")
            .await
            .unwrap_err();
        assert!(matches!(err, crate::Error::DeadlockTimeout { .. }));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn sync_ctx_wakes_waiter_on_signal() {
        let ctx = SyncCtx::new();
        let ctx2 = Arc::clone(&ctx);
        let handle = tokio::spawn(async move {
            ctx2.wait().await;
        });
        tokio::task::yield_now().await;
        ctx.signal();
        handle.await.unwrap();
    }
}
