//! Shared test-only helpers: one-time tracing init, and (behind
//! `future_timeout`) an async timeout wrapper for tests that assert a
//! future completes (or deliberately blocks, e.g. the coordinator/worker
//! handshake) within a bound.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Install a `tracing_subscriber` that honours `RUST_LOG`, once per process.
///
/// Call at the top of any test that wants to see `tracing` output; safe to
/// call from many tests concurrently.
pub fn maybe_start_logging() {
    INIT_TRACING.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .init();
    });
}

/// Returns a fresh temp directory, cleaned up on drop. Thin wrapper so
/// callers don't need to depend on `tempfile` directly.
pub fn tmp_dir() -> std::io::Result<tempfile::TempDir> {
    tempfile::tempdir()
}

#[cfg(feature = "future_timeout")]
mod timeout {
    use async_trait::async_trait;
    use std::{future::Future, time::Duration};

    /// Panics with a readable message if `self` doesn't resolve within
    /// `duration`. Used by SG / work-queue tests that assert forward
    /// progress rather than a deadlock.
    #[async_trait]
    pub trait FutureTimeout: Future + Sized + Send {
        async fn with_timeout_panic(self, duration: Duration) -> Self::Output
        where
            Self::Output: Send,
        {
            tokio::time::timeout(duration, self)
                .await
                .expect("future did not complete within timeout")
        }
    }

    impl<T: Future + Send> FutureTimeout for T {}

    #[allow(dead_code)]
    fn assert_send<T: Send>(_: T) {}
}

#[cfg(feature = "future_timeout")]
pub use timeout::FutureTimeout;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logging_init_is_idempotent() {
        maybe_start_logging();
        maybe_start_logging();
    }

    #[test]
    fn tmp_dir_is_usable() {
        let dir = tmp_dir().unwrap();
        assert!(dir.path().exists());
    }
}
