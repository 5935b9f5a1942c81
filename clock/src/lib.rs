//! Time abstractions used by every component that needs a deadline, a
//! monotonic tag, or a wall-clock timestamp: the SG message clock, the
//! coordinator/worker deadlock timeout, and chunk eviction bookkeeping.
//!
//! Mirrors the real-vs-mock split used throughout the codebase for anything
//! IO-bound or time-dependent: production code takes `Arc<dyn TimeProvider>`
//! and tests inject [`MockProvider`] to get deterministic, advanceable time.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(missing_debug_implementations, clippy::clone_on_ref_ptr)]

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::RwLock;
use std::{
    fmt::Debug,
    sync::Arc,
    time::{Duration, Instant},
};

/// A point in time, represented as nanoseconds since the Unix epoch.
///
/// Deliberately narrow: arithmetic goes through [`Time::checked_add`] /
/// [`Time::checked_duration_since`] rather than exposing the inner
/// representation, so callers can't accidentally mix nanos and millis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Time(i64);

impl Time {
    pub const MAX: Time = Time(i64::MAX);
    pub const MIN: Time = Time(i64::MIN);

    pub fn from_timestamp_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    pub fn timestamp_nanos(&self) -> i64 {
        self.0
    }

    pub fn date_time(&self) -> DateTime<Utc> {
        let secs = self.0.div_euclid(1_000_000_000);
        let nanos = self.0.rem_euclid(1_000_000_000) as u32;
        DateTime::<Utc>::from_timestamp(secs, nanos).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    pub fn checked_add(&self, duration: Duration) -> Option<Self> {
        let nanos: i64 = duration.as_nanos().try_into().ok()?;
        self.0.checked_add(nanos).map(Self)
    }

    pub fn checked_duration_since(&self, other: Self) -> Option<Duration> {
        let nanos = self.0.checked_sub(other.0)?;
        if nanos < 0 {
            None
        } else {
            Some(Duration::from_nanos(nanos as u64))
        }
    }

    /// Saturating difference, clamped to zero if `self` is before `other`.
    pub fn duration_since(&self, other: Self) -> Duration {
        self.checked_duration_since(other).unwrap_or_default()
    }
}

impl From<DateTime<Utc>> for Time {
    fn from(value: DateTime<Utc>) -> Self {
        Self(
            value
                .timestamp_nanos_opt()
                .unwrap_or(i64::MAX)
                .clamp(i64::MIN, i64::MAX),
        )
    }
}

/// Anything that can hand out the current time.
///
/// `now_instant` exists alongside `now` because deadline arithmetic (e.g. the
/// coordinator's `deadlockTimeoutSec` wait) wants a monotonic clock that
/// can't jump backwards with NTP adjustments, while `now` gives a wall-clock
/// timestamp suitable for on-disk/wire metadata.
pub trait TimeProvider: Debug + Send + Sync + 'static {
    fn now(&self) -> Time;

    fn now_instant(&self) -> Instant;

    /// Duration remaining until `deadline`, zero if it has already passed.
    ///
    /// Callers combine this with `tokio::time::sleep` (or a semaphore
    /// `acquire_timeout`) rather than the provider owning the sleep future
    /// directly, so the provider trait stays executor-agnostic.
    fn remaining_until(&self, deadline: Time) -> Duration {
        let now = self.now();
        deadline.checked_duration_since(now).unwrap_or(Duration::ZERO)
    }
}

/// The production [`TimeProvider`], backed by the system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProvider {}

impl SystemProvider {
    pub fn new() -> Self {
        Self {}
    }
}

impl TimeProvider for SystemProvider {
    fn now(&self) -> Time {
        Utc::now().into()
    }

    fn now_instant(&self) -> Instant {
        Instant::now()
    }
}

/// A [`TimeProvider`] with a time that only moves when told to.
///
/// Used by `tracker`'s deadlock-timeout tests and `scatter_gather`'s
/// flow-control tests so assertions don't depend on wall-clock scheduling
/// jitter.
#[derive(Debug)]
pub struct MockProvider {
    now: RwLock<Time>,
    instant_offset: Instant,
}

impl MockProvider {
    pub fn new(start: Time) -> Self {
        Self {
            now: RwLock::new(start),
            instant_offset: Instant::now(),
        }
    }

    pub fn set(&self, time: Time) {
        *self.now.write() = time;
    }

    pub fn inc(&self, duration: Duration) -> Time {
        let mut guard = self.now.write();
        let nanos = ChronoDuration::from_std(duration).expect("duration too large");
        *guard = Time(guard.0.saturating_add(nanos.num_nanoseconds().unwrap_or(i64::MAX)));
        *guard
    }
}

impl TimeProvider for MockProvider {
    fn now(&self) -> Time {
        *self.now.read()
    }

    fn now_instant(&self) -> Instant {
        // Best effort: offset a real Instant by the elapsed mock duration
        // since construction so relative ordering still makes sense.
        let elapsed = self
            .now()
            .duration_since(Time::from_timestamp_nanos(0))
            .as_nanos();
        self.instant_offset + Duration::from_nanos(elapsed.min(u64::MAX as u128) as u64)
    }
}

/// A shared handle to a [`TimeProvider`], the form every component actually
/// carries around (in `execute()` contexts, queue workers, etc).
pub type TimeProviderRef = Arc<dyn TimeProvider>;

pub fn system() -> TimeProviderRef {
    Arc::new(SystemProvider::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_provider_advances_only_on_request() {
        let p = MockProvider::new(Time::from_timestamp_nanos(1_000));
        assert_eq!(p.now(), Time::from_timestamp_nanos(1_000));
        p.inc(Duration::from_secs(1));
        assert_eq!(p.now(), Time::from_timestamp_nanos(1_000_000_001_000));
    }

    #[test]
    fn time_duration_since_saturates_at_zero() {
        let earlier = Time::from_timestamp_nanos(100);
        let later = Time::from_timestamp_nanos(50);
        assert_eq!(earlier.duration_since(later), Duration::from_nanos(50));
        assert_eq!(later.duration_since(earlier), Duration::ZERO);
    }

    #[test]
    fn checked_add_respects_overflow() {
        assert!(Time::MAX.checked_add(Duration::from_secs(1)).is_none());
    }
}
