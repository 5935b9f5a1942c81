//! A small in-process metric registry.
//!
//! Every component that matters for the concurrency and resource model
//! (§5 of the spec) — the work queue, the SG prefetch window, the storage
//! LRU — reports through this registry rather than a singleton: callers hold
//! an `Arc<Registry>` (or a `Reporter` handle) and pass it in explicitly.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(missing_debug_implementations, clippy::clone_on_ref_ptr)]

use parking_lot::Mutex;
use std::{
    collections::BTreeMap,
    fmt::Debug,
    sync::{
        atomic::{AtomicI64, AtomicU64, Ordering},
        Arc,
    },
};

/// A monotonically increasing counter, e.g. "SG chunk messages received".
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn inc(&self, delta: u64) {
        self.value.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// A value that can go up or down, e.g. "outstanding work-queue items".
#[derive(Debug, Default)]
pub struct Gauge {
    value: AtomicI64,
}

impl Gauge {
    pub fn add(&self, delta: i64) {
        self.value.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn sub(&self, delta: i64) {
        self.value.fetch_sub(delta, Ordering::Relaxed);
    }

    pub fn set(&self, value: i64) {
        self.value.store(value, Ordering::Relaxed);
    }

    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// A coarse histogram bucketed by power-of-two boundaries, good enough for
/// "how big are the runs this sort job produced" / "how long did the
/// coordinator wait for a worker notify" without pulling in a full metrics
/// crate.
#[derive(Debug, Default)]
pub struct Histogram {
    inner: Mutex<HistogramInner>,
}

#[derive(Debug, Default)]
struct HistogramInner {
    buckets: BTreeMap<u32, u64>, // log2(value) -> count
    count: u64,
    sum: u128,
}

impl Histogram {
    pub fn record(&self, value: u64) {
        let mut inner = self.inner.lock();
        let bucket = 64 - value.max(1).leading_zeros();
        *inner.buckets.entry(bucket).or_insert(0) += 1;
        inner.count += 1;
        inner.sum += value as u128;
    }

    pub fn count(&self) -> u64 {
        self.inner.lock().count
    }

    pub fn mean(&self) -> f64 {
        let inner = self.inner.lock();
        if inner.count == 0 {
            0.0
        } else {
            inner.sum as f64 / inner.count as f64
        }
    }
}

/// A process-wide-ish registry: in practice one per test or one per running
/// engine instance, threaded through `execute()` contexts rather than reached
/// for as a global singleton (see the "global loggers and config singletons"
/// redesign note).
#[derive(Debug, Default)]
pub struct Registry {
    counters: Mutex<BTreeMap<&'static str, Arc<Counter>>>,
    gauges: Mutex<BTreeMap<&'static str, Arc<Gauge>>>,
    histograms: Mutex<BTreeMap<&'static str, Arc<Histogram>>>,
}

impl Registry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn counter(&self, name: &'static str) -> Arc<Counter> {
        Arc::clone(
            self.counters
                .lock()
                .entry(name)
                .or_insert_with(|| Arc::new(Counter::default())),
        )
    }

    pub fn gauge(&self, name: &'static str) -> Arc<Gauge> {
        Arc::clone(
            self.gauges
                .lock()
                .entry(name)
                .or_insert_with(|| Arc::new(Gauge::default())),
        )
    }

    pub fn histogram(&self, name: &'static str) -> Arc<Histogram> {
        Arc::clone(
            self.histograms
                .lock()
                .entry(name)
                .or_insert_with(|| Arc::new(Histogram::default())),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_accumulates() {
        let reg = Registry::new();
        let c = reg.counter("sg.chunks_received");
        c.inc(1);
        c.inc(4);
        assert_eq!(reg.counter("sg.chunks_received").get(), 5);
    }

    #[test]
    fn gauge_tracks_outstanding() {
        let reg = Registry::new();
        let g = reg.gauge("workqueue.outstanding");
        g.add(3);
        g.sub(1);
        assert_eq!(g.get(), 2);
    }

    #[test]
    fn histogram_mean() {
        let h = Histogram::default();
        h.record(10);
        h.record(20);
        assert_eq!(h.count(), 2);
        assert!((h.mean() - 15.0).abs() < f64::EPSILON);
    }
}
