//! Query and span identifiers that flow through the operator execution
//! skeleton (`exec`), the SG wire messages (`scatter_gather`), and the
//! coordinator/worker handshake (`mtNotify(queryId)` / `mtWait(queryId)`,
//! §6).
//!
//! This is deliberately not a full OpenTelemetry-style tracing pipeline —
//! the client wire protocol is out of scope — but every long-lived
//! component still needs a stable, loggable identifier for "which query is
//! this" and "which span of that query's execution is this", so it is
//! carried as ambient infrastructure regardless.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(missing_debug_implementations, clippy::clone_on_ref_ptr)]

use observability_deps::tracing::Span as TracingSpan;
use parking_lot::Mutex;
use rand::Rng;
use std::{fmt, sync::Arc};

/// Identifies one logical query execution, unique within a running engine
/// instance. Carried by every `Query` and every callback that captures a
/// weak reference to one (§3 Ownership, §9 shared-pointer redesign note).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QueryId(u64);

impl QueryId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(&self) -> u64 {
        self.0
    }

    /// Generate a fresh, process-unique id. Collisions are not handled
    /// because a 64-bit random id colliding within one engine's lifetime is
    /// not a realistic failure mode.
    pub fn generate() -> Self {
        Self(rand::thread_rng().gen())
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{:016x}", self.0)
    }
}

/// One unit of work within a query's execution (one operator's `execute()`,
/// one SG stream's pull loop, one sort job).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpanId(u64);

impl SpanId {
    pub fn generate() -> Self {
        Self(rand::thread_rng().gen())
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{:016x}", self.0)
    }
}

/// A handle threaded through `execute()` and SG callbacks, binding a
/// `tracing::Span` to a [`QueryId`]/[`SpanId`] pair for log correlation.
#[derive(Debug, Clone)]
pub struct SpanContext {
    query_id: QueryId,
    span_id: SpanId,
    recorder: Arc<Mutex<Vec<SpanEvent>>>,
}

#[derive(Debug, Clone)]
struct SpanEvent {
    name: &'static str,
}

impl SpanContext {
    pub fn new_root(query_id: QueryId) -> Self {
        Self {
            query_id,
            span_id: SpanId::generate(),
            recorder: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn child(&self) -> Self {
        Self {
            query_id: self.query_id,
            span_id: SpanId::generate(),
            recorder: Arc::clone(&self.recorder),
        }
    }

    pub fn query_id(&self) -> QueryId {
        self.query_id
    }

    pub fn span_id(&self) -> SpanId {
        self.span_id
    }

    /// Record a named event against this span's shared recorder, used by
    /// tests to assert which spans actually ran (e.g. that a deadlock
    /// timeout span was entered).
    pub fn record(&self, name: &'static str) {
        self.recorder.lock().push(SpanEvent { name });
    }

    pub fn events(&self) -> Vec<&'static str> {
        self.recorder.lock().iter().map(|e| e.name).collect()
    }

    /// Build a `tracing::Span` carrying this context's ids as fields, for
    /// use with `observability_deps::tracing`'s `#[instrument]`-free spans.
    pub fn tracing_span(&self, name: &'static str) -> TracingSpan {
        observability_deps::tracing::info_span!(
            "span",
            name,
            query_id = %self.query_id,
            span_id = %self.span_id,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn children_share_query_id_but_not_span_id() {
        let root = SpanContext::new_root(QueryId::generate());
        let child = root.child();
        assert_eq!(root.query_id(), child.query_id());
        assert_ne!(root.span_id(), child.span_id());
    }

    #[test]
    fn events_are_shared_across_children() {
        let root = SpanContext::new_root(QueryId::generate());
        let child = root.child();
        root.record("preSingleExecute");
        child.record("execute");
        assert_eq!(root.events(), vec!["preSingleExecute", "execute"]);
    }

    #[test]
    fn query_id_display_is_stable_width() {
        let id = QueryId::new(1);
        assert_eq!(format!("{id}"), "q0000000000000001");
    }
}
