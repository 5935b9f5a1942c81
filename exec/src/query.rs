//! Query lifecycle (§3 Ownership, §4's cancellation/timeout notes, §9's
//! shared-pointer redesign note): a `Query` owns locks, finalizers, and
//! error handlers, all released/run exactly once regardless of outcome.
//! Long-lived callbacks (SG streams, redistribute pulls) hold a
//! [`QueryHandle`] — a [`trace::QueryId`] plus a `Weak<QueryRegistry>` —
//! rather than a raw `Weak<Query>`, so a cancelled or forgotten query is
//! detected through one indirection instead of every callback needing its
//! own validity bit.

use observability_deps::tracing::warn;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

type Finalizer = Box<dyn FnOnce(&Arc<Query>) + Send>;
type ErrorHandler = Box<dyn FnOnce(&Arc<Query>) + Send>;

#[derive(Debug, Default)]
struct QueryState {
    locks: Vec<String>,
    cancelled: bool,
    failed: Option<String>,
    finished: bool,
}

/// One logical statement executing across instances (GLOSSARY "Query").
/// Finalizers and error handlers registered here run exactly once, on
/// [`Query::finish`], regardless of whether the query committed, failed, or
/// was cancelled (§4 "Queries register error handlers ... and finalizers
/// ... these run regardless of success or failure").
pub struct Query {
    id: trace::QueryId,
    registry: Weak<QueryRegistry>,
    state: Mutex<QueryState>,
    finalizers: Mutex<Vec<Finalizer>>,
    error_handlers: Mutex<Vec<ErrorHandler>>,
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Query")
            .field("id", &self.id)
            .field("cancelled", &state.cancelled)
            .field("failed", &state.failed)
            .finish()
    }
}

impl Query {
    pub fn id(&self) -> trace::QueryId {
        self.id
    }

    /// Acquire a named catalog lock (§3 "a query owns ... a set of catalog
    /// locks"). Locks are released in acquisition order by [`Query::finish`].
    pub fn acquire_lock(&self, name: impl Into<String>) {
        self.state.lock().locks.push(name.into());
    }

    pub fn held_locks(&self) -> Vec<String> {
        self.state.lock().locks.clone()
    }

    pub fn register_finalizer<F>(&self, f: F)
    where
        F: FnOnce(&Arc<Query>) + Send + 'static,
    {
        self.finalizers.lock().push(Box::new(f));
    }

    pub fn register_error_handler<F>(&self, f: F)
    where
        F: FnOnce(&Arc<Query>) + Send + 'static,
    {
        self.error_handlers.lock().push(Box::new(f));
    }

    pub fn cancel(&self) {
        self.state.lock().cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.lock().cancelled
    }

    /// Mark the query externally failed (§4 "cancelled, externally failed,
    /// or its view membership changed" are the three reasons `validate`
    /// rejects a query).
    pub fn fail(&self, reason: impl Into<String>) {
        self.state.lock().failed = Some(reason.into());
    }

    pub fn failure_reason(&self) -> Option<String> {
        self.state.lock().failed.clone()
    }

    /// A handle callbacks can hold instead of a raw `Weak<Query>`: it
    /// survives independent of this `Arc`'s strong-reference count and
    /// re-fetches the live query from the registry on every use.
    pub fn handle(self: &Arc<Self>) -> QueryHandle {
        QueryHandle { id: self.id, registry: self.registry.clone() }
    }

    /// Run every registered finalizer and error handler exactly once, then
    /// release every held lock (§3, §4: "these run regardless of success or
    /// failure"). Idempotent: a second call is a no-op.
    pub fn finish(self: &Arc<Self>) {
        {
            let mut state = self.state.lock();
            if state.finished {
                return;
            }
            state.finished = true;
        }

        let failed = self.failure_reason().is_some();
        if failed {
            for handler in self.error_handlers.lock().drain(..) {
                handler(self);
            }
        }
        for finalizer in self.finalizers.lock().drain(..) {
            finalizer(self);
        }

        let locks: Vec<String> = self.state.lock().locks.drain(..).collect();
        for lock in locks {
            warn!(query_id = %self.id, lock, "releasing catalog lock on query finish");
        }

        if let Some(registry) = self.registry.upgrade() {
            registry.forget(self.id);
        }
    }
}

/// Every long-lived callback's `Query::validate()` equivalent (§9 redesign
/// note): reuses `scatter_gather::Error::QueryGone` rather than inventing a
/// parallel "query invalid" error, since a gone query and an invalid query
/// are the same condition from a callback's point of view.
impl scatter_gather::QueryValidator for Query {
    fn validate(&self) -> scatter_gather::Result<()> {
        let state = self.state.lock();
        if state.cancelled || state.failed.is_some() {
            return Err(scatter_gather::Error::QueryGone);
        }
        Ok(())
    }
}

/// A lookup key plus a weak registry reference, the shape every SG/
/// redistribute callback captures instead of `Weak<Query>` directly (§9:
/// "callbacks hold a lookup key (queryId) plus the queue; on invoke, fetch
/// the live query from a registry and bail if absent").
#[derive(Debug, Clone)]
pub struct QueryHandle {
    id: trace::QueryId,
    registry: Weak<QueryRegistry>,
}

impl QueryHandle {
    pub fn id(&self) -> trace::QueryId {
        self.id
    }

    /// Fetch the live query, or `None` if it has been forgotten (completed
    /// and removed from the registry, or the registry itself is gone).
    pub fn resolve(&self) -> Option<Arc<Query>> {
        self.registry.upgrade()?.lookup(self.id)
    }
}

/// The process-wide table of in-flight queries, keyed by [`trace::QueryId`].
/// `QueryHandle`s hold only a weak reference to this, matching every other
/// weak-back-reference redesign in the workspace.
#[derive(Debug, Default)]
pub struct QueryRegistry {
    queries: Mutex<HashMap<trace::QueryId, Arc<Query>>>,
}

impl QueryRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Create and register a new query under a fresh id.
    pub fn start(self: &Arc<Self>) -> Arc<Query> {
        let id = trace::QueryId::generate();
        let query = Arc::new(Query {
            id,
            registry: Arc::downgrade(self),
            state: Mutex::new(QueryState::default()),
            finalizers: Mutex::new(Vec::new()),
            error_handlers: Mutex::new(Vec::new()),
        });
        self.queries.lock().insert(id, Arc::clone(&query));
        query
    }

    pub fn lookup(&self, id: trace::QueryId) -> Option<Arc<Query>> {
        self.queries.lock().get(&id).cloned()
    }

    fn forget(&self, id: trace::QueryId) {
        self.queries.lock().remove(&id);
    }

    pub fn len(&self) -> usize {
        self.queries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn validate_fails_once_cancelled() {
        let registry = QueryRegistry::new();
        let query = registry.start();
        assert!(scatter_gather::QueryValidator::validate(query.as_ref()).is_ok());
        query.cancel();
        assert!(matches!(
            scatter_gather::QueryValidator::validate(query.as_ref()),
            Err(scatter_gather::Error::QueryGone)
        ));
    }

    #[test]
    fn finish_runs_finalizers_and_releases_locks() {
        let registry = QueryRegistry::new();
        let query = registry.start();
        query.acquire_lock("array:A");
        let ran = Arc::new(AtomicBool::new(false));
        let ran2 = Arc::clone(&ran);
        query.register_finalizer(move |_| ran2.store(true, Ordering::SeqCst));

        query.finish();

        assert!(ran.load(Ordering::SeqCst));
        assert!(query.held_locks().is_empty());
        assert!(registry.lookup(query.id()).is_none());
    }

    #[test]
    fn error_handlers_only_run_on_failure() {
        let registry = QueryRegistry::new();
        let ok_query = registry.start();
        let ran = Arc::new(AtomicBool::new(false));
        let ran2 = Arc::clone(&ran);
        ok_query.register_error_handler(move |_| ran2.store(true, Ordering::SeqCst));
        ok_query.finish();
        assert!(!ran.load(Ordering::SeqCst));

        let failing_query = registry.start();
        let ran = Arc::new(AtomicBool::new(false));
        let ran2 = Arc::clone(&ran);
        failing_query.register_error_handler(move |_| ran2.store(true, Ordering::SeqCst));
        failing_query.fail("replication drain failed");
        failing_query.finish();
        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn handle_resolves_while_query_is_registered_and_not_after_finish() {
        let registry = QueryRegistry::new();
        let query = registry.start();
        let handle = query.handle();
        assert!(handle.resolve().is_some());
        query.finish();
        assert!(handle.resolve().is_none());
    }
}
