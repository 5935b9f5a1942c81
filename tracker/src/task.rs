//! The bounded cooperative `WorkQueue` layered over a process-wide thread
//! pool (§4.8), plus the `JobQueue` abstraction it schedules onto.

use crate::error::{OverflowSnafu, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{
    mpsc::{Receiver, Sender},
    Arc, Weak,
};
use std::thread::JoinHandle;

/// One unit of dispatched work: a sort job's partition step, a merge job's
/// k-way fold, an SG response handler.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// The shared pool `WorkQueue`s dispatch onto. A trait so tests can swap in
/// an inline (same-thread) implementation without spinning real threads.
pub trait JobQueue: fmt::Debug + Send + Sync {
    fn spawn(&self, job: Job);
}

/// A fixed-size OS-thread pool backing the default [`JobQueue`].
pub struct ThreadPoolJobQueue {
    name: &'static str,
    sender: Mutex<Option<Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl fmt::Debug for ThreadPoolJobQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadPoolJobQueue")
            .field("name", &self.name)
            .field("workers", &self.workers.lock().len())
            .finish()
    }
}

impl ThreadPoolJobQueue {
    pub fn new(name: &'static str, num_threads: usize) -> Arc<Self> {
        let (tx, rx) = std::sync::mpsc::channel::<Job>();
        let rx = Arc::new(Mutex::new(rx));
        let workers = (0..num_threads.max(1))
            .map(|i| {
                let rx = Arc::clone(&rx);
                std::thread::Builder::new()
                    .name(format!("{name}-{i}"))
                    .spawn(move || run_worker(name, &rx))
                    .expect("spawning job queue worker thread")
            })
            .collect();
        Arc::new(Self {
            name,
            sender: Mutex::new(Some(tx)),
            workers: Mutex::new(workers),
        })
    }
}

fn run_worker(name: &'static str, rx: &Mutex<Receiver<Job>>) {
    loop {
        let job = {
            let guard = rx.lock();
            guard.recv()
        };
        match job {
            Ok(job) => job(),
            Err(_disconnected) => {
                observability_deps::tracing::debug!(queue = name, "job queue worker shutting down");
                return;
            }
        }
    }
}

impl JobQueue for ThreadPoolJobQueue {
    fn spawn(&self, job: Job) {
        if let Some(sender) = self.sender.lock().as_ref() {
            let _ = sender.send(job);
        }
    }
}

impl Drop for ThreadPoolJobQueue {
    fn drop(&mut self) {
        self.sender.lock().take();
        for worker in self.workers.lock().drain(..) {
            let _ = worker.join();
        }
    }
}

#[derive(Debug, Default)]
struct State {
    outstanding: usize,
    reserved: usize,
    pending: VecDeque<Job>,
}

/// A bounded FIFO of `(fn, ctx)` items layered over a shared [`JobQueue`]
/// (§4.8). `max_outstanding` bounds how many items are dispatched to the
/// pool concurrently; `max_size` bounds total depth including outstanding
/// and reserved slots.
pub struct WorkQueue {
    name: &'static str,
    job_queue: Arc<dyn JobQueue>,
    max_outstanding: usize,
    max_size: usize,
    state: Mutex<State>,
    weak_self: Weak<WorkQueue>,
    outstanding_gauge: Arc<metric::Gauge>,
}

impl fmt::Debug for WorkQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("WorkQueue")
            .field("name", &self.name)
            .field("max_outstanding", &self.max_outstanding)
            .field("max_size", &self.max_size)
            .field("outstanding", &state.outstanding)
            .field("reserved", &state.reserved)
            .field("pending", &state.pending.len())
            .finish()
    }
}

impl WorkQueue {
    pub fn new(
        name: &'static str,
        job_queue: Arc<dyn JobQueue>,
        max_outstanding: usize,
        max_size: usize,
        metrics: &metric::Registry,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            name,
            job_queue,
            max_outstanding: max_outstanding.max(1),
            max_size: max_size.max(max_outstanding.max(1)),
            state: Mutex::new(State::default()),
            weak_self: weak_self.clone(),
            outstanding_gauge: metrics.gauge("work_queue.outstanding"),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn total(state: &State) -> usize {
        state.outstanding + state.reserved + state.pending.len()
    }

    /// Fails with [`crate::Error::Overflow`] if enqueuing would exceed
    /// `max_size` (§4.8 `enqueue`).
    pub fn enqueue(&self, job: Job) -> Result<()> {
        let mut state = self.state.lock();
        let total = Self::total(&state);
        if total >= self.max_size {
            return OverflowSnafu {
                size: total,
                max: self.max_size,
            }
            .fail();
        }
        state.pending.push_back(job);
        self.dispatch(&mut state);
        Ok(())
    }

    /// Hold a slot before the caller has committed to the item it will put
    /// in it (§4.8 `reserve`/`unreserve`/`enqueueReserved`). Dropping the
    /// returned [`Reservation`] without consuming it via
    /// [`WorkQueue::enqueue_reserved`] releases the slot automatically.
    pub fn reserve(&self) -> Result<Reservation> {
        let mut state = self.state.lock();
        let total = Self::total(&state);
        if total >= self.max_size {
            return OverflowSnafu {
                size: total,
                max: self.max_size,
            }
            .fail();
        }
        state.reserved += 1;
        Ok(Reservation {
            queue: self.weak_self.clone(),
            consumed: false,
        })
    }

    pub fn enqueue_reserved(&self, mut reservation: Reservation, job: Job) {
        reservation.consumed = true;
        let mut state = self.state.lock();
        state.reserved = state.reserved.saturating_sub(1);
        state.pending.push_back(job);
        self.dispatch(&mut state);
    }

    fn unreserve(&self) {
        let mut state = self.state.lock();
        state.reserved = state.reserved.saturating_sub(1);
    }

    /// Transfer an item from `from_queue` onto `self` without first
    /// releasing it there. If `self` is full and is not `from_queue` itself,
    /// the item is handed back as [`ReEnqueueOutcome::PushBack`] so the
    /// caller keeps it outstanding on `from_queue` (§4.8 `reEnqueue`).
    pub fn re_enqueue(&self, job: Job, from_queue: &Arc<WorkQueue>) -> ReEnqueueOutcome {
        let mut state = self.state.lock();
        let total = Self::total(&state);
        let same_queue = self
            .weak_self
            .upgrade()
            .map(|this| Arc::ptr_eq(&this, from_queue))
            .unwrap_or(false);
        if total >= self.max_size && !same_queue {
            return ReEnqueueOutcome::PushBack(job);
        }
        state.pending.push_back(job);
        self.dispatch(&mut state);
        ReEnqueueOutcome::Transferred
    }

    /// Release this queue's hold on one item (one outstanding slot), then
    /// dispatch whatever is next pending. Called both by the completion
    /// wrapper around a dispatched job and, via [`crate::lock::SerializationCtx`],
    /// when an item crosses to another queue without this queue itself
    /// having dispatched it.
    pub fn release(&self) {
        let mut state = self.state.lock();
        state.outstanding = state.outstanding.saturating_sub(1);
        self.outstanding_gauge.set(state.outstanding as i64);
        self.dispatch(&mut state);
    }

    fn dispatch(&self, state: &mut State) {
        while state.outstanding < self.max_outstanding {
            let Some(job) = state.pending.pop_front() else {
                break;
            };
            state.outstanding += 1;
            self.outstanding_gauge.set(state.outstanding as i64);
            let Some(this) = self.weak_self.upgrade() else {
                return;
            };
            self.job_queue.spawn(Box::new(move || {
                job();
                this.release();
            }));
        }
    }
}

/// RAII token from [`WorkQueue::reserve`]; unreserves automatically if
/// dropped before [`WorkQueue::enqueue_reserved`] consumes it.
#[derive(Debug)]
pub struct Reservation {
    queue: Weak<WorkQueue>,
    consumed: bool,
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if !self.consumed {
            if let Some(queue) = self.queue.upgrade() {
                queue.unreserve();
            }
        }
    }
}

/// Outcome of [`WorkQueue::re_enqueue`]. `PushBack` is a control-flow signal,
/// not an error (§7 Retry signals) — it carries the job back so the caller
/// can keep it outstanding on the originating queue.
#[derive(Debug)]
pub enum ReEnqueueOutcome {
    Transferred,
    PushBack(Job),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn metrics() -> Arc<metric::Registry> {
        metric::Registry::new()
    }

    #[test]
    fn enqueue_runs_job_on_pool() {
        let pool = ThreadPoolJobQueue::new("test-pool", 2);
        let queue = WorkQueue::new("q", pool, 2, 4, &metrics());
        let ran = Arc::new(AtomicUsize::new(0));
        let ran2 = Arc::clone(&ran);
        queue
            .enqueue(Box::new(move || {
                ran2.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
        for _ in 0..100 {
            if ran.load(Ordering::SeqCst) == 1 {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn enqueue_overflows_past_max_size() {
        let pool = ThreadPoolJobQueue::new("test-pool2", 1);
        let queue = WorkQueue::new("q", pool, 1, 1, &metrics());
        // Fill the one reserved+outstanding+pending slot with a job that
        // blocks until we let it go, so the pool can't drain it first.
        let gate = Arc::new(std::sync::Barrier::new(2));
        let gate2 = Arc::clone(&gate);
        queue
            .enqueue(Box::new(move || {
                gate2.wait();
            }))
            .unwrap();
        let err = queue.enqueue(Box::new(|| {})).unwrap_err();
        assert!(matches!(err, crate::Error::Overflow { .. }));
        gate.wait();
    }

    #[test]
    fn reservation_drop_releases_slot() {
        let pool = ThreadPoolJobQueue::new("test-pool3", 1);
        let queue = WorkQueue::new("q", pool, 1, 1, &metrics());
        {
            let _reservation = queue.reserve().unwrap();
            assert!(queue.reserve().is_err());
        }
        // Reservation dropped without being consumed: slot freed.
        assert!(queue.reserve().is_ok());
    }

    #[test]
    fn re_enqueue_pushes_back_when_destination_full() {
        let pool = ThreadPoolJobQueue::new("test-pool4", 1);
        let src = WorkQueue::new("src", Arc::clone(&pool) as Arc<dyn JobQueue>, 1, 8, &metrics());
        let dst = WorkQueue::new("dst", pool, 1, 1, &metrics());
        let _hold = dst.reserve().unwrap();
        match dst.re_enqueue(Box::new(|| {}), &src) {
            ReEnqueueOutcome::PushBack(_job) => {}
            ReEnqueueOutcome::Transferred => panic!("expected push-back"),
        }
    }
}
