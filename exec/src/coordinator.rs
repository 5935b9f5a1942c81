//! The coordinator/worker notify+wait handshake for two-phase aggregation
//! (§4.7): workers compute a local result and notify; the coordinator waits
//! up to `deadlockTimeoutSec` per worker before building its proxy inputs
//! and running the final operator pass. A missing notification aborts the
//! query with a resource-busy error rather than hanging (§4 "the coordinator
//! enforces a start-up timeout during `notify`; missing worker notifications
//! raise a resource-busy error").
//!
//! Building the N proxy arrays themselves is `redistribute`/`scatter_gather`'s
//! job, not this module's — the coordinator only owns the synchronization
//! point between "workers have exposed their local results" and "run the
//! operator over them."

use crate::error::{Error, Result};
use crate::operator::PhysicalOperator;
use crate::query::Query;
use chunk::Array;
use clock::TimeProviderRef;
use std::sync::Arc;
use std::time::Duration;
use tracker::AsyncSemaphore;

/// One query's two-phase aggregation handshake state. Shared between the
/// coordinator (instance 0) and every worker's local execution via
/// [`AggregationCoordinator::worker_notify`]'s clone of the underlying
/// semaphore.
#[derive(Debug)]
pub struct AggregationCoordinator {
    ready: AsyncSemaphore,
    deadlock_timeout: Duration,
}

impl AggregationCoordinator {
    pub fn new(clock: TimeProviderRef, deadlock_timeout: Duration) -> Self {
        Self {
            ready: AsyncSemaphore::new(0, clock),
            deadlock_timeout,
        }
    }

    /// `mtNotify(queryId)`: a worker signals that its local aggregate result
    /// is ready for the coordinator to proxy.
    pub fn notify_ready(&self) {
        self.ready.release(1);
    }

    /// `mtWait(queryId)`: the coordinator waits for `num_workers`
    /// notifications, one `deadlockTimeoutSec`-bounded acquire per worker,
    /// matching the per-worker phrasing in §4.7 rather than one combined
    /// wait for every worker at once.
    pub async fn wait_for_workers(&self, num_workers: usize) -> Result<()> {
        for worker in 0..num_workers {
            self.ready
                .acquire_timeout(self.deadlock_timeout, &format!("worker-{worker}"))
                .await
                .map_err(Error::from)?;
        }
        Ok(())
    }
}

/// A worker's half of two-phase aggregation (§4.7): "Workers compute a local
/// result array, expose it to the coordinator via a remote-array context,
/// then wait." Exposing the result over SG is the caller's job; this just
/// runs the local pass and flips the notify signal once it's done.
pub async fn run_worker_phase(
    operator: &dyn PhysicalOperator,
    local_inputs: Vec<Arc<dyn Array>>,
    query: &Arc<Query>,
    coordinator: &AggregationCoordinator,
) -> Result<Arc<dyn Array>> {
    let local_result = operator.execute(local_inputs, query).await?;
    coordinator.notify_ready();
    Ok(local_result)
}

/// The coordinator's half (§4.7): "Coordinator builds N proxy arrays (one
/// per worker) and runs the physical operator with them as inputs." The
/// proxies are supplied by the caller (built over `redistribute`/SG once
/// every worker has notified); this function owns only the wait and the
/// final operator pass.
pub async fn run_coordinator_phase(
    operator: &dyn PhysicalOperator,
    proxies: Vec<Arc<dyn Array>>,
    query: &Arc<Query>,
    coordinator: &AggregationCoordinator,
    num_workers: usize,
) -> Result<Arc<dyn Array>> {
    coordinator.wait_for_workers(num_workers).await?;
    operator.execute(proxies, query).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryRegistry;
    use crate::sort_operator::SortOperator;
    use array_model::{ArrayDesc, ArrayId, AttributeDesc, Coordinates, DimensionDesc, PartitioningScheme, UnversionedArrayId};
    use chunk::{EmptyBitmap, MemArray, MemChunk, Payload, Value};
    use extsort::{ColumnComparator, SortConfig, SortKey};

    fn sort_op() -> SortOperator {
        SortOperator::new(
            Arc::new(ColumnComparator::new(vec![SortKey::ascending(0)])),
            SortConfig::default(),
            false,
        )
    }

    fn one_row_array(value: i64) -> Arc<dyn Array> {
        let desc = ArrayDesc::new(
            "A",
            UnversionedArrayId(1),
            ArrayId(1),
            0,
            vec![AttributeDesc::new(0, "v", "int64"), AttributeDesc::empty_indicator(1)],
            vec![DimensionDesc::new("i", 0, 0, 1, 0).unwrap()],
            PartitioningScheme::Replication,
        )
        .unwrap();
        let arr = MemArray::new(desc.clone());
        let mut chunk = MemChunk::new_for_position(&desc, 0, &Coordinates::new(vec![0]));
        chunk.set_payload(Payload::Dense(vec![Value::Int64(value)]));
        chunk.set_empty_bitmap(Arc::new(EmptyBitmap::new_all_full(1)));
        arr.insert_chunk(chunk);
        arr
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn coordinator_waits_until_every_worker_notifies() {
        let coordinator = Arc::new(AggregationCoordinator::new(clock::system(), Duration::from_secs(1)));
        let registry = QueryRegistry::new();
        let query = registry.start();
        let operator = sort_op();

        let local = run_worker_phase(&operator, vec![one_row_array(7)], &query, &coordinator)
            .await
            .unwrap();

        let c2 = Arc::clone(&coordinator);
        let worker = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            c2.notify_ready();
        });

        let combined = run_coordinator_phase(&operator, vec![local], &query, &coordinator, 2).await.unwrap();
        worker.await.unwrap();

        let mut it = combined.get_array_iterator(0);
        assert!(!it.end());
        query.finish();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn missing_worker_notification_times_out_as_resource_busy() {
        let coordinator = AggregationCoordinator::new(clock::system(), Duration::from_millis(20));
        let err = coordinator.wait_for_workers(1).await.unwrap_err();
        assert!(matches!(err, Error::ResourceBusy { .. }));
    }
}
