//! A concrete `PhysicalOperator` wrapping `redistribute` (§4.5): drains an
//! already-built SG pull stream into a fresh random-access `MemArray`. The
//! pull stream itself is built by the caller (choosing the transport,
//! wiring per-(attribute, stream) state) — this operator owns only the
//! "redistribute changes the distribution" bookkeeping §4.7 expects from
//! any operator and the actual drain-and-materialize step.
//!
//! Real redistribute input is a live SG stream, not a materialized `Array`,
//! so unlike [`crate::sort_operator::SortOperator`] this operator ignores
//! `execute`'s `inputs` and reads from the stream captured at construction
//! instead (§4.5 "redistributeToRandomAccess": the whole point is to
//! produce random access regardless of the input's own access mode).

use crate::distribution::{ArrayDistribution, PhysicalBoundaries};
use crate::error::{PullSnafu, RedistributeSnafu, Result};
use crate::operator::PhysicalOperator;
use crate::query::Query;
use array_model::ArrayDesc;
use async_trait::async_trait;
use chunk::Array;
use parking_lot::Mutex;
use scatter_gather::PullSgArrayBlocking;
use snafu::ResultExt;
use std::sync::Arc;

#[derive(Debug)]
pub struct RedistributeOperator {
    desc: ArrayDesc,
    target: ArrayDistribution,
    pull: Mutex<Option<PullSgArrayBlocking>>,
}

impl RedistributeOperator {
    pub fn new(desc: ArrayDesc, target: ArrayDistribution, pull: PullSgArrayBlocking) -> Self {
        Self { desc, target, pull: Mutex::new(Some(pull)) }
    }
}

#[async_trait]
impl PhysicalOperator for RedistributeOperator {
    fn requires_redistribute(&self, _input_schemas: &[ArrayDesc]) -> Vec<ArrayDistribution> {
        vec![self.target]
    }

    fn output_distribution(&self, _inputs: &[Arc<dyn Array>], _schemas: &[ArrayDesc]) -> ArrayDistribution {
        self.target
    }

    fn output_boundaries(&self, input_bounds: &[PhysicalBoundaries], _schemas: &[ArrayDesc]) -> PhysicalBoundaries {
        input_bounds
            .first()
            .cloned()
            .unwrap_or_else(|| PhysicalBoundaries::unbounded(self.desc.num_dims()))
    }

    fn changes_distribution(&self, _schemas: &[ArrayDesc]) -> bool {
        true
    }

    fn output_full_chunks(&self, _schemas: &[ArrayDesc]) -> bool {
        true
    }

    async fn execute(&self, _inputs: Vec<Arc<dyn Array>>, query: &Arc<Query>) -> Result<Arc<dyn Array>> {
        scatter_gather::QueryValidator::validate(query.as_ref()).context(PullSnafu)?;
        let mut pull = self
            .pull
            .lock()
            .take()
            .expect("RedistributeOperator::execute called more than once");
        let out = redistribute::redistribute_to_random_access(&mut pull, &self.desc)
            .await
            .context(RedistributeSnafu)?;
        Ok(out as Arc<dyn Array>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryRegistry;
    use array_model::{
        ArrayId, AttributeDesc, Coordinates, DimensionDesc, InstanceId, PartitioningScheme,
        UnversionedArrayId,
    };
    use chunk::{EmptyBitmap, MemChunk, Payload, Value};
    use scatter_gather::{ChunkMsg, CompressionMethod, ObjType, PullSgArray};
    use std::sync::atomic::{AtomicI64, Ordering};
    use tracker::SyncCtx;

    fn desc() -> ArrayDesc {
        ArrayDesc::new(
            "A",
            UnversionedArrayId(1),
            ArrayId(1),
            0,
            vec![AttributeDesc::new(0, "v", "int64")],
            vec![DimensionDesc::new("i", 0, 3, 4, 0).unwrap()],
            PartitioningScheme::Replication,
        )
        .unwrap()
    }

    #[derive(Debug)]
    struct OneShotTransport {
        remaining: AtomicI64,
    }

    #[async_trait::async_trait]
    impl scatter_gather::SgTransport for OneShotTransport {
        async fn send_fetch(&self, _req: scatter_gather::FetchMsg, _stream: usize) -> scatter_gather::Result<()> {
            Ok(())
        }

        async fn try_recv(&self, attribute_id: u32, dest_stream: usize) -> scatter_gather::Result<Option<ChunkMsg>> {
            let remaining = self.remaining.fetch_sub(1, Ordering::SeqCst);
            if remaining <= 0 {
                return Ok(Some(ChunkMsg {
                    msg_id: 0,
                    attribute_id,
                    source_instance: InstanceId(0),
                    dest_stream,
                    chunk: None,
                    compression_method: CompressionMethod::None,
                    decompressed_size: 0,
                    coordinates: None,
                    next_coordinates: None,
                    count: 0,
                    sparse_flag: false,
                    rle_flag: false,
                    eof: true,
                    warnings: vec![],
                    obj_type: ObjType::RemoteArrayMerge,
                    launch_id: 0,
                }));
            }
            let mut chunk = MemChunk::new_for_position(&desc(), attribute_id, &Coordinates::new(vec![0]));
            chunk.set_payload(Payload::Dense(vec![Value::Int64(42)]));
            let mut bitmap = EmptyBitmap::new_all_empty(1);
            bitmap.set_live(0, true);
            chunk.set_empty_bitmap(Arc::new(bitmap));
            Ok(Some(ChunkMsg {
                msg_id: remaining as u64,
                attribute_id,
                source_instance: InstanceId(0),
                dest_stream,
                chunk: Some(Arc::new(chunk)),
                compression_method: CompressionMethod::None,
                decompressed_size: 0,
                coordinates: Some(Coordinates::new(vec![0])),
                next_coordinates: None,
                count: 0,
                sparse_flag: false,
                rle_flag: false,
                eof: false,
                warnings: vec![],
                obj_type: ObjType::RemoteArrayMerge,
                launch_id: 0,
            }))
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn execute_materializes_the_redistributed_stream() {
        let registry = QueryRegistry::new();
        let query = registry.start();
        let validator: Arc<dyn scatter_gather::QueryValidator> = Arc::new(scatter_gather::AlwaysLiveQuery);
        let transport = Arc::new(OneShotTransport { remaining: AtomicI64::new(1) });
        let inner = PullSgArray::new(0, InstanceId(1), transport, trace::QueryId::new(1), Arc::downgrade(&validator), ObjType::RemoteArrayMerge);
        let pull = PullSgArrayBlocking::new(inner, SyncCtx::new());

        let operator = RedistributeOperator::new(
            desc(),
            ArrayDistribution::new(PartitioningScheme::LocalInstance),
            pull,
        );
        let out = operator.execute(vec![], &query).await.unwrap();
        let mut it = out.get_array_iterator(0);
        assert!(!it.end());
        let chunk = it.get_chunk();
        let mem = chunk.as_any().downcast_ref::<MemChunk>().unwrap();
        assert_eq!(mem.payload().get(0), Some(Value::Int64(42)));
        query.finish();
    }
}
