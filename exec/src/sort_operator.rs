//! A concrete `PhysicalOperator`: external sort (§4.6) wired into the
//! execution skeleton. `extsort::external_sort` schedules its own jobs on a
//! thread pool and blocks the calling thread until the scheduler loop drains,
//! so `execute` hands it to `spawn_blocking` rather than running it directly
//! on the async executor (§4.7 "execute(inputArrays, query) -> Array:
//! pipeline or materialized" — this operator is fully materialized).

use crate::distribution::{ArrayDistribution, PhysicalBoundaries};
use crate::error::{Result, SortSnafu};
use crate::operator::PhysicalOperator;
use crate::query::Query;
use array_model::{ArrayDesc, PartitioningScheme};
use async_trait::async_trait;
use chunk::Array;
use extsort::{SortConfig, TupleComparator};
use snafu::ResultExt;
use std::sync::Arc;

#[derive(Debug)]
pub struct SortOperator {
    comparator: Arc<dyn TupleComparator>,
    config: SortConfig,
    preserve_positions: bool,
}

impl SortOperator {
    pub fn new(comparator: Arc<dyn TupleComparator>, config: SortConfig, preserve_positions: bool) -> Self {
        Self { comparator, config, preserve_positions }
    }
}

#[async_trait]
impl PhysicalOperator for SortOperator {
    fn requires_redistribute(&self, _input_schemas: &[ArrayDesc]) -> Vec<ArrayDistribution> {
        // Sort reads whatever partitioning the input already has; the merge
        // happens entirely within each partition's local sort job, and the
        // final runs are merged locally (§4.6 doesn't require a scheme
        // transition up front).
        vec![ArrayDistribution::new(PartitioningScheme::Undefined)]
    }

    fn output_distribution(&self, _inputs: &[Arc<dyn Array>], _schemas: &[ArrayDesc]) -> ArrayDistribution {
        ArrayDistribution::new(PartitioningScheme::LocalInstance)
    }

    fn output_boundaries(&self, input_bounds: &[PhysicalBoundaries], _schemas: &[ArrayDesc]) -> PhysicalBoundaries {
        input_bounds
            .iter()
            .cloned()
            .reduce(|a, b| a.union(&b))
            .unwrap_or_else(|| PhysicalBoundaries::unbounded(1))
    }

    fn changes_distribution(&self, _schemas: &[ArrayDesc]) -> bool {
        true
    }

    fn output_full_chunks(&self, _schemas: &[ArrayDesc]) -> bool {
        true
    }

    async fn execute(&self, inputs: Vec<Arc<dyn Array>>, _query: &Arc<Query>) -> Result<Arc<dyn Array>> {
        let input = inputs.into_iter().next().expect("sort takes exactly one input");
        let comparator = Arc::clone(&self.comparator);
        let config = self.config;
        let preserve_positions = self.preserve_positions;

        let out = tokio::task::spawn_blocking(move || {
            extsort::external_sort(input, comparator, config, preserve_positions)
        })
        .await
        .expect("sort job panicked")
        .context(SortSnafu)?;

        Ok(out as Arc<dyn Array>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryRegistry;
    use array_model::{ArrayId, AttributeDesc, Coordinates, DimensionDesc, UnversionedArrayId};
    use chunk::{EmptyBitmap, MemArray, MemChunk, Payload, Value};
    use extsort::{ColumnComparator, SortConfig, SortKey};

    fn input_array() -> Arc<dyn Array> {
        let desc = ArrayDesc::new(
            "A",
            UnversionedArrayId(1),
            ArrayId(1),
            0,
            vec![AttributeDesc::new(0, "v", "int64"), AttributeDesc::empty_indicator(1)],
            vec![DimensionDesc::new("i", 0, 4, 5, 0).unwrap()],
            PartitioningScheme::Replication,
        )
        .unwrap();
        let arr = MemArray::new(desc.clone());
        let values = [3i64, 1, 4, 1, 5];
        let mut chunk = MemChunk::new_for_position(&desc, 0, &Coordinates::new(vec![0]));
        chunk.set_payload(Payload::Dense(values.iter().map(|v| Value::Int64(*v)).collect()));
        chunk.set_empty_bitmap(Arc::new(EmptyBitmap::new_all_full(values.len())));
        arr.insert_chunk(chunk);
        arr
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn sort_ascending_matches_scenario_one() {
        let registry = QueryRegistry::new();
        let query = registry.start();
        let operator = SortOperator::new(
            Arc::new(ColumnComparator::new(vec![SortKey::ascending(0)])),
            SortConfig::default(),
            false,
        );

        let out = operator.execute(vec![input_array()], &query).await.unwrap();
        let mut it = out.get_array_iterator(0);
        let mut values = Vec::new();
        while !it.end() {
            let chunk = it.get_chunk();
            let mem = chunk.as_any().downcast_ref::<MemChunk>().unwrap();
            for v in mem.payload().to_dense() {
                values.push(v.as_int64().unwrap());
            }
            it.advance();
        }
        assert_eq!(values, vec![1, 1, 3, 4, 5]);
        query.finish();
    }
}
