//! `PhysicalOperator` (§4.7): the contract every plan node implements.
//! `execute` is `async` because real operators pull through `scatter_gather`
//! or block on `tracker`'s handshake primitives, matching the rest of the
//! workspace's `async_trait` convention for IO-bound capability traits.

use crate::distribution::{ArrayDistribution, PhysicalBoundaries};
use crate::error::Result;
use crate::query::Query;
use array_model::ArrayDesc;
use async_trait::async_trait;
use chunk::Array;
use std::sync::Arc;

/// One plan node, instantiated per query with its schema, parameters, and
/// input schemas already bound (§4.7). Implementors are expected to be
/// stateless beyond their construction-time parameters; all per-query state
/// lives on the [`Query`] passed to `execute`.
#[async_trait]
pub trait PhysicalOperator: std::fmt::Debug + Send + Sync {
    /// Declared input requirements, one per input schema (§4.7
    /// `requiresRedistribute`).
    fn requires_redistribute(&self, input_schemas: &[ArrayDesc]) -> Vec<ArrayDistribution>;

    /// Declared output partitioning given the (already redistributed)
    /// inputs (§4.7 `getOutputDistribution`).
    fn output_distribution(&self, inputs: &[Arc<dyn Array>], schemas: &[ArrayDesc]) -> ArrayDistribution;

    /// A conservative cell-space bounding box for the output, derived from
    /// each input's boundaries (§4.7 `getOutputBoundaries`).
    fn output_boundaries(&self, input_bounds: &[PhysicalBoundaries], schemas: &[ArrayDesc]) -> PhysicalBoundaries;

    /// Whether this operator changes its inputs' partitioning scheme on the
    /// way to its output (§4.7 `changesDistribution`).
    fn changes_distribution(&self, schemas: &[ArrayDesc]) -> bool;

    /// Whether every chunk this operator emits is guaranteed full (no
    /// partial/short chunks at plan boundaries) (§4.7 `outputFullChunks`).
    fn output_full_chunks(&self, schemas: &[ArrayDesc]) -> bool;

    /// Run the operator, pipelined or fully materialized, against its
    /// already-redistributed inputs (§4.7 `execute`).
    async fn execute(&self, inputs: Vec<Arc<dyn Array>>, query: &Arc<Query>) -> Result<Arc<dyn Array>>;

    /// Coordinator-only hook run before `execute` (§4.7
    /// `preSingleExecute`). Most operators don't need it.
    fn pre_single_execute(&self, _query: &Arc<Query>) -> Result<()> {
        Ok(())
    }

    /// Coordinator-only hook run after `execute` (§4.7 `postSingleExecute`).
    fn post_single_execute(&self, _query: &Arc<Query>) -> Result<()> {
        Ok(())
    }

    /// Tags an operator for the two-phase aggregation path in
    /// [`crate::coordinator`] (§4.7 "operators tagged `isAgg`").
    fn is_agg(&self) -> bool {
        false
    }
}
