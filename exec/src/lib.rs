//! The operator execution skeleton (C7, §4.7): the `PhysicalOperator`
//! contract every plan node implements, the `Query` lifecycle that owns
//! locks/finalizers/error-handlers and backs `scatter_gather`'s
//! `QueryValidator`, and the coordinator/worker notify+wait handshake that
//! drives two-phase aggregation. `sort_operator`/`redistribute_operator`
//! wire `extsort` (C6) and `redistribute` (C5) into the contract as concrete
//! operators, the way every other plan node in a real deployment would.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(missing_debug_implementations, clippy::clone_on_ref_ptr)]

mod coordinator;
mod distribution;
mod error;
mod operator;
mod query;
mod redistribute_operator;
mod sort_operator;

pub use coordinator::{run_coordinator_phase, run_worker_phase, AggregationCoordinator};
pub use distribution::{ArrayDistribution, PhysicalBoundaries};
pub use error::{Error, Result};
pub use operator::PhysicalOperator;
pub use query::{Query, QueryHandle, QueryRegistry};
pub use redistribute_operator::RedistributeOperator;
pub use sort_operator::SortOperator;
