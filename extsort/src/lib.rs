//! External sort engine (C6, §4.6): partition an input array round-robin
//! into `numJobs` sort jobs, accumulate each partition into a `TupleArray`
//! until `memLimit` is reached and spill a sorted run, merge runs down with
//! `MergeSortArray` whenever the pipeline backs up past `nStreams`, and
//! materialize the final run into a `MemArray`. The scheduler loop drives
//! both sort and merge jobs through `tracker`'s `WorkQueue`, matching the
//! rest of the execution core's use of C8 for bounded asynchronous work.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(missing_debug_implementations, clippy::clone_on_ref_ptr)]

mod config;
mod engine;
mod error;
mod merge_sort_array;
mod tuple;
mod tuple_array;

pub use config::SortConfig;
pub use engine::external_sort;
pub use error::{Error, Result};
pub use merge_sort_array::MergeSortArray;
pub use tuple::{estimate_row_footprint, ColumnComparator, SortKey, Tuple, TupleComparator};
pub use tuple_array::TupleArray;
