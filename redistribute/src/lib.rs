//! Partitioning-scheme transition plumbing (C5, §4.5): `redistribute`
//! itself is just an SG producing `toScheme` (scatter_gather's job); this
//! crate is the three materializing variants built on top of a
//! [`scatter_gather::PullSgArrayBlocking`] — [`ops::redistribute_to_array`],
//! [`ops::redistribute_aggregate`], and
//! [`ops::redistribute_to_random_access`] — plus the destination chunk-merge
//! rule ([`merge_at_destination`]) and the aggregate-function hook
//! ([`aggregate::AggregateMerge`]) they share.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(missing_debug_implementations, clippy::clone_on_ref_ptr)]

pub mod aggregate;
pub mod error;
pub mod merge_at_destination;
pub mod ops;

pub use aggregate::{AggregateMerge, CountMerge, MaxMerge, SumMerge};
pub use error::{Error, Result};
pub use merge_at_destination::{merge_at_destination as merge_chunk_at_destination, BitmapCache};
pub use ops::{redistribute_aggregate, redistribute_to_array, redistribute_to_random_access};
