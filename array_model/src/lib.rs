//! The data model shared by every other crate in the workspace: coordinates,
//! dimension/attribute descriptors, array descriptors, and the closed set of
//! partitioning schemes (§3 of the spec). Nothing in here touches storage,
//! iteration, or the network — it is the vocabulary the rest of the engine
//! is built from, the way `schema`/`data_types` underlie the rest of the
//! teacher's query stack without themselves doing any I/O.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(missing_debug_implementations, clippy::clone_on_ref_ptr)]

mod address;
mod attribute;
mod coordinates;
mod dimension;
mod error;
mod instance;
mod schema;

pub use address::Address;
pub use attribute::AttributeDesc;
pub use coordinates::Coordinates;
pub use dimension::DimensionDesc;
pub use error::{Error, Result};
pub use instance::InstanceId;
pub use schema::{ArrayDesc, ArrayId, PartitioningScheme, UnversionedArrayId};
