//! Per-attribute pull streams (C3): the `StreamArray` capability and the
//! `MultiStreamArray` merge that assembles one globally-ordered local array
//! out of many remote streams (§4.3).
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(missing_debug_implementations, clippy::clone_on_ref_ptr)]

mod error;
mod merge;
mod multi_stream;
mod stream;

pub use error::{Error, Poll, Result};
pub use merge::merge_chunks;
pub use multi_stream::{DestinationFn, MultiStreamArray};
pub use stream::StreamArray;
