//! Pull-based chunk exchange between instances (C4, §4.4): the SG wire
//! message shapes ([`message`]), per-(attribute, stream) flow-control state
//! ([`stream_state`]), the transport seam ([`transport::SgTransport`]), the
//! non-blocking [`pull_sg_array::PullSgArray`] stream, and
//! [`blocking::PullSgArrayBlocking`]'s cooperative drain loop on top of it.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(missing_debug_implementations, clippy::clone_on_ref_ptr)]

mod blocking;
mod error;
mod message;
mod pull_sg_array;
mod stream_state;
mod transport;

pub use blocking::PullSgArrayBlocking;
pub use error::{Error, Result};
pub use message::{ChunkMsg, CompressionMethod, FetchMsg, ObjType};
pub use pull_sg_array::{AlwaysLiveQuery, PullSgArray};
pub use stream_state::{QueryValidator, StreamState};
pub use transport::SgTransport;
