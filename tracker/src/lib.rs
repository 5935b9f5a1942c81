//! Utilities for tracking and scheduling resource-bounded work within the
//! execution engine (C8): the `WorkQueue`/`SerializationCtx` pair from
//! §4.8, plus the coordinator/worker notify+wait handshake primitives
//! (`AsyncSemaphore`, `SyncCtx`) used by `exec` (§4.7) and `scatter_gather`
//! (§4.4).
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(
    missing_debug_implementations,
    clippy::explicit_iter_loop,
    clippy::use_self,
    clippy::clone_on_ref_ptr,
    clippy::future_not_send
)]

mod async_semaphore;
mod error;
mod lock;
mod task;

pub use async_semaphore::{AsyncSemaphore, SyncCtx};
pub use error::{Error, Result};
pub use lock::SerializationCtx;
pub use task::{Job, JobQueue, ReEnqueueOutcome, Reservation, ThreadPoolJobQueue, WorkQueue};
