use crate::error::{Poll, Result};
use array_model::Coordinates;
use chunk::MemChunk;
use std::sync::Arc;

/// A single-pass, one-chunk-per-call producer of one attribute's chunks,
/// typically backed by one remote instance (§4.3). Position peeking is
/// split from the chunk pull itself so `MultiStreamArray` can compare
/// positions across many streams before committing to fetch any bodies.
#[async_trait::async_trait]
pub trait StreamArray: std::fmt::Debug + Send + Sync {
    /// Peek the position of the next chunk this stream would produce for
    /// `attr_id`, without consuming its body. `Poll::Retry` when the
    /// stream's position hasn't resolved yet (e.g. awaiting a network
    /// round trip) — the caller must retry later rather than treating this
    /// as EOF (§4.3 step 1). `Poll::Ready(None)` is EOF.
    async fn next_position(&mut self, attr_id: u32) -> Result<Poll<Option<Coordinates>>>;

    /// Pull the chunk body at the position last returned by
    /// `next_position` for `attr_id`. Calling this before `next_position`
    /// has returned `Ready(Some(_))` for the same attribute is a caller
    /// error (`Error::PositionNotResolved`).
    async fn next_chunk_body(&mut self, attr_id: u32) -> Result<Arc<MemChunk>>;
}
