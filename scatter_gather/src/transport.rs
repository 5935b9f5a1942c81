use crate::error::Result;
use crate::message::{ChunkMsg, FetchMsg};

/// The network boundary a [`crate::PullSgArray`] pulls through. Splits
/// sending a request from observing its reply so the stream can
/// cooperatively yield (`Poll::Retry`) instead of blocking a thread on the
/// round trip (§4.4, §9 redesign note on replacing coroutine-style
/// iteration with a poll loop).
#[async_trait::async_trait]
pub trait SgTransport: std::fmt::Debug + Send + Sync {
    /// Send a fetch request for `(attribute_id, stream)` to its source
    /// instance. Idempotent while a request for the same pair is already
    /// outstanding.
    async fn send_fetch(&self, req: FetchMsg, stream: usize) -> Result<()>;

    /// Non-blocking poll for the next reply to `(attribute_id, stream)`.
    /// `Ok(None)` means no reply has arrived yet — the caller should
    /// report `Poll::Retry` rather than wait here.
    async fn try_recv(&self, attribute_id: u32, stream: usize) -> Result<Option<ChunkMsg>>;
}
