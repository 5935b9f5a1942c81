use array_model::Coordinates;
use snafu::Snafu;

/// User/system errors surfaced by a stream (§7: "Any `scidb::Exception`
/// received via a message is stored in the per-stream state and raised on
/// the next `nextChunk*` call"). `Retry` is deliberately *not* a member of
/// this enum: it is the cooperative control-flow signal from §4.3 step 1,
/// absorbed by the scheduler, never a user-visible failure (§7, §9).
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("stream raised an error at position {pos}: {source}"))]
    Upstream { pos: Coordinates, source: chunk::Error },

    #[snafu(display("chunk requested before its position was resolved for attribute {attr_id}"))]
    PositionNotResolved { attr_id: u32 },

    #[snafu(display("transport error: {source}"))]
    Transport { source: Box<dyn std::error::Error + Send + Sync> },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A poll result that distinguishes "not ready yet, try again" from a real
/// value, replacing the source's `RetryException` control-flow exception
/// (§4.3 step 1, §9 redesign note).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Poll<T> {
    Ready(T),
    Retry,
}

impl<T> Poll<T> {
    pub fn is_retry(&self) -> bool {
        matches!(self, Poll::Retry)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Poll<U> {
        match self {
            Poll::Ready(v) => Poll::Ready(f(v)),
            Poll::Retry => Poll::Retry,
        }
    }
}
