use crate::error::{Error, Result};
use crate::message::ChunkMsg;
use array_model::Coordinates;
use chunk::MemChunk;
use std::collections::VecDeque;
use std::sync::{Arc, Weak};

/// A weak handle a stream keeps to its owning query, revalidated before
/// touching shared state from a reply (§9 redesign note: "callbacks hold a
/// lookup key plus the queue; on invoke, fetch the live query and bail if
/// it is gone" — generalizing the source's raw `Query*` callback capture).
/// `exec`'s `Query` implements this so scatter_gather itself never has to
/// know about query lifecycle.
pub trait QueryValidator: std::fmt::Debug + Send + Sync {
    fn validate(&self) -> Result<()>;
}

/// Per-(attribute, source stream) protocol state (§4.4). A position-only
/// reply resolves `position_peek` without a body; a full-fetch reply
/// appends to `body_queue`. `requested_position_only` prevents sending a
/// second position peek while one is already outstanding; `outstanding_full`
/// is the count of full-fetch requests sent but not yet replied to, bounded
/// by [`crate::PullSgArray`]'s prefetch window rather than capped at one
/// (§4.4 flow control: "the consumer grants a window of `prefetchSize`
/// chunks per (attr, stream)").
#[derive(Debug, Default)]
pub struct StreamState {
    pub requested_position_only: bool,
    pub outstanding_full: usize,
    pub position_peek: Option<Coordinates>,
    pub body_queue: VecDeque<Arc<MemChunk>>,
    pub eof: bool,
    pub curr_msg_id: u64,
    pub last_position_only_id: u64,
    pub last_remote_id: u64,
    pub error: Option<Error>,
}

impl StreamState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold an incoming reply into this stream's state (§4.4). A
    /// position-only reply that repeats the position already implied by
    /// the last one received is dropped rather than requeued — the
    /// consumer already has that information (§4.4: "redundant
    /// position-only dedup").
    pub fn handle_chunk_msg(&mut self, msg: ChunkMsg, query: &Weak<dyn QueryValidator>) -> Result<()> {
        match query.upgrade() {
            Some(q) => q.validate()?,
            None => return Err(Error::QueryGone),
        }

        self.curr_msg_id = msg.msg_id;
        self.last_remote_id = msg.msg_id;

        if msg.eof {
            self.eof = true;
            self.requested_position_only = false;
            self.outstanding_full = 0;
            return Ok(());
        }

        if let Some(chunk) = msg.chunk {
            self.body_queue.push_back(chunk);
            self.position_peek = None;
            self.outstanding_full = self.outstanding_full.saturating_sub(1);
            self.requested_position_only = false;
        } else {
            let pos = msg.position();
            if pos == self.position_peek {
                return Ok(());
            }
            self.position_peek = pos;
            self.last_position_only_id = msg.msg_id;
            self.requested_position_only = false;
        }
        Ok(())
    }

    /// Stash a remote-raised error so it surfaces on the next `nextChunk*`
    /// call rather than at the point the network event arrived (§7).
    pub fn stash_error(&mut self, attr_id: u32, stream: usize, message: String) {
        self.error = Some(Error::Remote { attr_id, stream, message });
    }

    pub fn take_error(&mut self) -> Option<Error> {
        self.error.take()
    }
}
