use crate::error::Result;
use crate::message::{FetchMsg, ObjType};
use crate::stream_state::{QueryValidator, StreamState};
use crate::transport::SgTransport;
use array_model::InstanceId;
use chunk::MemChunk;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use stream_array::{Poll, StreamArray};

/// Default chunks-per-stream prefetch window when the caller doesn't
/// override it via [`PullSgArray::with_prefetch_size`] (§4.4: "prefetchSize
/// defaults to a global receive-queue-size config").
const DEFAULT_PREFETCH_SIZE: usize = 8;

/// Always-live [`QueryValidator`] for callers that don't wire a real query
/// lifecycle (unit tests, or a one-shot SG pull with no cancellation path).
#[derive(Debug)]
pub struct AlwaysLiveQuery;

impl QueryValidator for AlwaysLiveQuery {
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// One SG consumer stream (§4.4): the producer-facing half of
/// `stream_array::StreamArray`, implemented by fetching over an
/// [`SgTransport`] instead of reading a chunk iterator directly. One
/// `PullSgArray` represents a single source instance's contribution to one
/// attribute set; `stream_array::MultiStreamArray` merges many of these.
/// Keeps up to a `prefetch_size`-bounded window of full-fetch requests
/// outstanding per attribute so a slow round trip on one attribute doesn't
/// stall the others (§4.4 flow control).
pub struct PullSgArray {
    stream: usize,
    #[allow(dead_code)]
    local_instance: InstanceId,
    transport: Arc<dyn SgTransport>,
    query_id: trace::QueryId,
    query: Weak<dyn QueryValidator>,
    obj_type: ObjType,
    state: Mutex<HashMap<u32, StreamState>>,
    prefetch_size: usize,
}

impl std::fmt::Debug for PullSgArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PullSgArray")
            .field("stream", &self.stream)
            .field("query_id", &self.query_id)
            .finish()
    }
}

impl PullSgArray {
    pub fn new(
        stream: usize,
        local_instance: InstanceId,
        transport: Arc<dyn SgTransport>,
        query_id: trace::QueryId,
        query: Weak<dyn QueryValidator>,
        obj_type: ObjType,
    ) -> Self {
        Self {
            stream,
            local_instance,
            transport,
            query_id,
            query,
            obj_type,
            state: Mutex::new(HashMap::new()),
            prefetch_size: DEFAULT_PREFETCH_SIZE,
        }
    }

    /// Override the per-stream prefetch window (§4.4 "the consumer grants a
    /// window of `prefetchSize` chunks per (attr, stream)"); the effective
    /// window for a given attribute is this value divided by the number of
    /// attributes currently being pulled concurrently on this stream (§4.4
    /// "reduced per attribute by the number of concurrently requested
    /// attributes").
    pub fn with_prefetch_size(mut self, prefetch_size: usize) -> Self {
        self.prefetch_size = prefetch_size.max(1);
        self
    }

    /// This attribute's share of the prefetch window, given how many
    /// attributes currently have live state on this stream.
    fn window_for(&self, states: &HashMap<u32, StreamState>) -> usize {
        let active = states.len().max(1);
        (self.prefetch_size / active).max(1)
    }

    async fn ensure_position_request(&self, attr_id: u32) -> Result<()> {
        let already_sent = {
            let mut states = self.state.lock();
            let st = states.entry(attr_id).or_insert_with(StreamState::new);
            if st.requested_position_only || st.outstanding_full > 0 || st.position_peek.is_some()
                || !st.body_queue.is_empty() || st.eof
            {
                true
            } else {
                st.requested_position_only = true;
                false
            }
        };
        if already_sent {
            return Ok(());
        }
        self.transport
            .send_fetch(
                FetchMsg { attribute_id: attr_id, position_only: true, obj_type: self.obj_type, query_id: self.query_id },
                self.stream,
            )
            .await
    }

    /// Top up this attribute's outstanding full-fetch requests up to its
    /// share of the prefetch window (§4.4 flow control), issuing as many
    /// `FetchMsg`s in a row as the window still has room for instead of
    /// serializing one fetch/reply round trip at a time.
    async fn ensure_full_request(&self, attr_id: u32) -> Result<()> {
        loop {
            let should_send = {
                let mut states = self.state.lock();
                let window = self.window_for(&states);
                let st = states.entry(attr_id).or_insert_with(StreamState::new);
                if st.eof || st.outstanding_full >= window {
                    false
                } else {
                    st.outstanding_full += 1;
                    true
                }
            };
            if !should_send {
                return Ok(());
            }
            self.transport
                .send_fetch(
                    FetchMsg { attribute_id: attr_id, position_only: false, obj_type: self.obj_type, query_id: self.query_id },
                    self.stream,
                )
                .await?;
        }
    }

    async fn drain_one_reply(&self, attr_id: u32) -> Result<bool> {
        match self.transport.try_recv(attr_id, self.stream).await? {
            None => Ok(false),
            Some(msg) => {
                let mut states = self.state.lock();
                let st = states.entry(attr_id).or_insert_with(StreamState::new);
                st.handle_chunk_msg(msg, &self.query)?;
                Ok(true)
            }
        }
    }
}

#[async_trait::async_trait]
impl StreamArray for PullSgArray {
    async fn next_position(&mut self, attr_id: u32) -> stream_array::Result<stream_array::Poll<Option<array_model::Coordinates>>> {
        {
            let mut states = self.state.lock();
            let st = states.entry(attr_id).or_insert_with(StreamState::new);
            if let Some(err) = st.take_error() {
                return Err(to_stream_array_error(err));
            }
            if let Some(c) = st.body_queue.front() {
                return Ok(Poll::Ready(Some(c.first_pos().clone())));
            }
            if let Some(p) = st.position_peek.clone() {
                return Ok(Poll::Ready(Some(p)));
            }
            if st.eof {
                return Ok(Poll::Ready(None));
            }
        }

        self.ensure_position_request(attr_id).await.map_err(to_stream_array_error)?;
        match self.drain_one_reply(attr_id).await.map_err(to_stream_array_error)? {
            false => Ok(Poll::Retry),
            true => {
                let states = self.state.lock();
                let st = states.get(&attr_id).expect("initialized above");
                if let Some(c) = st.body_queue.front() {
                    Ok(Poll::Ready(Some(c.first_pos().clone())))
                } else if let Some(p) = st.position_peek.clone() {
                    Ok(Poll::Ready(Some(p)))
                } else if st.eof {
                    Ok(Poll::Ready(None))
                } else {
                    Ok(Poll::Retry)
                }
            }
        }
    }

    async fn next_chunk_body(&mut self, attr_id: u32) -> stream_array::Result<Arc<MemChunk>> {
        loop {
            {
                let mut states = self.state.lock();
                let st = states.entry(attr_id).or_insert_with(StreamState::new);
                if let Some(err) = st.take_error() {
                    return Err(to_stream_array_error(err));
                }
                if let Some(c) = st.body_queue.pop_front() {
                    return Ok(c);
                }
            }
            self.ensure_full_request(attr_id).await.map_err(to_stream_array_error)?;
            if !self.drain_one_reply(attr_id).await.map_err(to_stream_array_error)? {
                tokio::task::yield_now().await;
            }
        }
    }
}

fn to_stream_array_error(e: crate::error::Error) -> stream_array::Error {
    stream_array::Error::Transport { source: Box::new(e) }
}
