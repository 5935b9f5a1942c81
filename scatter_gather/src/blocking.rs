//! `PullSgArrayBlocking::pull_attributes` (§4.4): the cooperative drain loop
//! layered on top of the non-blocking [`crate::PullSgArray`] core. Each round
//! attempts one chunk per still-active attribute; an attribute that's not
//! ready (`Poll::Retry`) is carried to the next round instead of blocking.
//! Only once a whole round makes no progress does the loop block on a
//! [`tracker::SyncCtx`], woken the next time any per-attribute callback
//! fires (§4.4: "block on a `SyncCtx` until a callback signals one of
//! them").

use crate::pull_sg_array::PullSgArray;
use chunk::MemChunk;
use std::sync::Arc;
use stream_array::{Poll, StreamArray};
use tracker::SyncCtx;

/// Blocking wrapper around one [`PullSgArray`]: owns it exclusively so
/// `pull_attributes` can drive `&mut self` across the attributes it's asked
/// to pull together (§4.4 "for `SINGLE_PASS` input, all attributes must be
/// pulled together in horizontal-iteration order").
#[derive(Debug)]
pub struct PullSgArrayBlocking {
    inner: PullSgArray,
    sync_ctx: Arc<SyncCtx>,
}

impl PullSgArrayBlocking {
    pub fn new(inner: PullSgArray, sync_ctx: Arc<SyncCtx>) -> Self {
        Self { inner, sync_ctx }
    }

    /// Drive `attrs` until every one has reached EOF, invoking `on_chunk`
    /// for each body pulled. An attribute that reaches EOF is dropped from
    /// the active set; the loop ends once the active set is empty.
    pub async fn pull_attributes(
        &mut self,
        attrs: &[u32],
        mut on_chunk: impl FnMut(u32, Arc<MemChunk>) -> stream_array::Result<()>,
    ) -> stream_array::Result<()> {
        let mut active: Vec<u32> = attrs.to_vec();

        while !active.is_empty() {
            let mut made_progress = false;
            let mut still_active = Vec::with_capacity(active.len());

            for attr_id in active.drain(..) {
                match self.inner.next_position(attr_id).await? {
                    Poll::Retry => still_active.push(attr_id),
                    Poll::Ready(None) => {
                        // EOF: this attribute drops out of the active set.
                    }
                    Poll::Ready(Some(_)) => {
                        made_progress = true;
                        let chunk = self.inner.next_chunk_body(attr_id).await?;
                        on_chunk(attr_id, chunk)?;
                        still_active.push(attr_id);
                    }
                }
            }

            active = still_active;
            if !made_progress && !active.is_empty() {
                self.sync_ctx.wait().await;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ObjType;
    use crate::pull_sg_array::AlwaysLiveQuery;
    use crate::transport::SgTransport;
    use array_model::InstanceId;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// A transport that replies with exactly `n_chunks` chunk bodies for
    /// attribute 0 then EOF, modeling the single-producer happy path.
    #[derive(Debug)]
    struct FixedTransport {
        remaining: std::sync::atomic::AtomicI64,
    }

    #[async_trait::async_trait]
    impl SgTransport for FixedTransport {
        async fn send_fetch(&self, _req: crate::message::FetchMsg, _stream: usize) -> crate::error::Result<()> {
            Ok(())
        }

        async fn try_recv(
            &self,
            attribute_id: u32,
            dest_stream: usize,
        ) -> crate::error::Result<Option<crate::message::ChunkMsg>> {
            let remaining = self.remaining.fetch_sub(1, Ordering::SeqCst);
            if remaining <= 0 {
                return Ok(Some(crate::message::ChunkMsg {
                    msg_id: 0,
                    attribute_id,
                    source_instance: InstanceId(0),
                    dest_stream,
                    chunk: None,
                    compression_method: crate::message::CompressionMethod::None,
                    decompressed_size: 0,
                    coordinates: None,
                    next_coordinates: None,
                    count: 0,
                    sparse_flag: false,
                    rle_flag: false,
                    eof: true,
                    warnings: vec![],
                    obj_type: ObjType::RemoteArrayMerge,
                    launch_id: 0,
                }));
            }
            Ok(Some(crate::message::ChunkMsg {
                msg_id: remaining as u64,
                attribute_id,
                source_instance: InstanceId(0),
                dest_stream,
                chunk: Some(Arc::new(MemChunk::new(
                    array_model::Address::new(attribute_id, array_model::Coordinates::new(vec![0])),
                    array_model::Coordinates::new(vec![0]),
                    array_model::Coordinates::new(vec![9]),
                    array_model::Coordinates::new(vec![0]),
                    array_model::Coordinates::new(vec![9]),
                    chunk::Payload::Dense(Vec::new()),
                    None,
                ))),
                compression_method: crate::message::CompressionMethod::None,
                decompressed_size: 0,
                coordinates: Some(array_model::Coordinates::new(vec![0])),
                next_coordinates: None,
                count: 0,
                sparse_flag: false,
                rle_flag: false,
                eof: false,
                warnings: vec![],
                obj_type: ObjType::RemoteArrayMerge,
                launch_id: 0,
            }))
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn drains_every_chunk_before_reaching_eof() {
        let transport = Arc::new(FixedTransport {
            remaining: std::sync::atomic::AtomicI64::new(3),
        });
        let query: Arc<dyn crate::stream_state::QueryValidator> = Arc::new(AlwaysLiveQuery);
        let pull = PullSgArray::new(
            0,
            InstanceId(1),
            transport,
            trace::QueryId::new(1),
            Arc::downgrade(&query),
            ObjType::RemoteArrayMerge,
        );
        let mut blocking = PullSgArrayBlocking::new(pull, SyncCtx::new());
        let received = Arc::new(AtomicUsize::new(0));
        let received2 = Arc::clone(&received);
        blocking
            .pull_attributes(&[0], move |_attr, _chunk| {
                received2.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await
            .unwrap();
        assert_eq!(received.load(Ordering::SeqCst), 3);
    }
}
