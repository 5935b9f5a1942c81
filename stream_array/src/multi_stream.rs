use crate::error::{Poll, Result};
use crate::merge::merge_chunks;
use crate::stream::StreamArray;
use array_model::{ArrayDesc, Coordinates, InstanceId};
use chunk::MemChunk;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Maps a chunk position to the instance that owns it under the
/// destination partitioning scheme (§4.3 step 3).
pub type DestinationFn = Arc<dyn Fn(&Coordinates) -> InstanceId + Send + Sync>;

#[derive(Default)]
struct AttrState {
    /// Stream indices whose next position for this attribute hasn't been
    /// resolved yet (§4.3: "a list of not-ready streams").
    not_ready: Vec<usize>,
    /// Ready positions and the stream indices contributing at each (§4.3:
    /// "a map pos -> ... of ready positions").
    ready: BTreeMap<Coordinates, Vec<usize>>,
}

/// Merges N logical per-attribute streams — typically one per remote
/// instance — into one local, globally-ordered stream (§4.3). The merge is
/// purely a min-position fold: because every source stream already emits
/// positions in row-major order (§5 ordering guarantees), picking the
/// lexicographic minimum across all currently-ready streams reproduces that
/// same global order locally.
pub struct MultiStreamArray {
    desc: ArrayDesc,
    local_instance: InstanceId,
    destination_of: DestinationFn,
    streams: Vec<Mutex<Box<dyn StreamArray>>>,
    attr_state: Mutex<HashMap<u32, AttrState>>,
    /// Empty-bitmap chunks already pulled, keyed by position, so a
    /// data-attribute chunk at the same position can bind to it without a
    /// second network round trip (§4.1, §4.3: "implicitly pulling the
    /// empty-bitmap chunk first when required").
    bitmap_cache: Mutex<BTreeMap<Coordinates, Arc<chunk::EmptyBitmap>>>,
}

impl std::fmt::Debug for MultiStreamArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiStreamArray")
            .field("array", &self.desc.name())
            .field("local_instance", &self.local_instance)
            .field("n_streams", &self.streams.len())
            .finish()
    }
}

impl MultiStreamArray {
    pub fn new(
        desc: ArrayDesc,
        local_instance: InstanceId,
        destination_of: DestinationFn,
        streams: Vec<Box<dyn StreamArray>>,
    ) -> Self {
        Self {
            desc,
            local_instance,
            destination_of,
            streams: streams.into_iter().map(Mutex::new).collect(),
            attr_state: Mutex::new(HashMap::new()),
            bitmap_cache: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn array_desc(&self) -> &ArrayDesc {
        &self.desc
    }

    fn bitmap_attr_id(&self) -> Option<u32> {
        self.desc.empty_indicator_attr().map(|a| a.id())
    }

    /// §4.3 `nextChunkBody(attId)`. `Poll::Retry` means the caller's
    /// scheduler should requeue this pull rather than spin; `Ready(None)`
    /// means every stream has reached EOF for `attr_id`.
    pub fn next_chunk_body(&self, attr_id: u32) -> BoxFuture<'_, Result<Poll<Option<Arc<MemChunk>>>>> {
        Box::pin(async move {
            loop {
                let not_ready_now: Vec<usize> = {
                    let mut states = self.attr_state.lock();
                    let state = states.entry(attr_id).or_insert_with(|| AttrState {
                        not_ready: (0..self.streams.len()).collect(),
                        ready: BTreeMap::new(),
                    });
                    std::mem::take(&mut state.not_ready)
                };

                // Step 1: resolve every not-ready stream's next position.
                let mut still_not_ready = Vec::new();
                let mut newly_ready: Vec<(usize, Coordinates)> = Vec::new();
                for idx in not_ready_now {
                    let poll = self.streams[idx].lock().next_position(attr_id).await?;
                    match poll {
                        Poll::Retry => still_not_ready.push(idx),
                        Poll::Ready(Some(pos)) => newly_ready.push((idx, pos)),
                        Poll::Ready(None) => {
                            // EOF: the stream is dropped from further
                            // consideration for this attribute.
                        }
                    }
                }

                {
                    let mut states = self.attr_state.lock();
                    let state = states.get_mut(&attr_id).expect("attr state initialized above");
                    state.not_ready.extend(still_not_ready.iter().copied());
                    for (idx, pos) in newly_ready {
                        state.ready.entry(pos).or_default().push(idx);
                    }
                }

                if !still_not_ready.is_empty() {
                    return Ok(Poll::Retry);
                }

                // Step 2: pick the lexicographic minimum ready position.
                let next_group = {
                    let mut states = self.attr_state.lock();
                    let state = states.get_mut(&attr_id).expect("attr state initialized above");
                    let min_pos = match state.ready.keys().next().cloned() {
                        Some(p) => p,
                        None => {
                            if state.not_ready.is_empty() {
                                return Ok(Poll::Ready(None));
                            }
                            return Ok(Poll::Retry);
                        }
                    };
                    let idxs = state.ready.remove(&min_pos).unwrap_or_default();
                    state.not_ready.extend(idxs.iter().copied());
                    (min_pos, idxs)
                };
                let (min_pos, idxs) = next_group;

                // Step 3: drop contributions not bound for this instance.
                if (self.destination_of)(&min_pos) != self.local_instance {
                    observability_deps::tracing::trace!(
                        pos = %min_pos,
                        attr_id,
                        n_parts = idxs.len(),
                        "dropping chunk partials not destined for this instance",
                    );
                    for idx in &idxs {
                        self.streams[*idx].lock().next_chunk_body(attr_id).await?;
                    }
                    continue;
                }

                // Step 4: fetch and merge the contributing chunk bodies.
                let mut parts = Vec::with_capacity(idxs.len());
                for idx in &idxs {
                    parts.push(self.streams[*idx].lock().next_chunk_body(attr_id).await?);
                }
                let mut merged = merge_chunks(&self.desc, attr_id, parts);

                if let Some(bitmap_attr) = self.bitmap_attr_id() {
                    if attr_id == bitmap_attr {
                        self.bitmap_cache
                            .lock()
                            .insert(min_pos.clone(), merged.empty_bitmap().cloned().unwrap_or_else(|| {
                                Arc::new(chunk::EmptyBitmap::new_all_full(merged.payload().len()))
                            }));
                    } else if let Some(bitmap) = self.bitmap_cache.lock().get(&min_pos).cloned() {
                        merged = Arc::new(chunk::MemChunk::new(
                            merged.address().clone(),
                            merged.first_pos().clone(),
                            merged.last_pos().clone(),
                            merged.first_pos_with_overlap().clone(),
                            merged.last_pos_with_overlap().clone(),
                            merged.payload().clone(),
                            Some(bitmap),
                        ));
                    } else {
                        // Bitmap not seen yet for this position: pull it
                        // now so the data chunk can bind to it (§4.1).
                        if let Poll::Ready(Some(bitmap_chunk)) =
                            self.next_chunk_body(bitmap_attr).await?
                        {
                            if let Some(bitmap) = bitmap_chunk.empty_bitmap().cloned() {
                                merged = Arc::new(chunk::MemChunk::new(
                                    merged.address().clone(),
                                    merged.first_pos().clone(),
                                    merged.last_pos().clone(),
                                    merged.first_pos_with_overlap().clone(),
                                    merged.last_pos_with_overlap().clone(),
                                    merged.payload().clone(),
                                    Some(bitmap),
                                ));
                            }
                        }
                    }
                }

                return Ok(Poll::Ready(Some(merged)));
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use array_model::{
        AttributeDesc, ArrayId, DimensionDesc, PartitioningScheme, UnversionedArrayId,
    };
    use chunk::{MemChunk, Payload, Value};

    fn desc() -> ArrayDesc {
        ArrayDesc::new(
            "A",
            UnversionedArrayId(1),
            ArrayId(1),
            0,
            vec![AttributeDesc::new(0, "v", "int64")],
            vec![DimensionDesc::new("i", 0, 15, 4, 0).unwrap()],
            PartitioningScheme::Replication,
        )
        .unwrap()
    }

    /// A stream that yields a fixed, pre-sorted sequence of chunks for
    /// attribute 0, one per call, then EOFs.
    #[derive(Debug)]
    struct FixedStream {
        positions: Vec<i64>,
        cursor: usize,
    }

    #[async_trait::async_trait]
    impl StreamArray for FixedStream {
        async fn next_position(
            &mut self,
            _attr_id: u32,
        ) -> Result<Poll<Option<Coordinates>>> {
            Ok(Poll::Ready(
                self.positions.get(self.cursor).map(|p| Coordinates::new(vec![*p])),
            ))
        }

        async fn next_chunk_body(&mut self, _attr_id: u32) -> Result<Arc<MemChunk>> {
            let pos = self.positions[self.cursor];
            self.cursor += 1;
            let d = desc();
            let mut c = MemChunk::new_for_position(&d, 0, &Coordinates::new(vec![pos]));
            c.set_payload(Payload::Dense(vec![Value::Int64(pos)]));
            Ok(Arc::new(c))
        }
    }

    #[tokio::test]
    async fn merges_two_streams_in_global_row_major_order() {
        let d = desc();
        let streams: Vec<Box<dyn StreamArray>> = vec![
            Box::new(FixedStream { positions: vec![0, 8], cursor: 0 }),
            Box::new(FixedStream { positions: vec![4, 12], cursor: 0 }),
        ];
        let msa = MultiStreamArray::new(
            d,
            InstanceId(0),
            Arc::new(|_pos| InstanceId(0)),
            streams,
        );

        let mut seen = Vec::new();
        loop {
            match msa.next_chunk_body(0).await.unwrap() {
                Poll::Ready(Some(c)) => seen.push(c.first_pos().get(0).unwrap()),
                Poll::Ready(None) => break,
                Poll::Retry => continue,
            }
        }
        assert_eq!(seen, vec![0, 4, 8, 12]);
    }

    #[tokio::test]
    async fn chunks_not_destined_for_local_instance_are_dropped() {
        let d = desc();
        let streams: Vec<Box<dyn StreamArray>> = vec![Box::new(FixedStream {
            positions: vec![0, 4],
            cursor: 0,
        })];
        let msa = MultiStreamArray::new(
            d,
            InstanceId(0),
            // Everything routes to instance 1: instance 0 should see EOF
            // with no chunks ever surfaced.
            Arc::new(|_pos| InstanceId(1)),
            streams,
        );
        match msa.next_chunk_body(0).await.unwrap() {
            Poll::Ready(None) => {}
            other => panic!("expected EOF, got {other:?}"),
        }
    }
}
