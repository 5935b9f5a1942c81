use crate::empty_bitmap::EmptyBitmap;
use crate::rle::RlePayload;
use crate::value::Value;
use array_model::{Address, ArrayDesc, Coordinates};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Dense, row-major chunk payload: "an externally provided materialized
/// layout" alternative to RLE (§3 Chunk).
pub type DensePayload = Vec<Value>;

/// A chunk's payload: run-length-encoded (the default encoding) or a
/// materialized dense layout (§3 Chunk).
#[derive(Debug, Clone)]
pub enum Payload {
    Dense(DensePayload),
    Rle(RlePayload),
}

impl Payload {
    pub fn get(&self, index: usize) -> Option<Value> {
        match self {
            Payload::Dense(v) => v.get(index).cloned(),
            Payload::Rle(r) => r.value_at(index).cloned(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Payload::Dense(v) => v.len(),
            Payload::Rle(r) => r.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_dense(&self) -> DensePayload {
        match self {
            Payload::Dense(v) => v.clone(),
            Payload::Rle(r) => r.to_dense(),
        }
    }
}

/// An in-memory chunk: one attribute's data over its rectangular region,
/// plus an optional shared empty bitmap (§3 Chunk, §4.1 "MemChunk owning
/// its empty bitmap as a sibling attribute").
#[derive(Debug)]
pub struct MemChunk {
    address: Address,
    first_pos: Coordinates,
    last_pos: Coordinates,
    first_pos_with_overlap: Coordinates,
    last_pos_with_overlap: Coordinates,
    payload: Payload,
    empty_bitmap: Option<Arc<EmptyBitmap>>,
    pin_count: AtomicU32,
}

impl MemChunk {
    /// Compute the four position vectors for the chunk that contains `pos`
    /// under `desc`'s dimensions (§3 Chunk invariants), then build an
    /// all-dense, all-default-filled chunk ready for a writing iterator.
    pub fn new_for_position(desc: &ArrayDesc, attr_id: u32, pos: &Coordinates) -> Self {
        let dims = desc.dimensions();
        let mut first_pos = Vec::with_capacity(dims.len());
        let mut last_pos = Vec::with_capacity(dims.len());
        let mut first_overlap = Vec::with_capacity(dims.len());
        let mut last_overlap = Vec::with_capacity(dims.len());
        for (d, dim) in dims.iter().enumerate() {
            let fp = dim.chunk_first_pos(pos.get(d).expect("coordinate arity"));
            let lp = dim.chunk_last_pos(fp);
            first_pos.push(fp);
            last_pos.push(lp);
            first_overlap.push(dim.first_pos_with_overlap(fp));
            last_overlap.push(dim.last_pos_with_overlap(lp));
        }
        let first_pos = Coordinates::new(first_pos);
        Self::new(
            Address::new(attr_id, first_pos.clone()),
            first_pos,
            Coordinates::new(last_pos),
            Coordinates::new(first_overlap),
            Coordinates::new(last_overlap),
            Payload::Dense(Vec::new()),
            None,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        address: Address,
        first_pos: Coordinates,
        last_pos: Coordinates,
        first_pos_with_overlap: Coordinates,
        last_pos_with_overlap: Coordinates,
        payload: Payload,
        empty_bitmap: Option<Arc<EmptyBitmap>>,
    ) -> Self {
        Self {
            address,
            first_pos,
            last_pos,
            first_pos_with_overlap,
            last_pos_with_overlap,
            payload,
            empty_bitmap,
            pin_count: AtomicU32::new(0),
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn first_pos(&self) -> &Coordinates {
        &self.first_pos
    }

    pub fn last_pos(&self) -> &Coordinates {
        &self.last_pos
    }

    pub fn first_pos_with_overlap(&self) -> &Coordinates {
        &self.first_pos_with_overlap
    }

    pub fn last_pos_with_overlap(&self) -> &Coordinates {
        &self.last_pos_with_overlap
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn set_payload(&mut self, payload: Payload) {
        self.payload = payload;
    }

    pub fn empty_bitmap(&self) -> Option<&Arc<EmptyBitmap>> {
        self.empty_bitmap.as_ref()
    }

    pub fn set_empty_bitmap(&mut self, bitmap: Arc<EmptyBitmap>) {
        self.empty_bitmap = Some(bitmap);
    }

    pub fn count(&self) -> usize {
        match &self.empty_bitmap {
            Some(b) => b.count_live(),
            None => self.payload.len(),
        }
    }

    /// First `pin()` unlinks from the LRU in `storage`; `MemChunk` has no
    /// LRU of its own (it's never evicted), so pin/unpin here only tracks
    /// the ref count for the "destruction with non-zero count is a bug"
    /// invariant (§3 Lifecycle).
    pub fn pin(&self) {
        self.pin_count.fetch_add(1, Ordering::SeqCst);
    }

    pub fn unpin(&self) {
        let prev = self.pin_count.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(prev > 0, "unpin called without a matching pin");
    }

    pub fn pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::SeqCst)
    }
}

impl Drop for MemChunk {
    fn drop(&mut self) {
        if self.pin_count() != 0 {
            observability_deps::tracing::error!(
                chunk = ?self.address,
                pins = self.pin_count(),
                "chunk dropped while still pinned",
            );
        }
    }
}
