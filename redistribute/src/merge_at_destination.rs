use crate::aggregate::AggregateMerge;
use crate::error::{MissingBitmapSnafu, Result};
use array_model::Coordinates;
use chunk::{EmptyBitmap, MemChunk, Payload, Value};
use parking_lot::Mutex;
use snafu::OptionExt;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Caches the empty-bitmap-attribute chunk received at each position so a
/// later real-attribute chunk for the same position doesn't need its own
/// bitmap refetched (§4.5: "synthesized from the bitmap-attribute chunk
/// previously received for the same position, cached in the SG context").
#[derive(Debug, Default)]
pub struct BitmapCache {
    by_position: Mutex<BTreeMap<Coordinates, Arc<EmptyBitmap>>>,
}

impl BitmapCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Record the bitmap carried by a just-received chunk, if any.
    pub fn observe(&self, pos: &Coordinates, chunk: &MemChunk) {
        if let Some(bitmap) = chunk.empty_bitmap() {
            self.by_position.lock().insert(pos.clone(), Arc::clone(bitmap));
        }
    }

    pub fn get(&self, pos: &Coordinates) -> Option<Arc<EmptyBitmap>> {
        self.by_position.lock().get(pos).cloned()
    }
}

/// Merge a just-received chunk into a destination array at the position it
/// names (§4.5 "Chunk merge at the destination"):
///
/// 1. If no local chunk exists yet at this position, the received payload
///    (and bitmap, if it carries one) is copied in directly.
/// 2. Otherwise the existing chunk is pinned, the received one is walked
///    cell by cell, and each live cell is folded in with `aggregate` (if
///    given) or overwritten outright.
///
/// A received chunk with no bitmap of its own (a real-attribute chunk whose
/// liveness is carried by a sibling empty-indicator attribute) borrows one
/// from `bitmap_cache`.
pub fn merge_at_destination(
    existing: Option<&MemChunk>,
    received: &MemChunk,
    aggregate: Option<&dyn AggregateMerge>,
    bitmap_cache: &BitmapCache,
) -> Result<MemChunk> {
    let pos = received.first_pos().clone();
    let bitmap = match received.empty_bitmap() {
        Some(b) => Some(Arc::clone(b)),
        None => bitmap_cache.get(&pos),
    };

    let Some(existing) = existing else {
        let copy = MemChunk::new(
            received.address().clone(),
            received.first_pos().clone(),
            received.last_pos().clone(),
            received.first_pos_with_overlap().clone(),
            received.last_pos_with_overlap().clone(),
            received.payload().clone(),
            bitmap,
        );
        return Ok(copy);
    };

    existing.pin();
    let result = (|| {
        let existing_dense = existing.payload().to_dense();
        let received_dense = received.payload().to_dense();
        let len = existing_dense.len().max(received_dense.len());

        let mut merged_values = Vec::with_capacity(len);
        let mut merged_bitmap = EmptyBitmap::new_all_empty(len);
        let existing_bitmap = existing.empty_bitmap();

        for i in 0..len {
            let received_live = match &bitmap {
                Some(b) => b.is_live(i),
                None => i < received_dense.len() && !received_dense[i].is_null(),
            };
            let existing_live = existing_bitmap
                .map(|b| b.is_live(i))
                .unwrap_or_else(|| i < existing_dense.len() && !existing_dense[i].is_null());

            let value = match (existing_live, received_live) {
                (false, false) => Value::Null,
                (false, true) => {
                    let incoming = &received_dense[i];
                    merged_bitmap.set_live(i, true);
                    match aggregate {
                        Some(agg) => agg.accumulate(incoming),
                        None => incoming.clone(),
                    }
                }
                (true, false) => {
                    merged_bitmap.set_live(i, true);
                    existing_dense.get(i).cloned().unwrap_or(Value::Null)
                }
                (true, true) => {
                    merged_bitmap.set_live(i, true);
                    let prev = existing_dense.get(i).cloned().unwrap_or(Value::Null);
                    let incoming = &received_dense[i];
                    match aggregate {
                        Some(agg) => agg.merge(&prev, incoming),
                        None => incoming.clone(),
                    }
                }
            };
            merged_values.push(value);
        }

        let mut out = MemChunk::new(
            existing.address().clone(),
            existing.first_pos().clone(),
            existing.last_pos().clone(),
            existing.first_pos_with_overlap().clone(),
            existing.last_pos_with_overlap().clone(),
            Payload::Dense(merged_values),
            None,
        );
        out.set_empty_bitmap(Arc::new(merged_bitmap));
        Ok(out)
    })();
    existing.unpin();
    result
}

/// Resolve the empty bitmap that a real-attribute merge needs when the
/// received chunk doesn't carry one of its own, failing loudly rather than
/// treating every cell as empty — a missing cache entry means the
/// bitmap-attribute chunk for this position hasn't arrived yet, which is a
/// scheduling bug in the caller (§4.5 order: bitmap attribute precedes data
/// attributes).
pub fn require_cached_bitmap(
    bitmap_cache: &BitmapCache,
    pos: &Coordinates,
    address: &array_model::Address,
) -> Result<Arc<EmptyBitmap>> {
    bitmap_cache
        .get(pos)
        .context(MissingBitmapSnafu { address: address.clone() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::SumMerge;
    use array_model::{Address, ArrayDesc, ArrayId, AttributeDesc, DimensionDesc, PartitioningScheme, UnversionedArrayId};

    fn desc() -> ArrayDesc {
        ArrayDesc::new(
            "A",
            UnversionedArrayId(1),
            ArrayId(1),
            0,
            vec![AttributeDesc::new(0, "v", "int64")],
            vec![DimensionDesc::new("i", 0, 3, 4, 0).unwrap()],
            PartitioningScheme::Replication,
        )
        .unwrap()
    }

    fn chunk_with(vals: Vec<Value>, live: Vec<bool>) -> MemChunk {
        let d = desc();
        let mut c = MemChunk::new_for_position(&d, 0, &Coordinates::new(vec![0]));
        c.set_payload(Payload::Dense(vals));
        let mut bitmap = EmptyBitmap::new_all_empty(live.len());
        for (i, l) in live.into_iter().enumerate() {
            bitmap.set_live(i, l);
        }
        c.set_empty_bitmap(Arc::new(bitmap));
        c
    }

    #[test]
    fn first_write_copies_payload_directly() {
        let received = chunk_with(vec![Value::Int64(1), Value::Null], vec![true, false]);
        let cache = BitmapCache::default();
        let merged = merge_at_destination(None, &received, None, &cache).unwrap();
        assert_eq!(merged.payload().to_dense(), vec![Value::Int64(1), Value::Null]);
    }

    #[test]
    fn overwrite_merge_prefers_received_value() {
        let existing = chunk_with(vec![Value::Int64(10), Value::Int64(20)], vec![true, true]);
        let received = chunk_with(vec![Value::Int64(99), Value::Null], vec![true, false]);
        let cache = BitmapCache::default();
        let merged = merge_at_destination(Some(&existing), &received, None, &cache).unwrap();
        assert_eq!(merged.payload().get(0), Some(Value::Int64(99)));
        assert_eq!(merged.payload().get(1), Some(Value::Int64(20)));
        assert_eq!(existing.pin_count(), 0);
    }

    #[test]
    fn aggregate_merge_sums_overlapping_contributions() {
        let existing = chunk_with(vec![Value::Int64(10)], vec![true]);
        let received = chunk_with(vec![Value::Int64(5)], vec![true]);
        let cache = BitmapCache::default();
        let merged = merge_at_destination(Some(&existing), &received, Some(&SumMerge), &cache).unwrap();
        assert_eq!(merged.payload().get(0), Some(Value::Double(15.0)));
    }
}
