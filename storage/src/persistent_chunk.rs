use crate::cache::ChunkCache;
use crate::compressor::Compressor;
use crate::error::{ChunkNotPinnedSnafu, Result};
use crate::header::{ChunkHeader, ChunkHeaderFlags, DiskPos};
use array_model::{Address, ArrayDesc, Coordinates};
use chunk::{Chunk, EmptyBitmap};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};

/// On-disk-backed chunk: loaded lazily, pinned while a `ChunkIterator` reads
/// it, evictable while unpinned (§3 Lifecycle, §4.2).
#[derive(Debug)]
pub struct PersistentChunk {
    address: Address,
    first_pos: Coordinates,
    last_pos: Coordinates,
    first_pos_with_overlap: Coordinates,
    last_pos_with_overlap: Coordinates,
    header: Mutex<ChunkHeader>,
    /// `None` when unallocated or evicted; `Some` once `allocate`/`load` has
    /// brought the body into memory. Invariant: whenever `Some`, its length
    /// equals `header.size` (§4.2 invariant, §8 testable property).
    data: Mutex<Option<Vec<u8>>>,
    empty_bitmap: Mutex<Option<Arc<EmptyBitmap>>>,
    pin_count: AtomicU32,
    /// Set by [`ChunkCache::insert`] once this chunk is registered. `pin`/
    /// `unpin` use it to drive the cache's LRU on the 0<->1 pin-count edge
    /// (§4.2 "the first `pin()` unlinks from the LRU; the last `unPin()`
    /// relinks it"). `Weak` so the cache can be dropped without keeping
    /// every chunk it ever held alive.
    cache: Mutex<Option<Weak<ChunkCache>>>,
}

impl PersistentChunk {
    /// `setAddress(desc, header)`: recompute `firstPos`/`lastPos` (with
    /// overlap) from the dimension metadata for the position recorded in
    /// `address`, per §4.2.
    pub fn set_address(desc: &ArrayDesc, address: Address, header: ChunkHeader) -> Self {
        let dims = desc.dimensions();
        let pos = &address.chunk_coords;
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
        Self {
            address,
            first_pos: Coordinates::new(first_pos),
            last_pos: Coordinates::new(last_pos),
            first_pos_with_overlap: Coordinates::new(first_overlap),
            last_pos_with_overlap: Coordinates::new(last_overlap),
            header: Mutex::new(header),
            data: Mutex::new(None),
            empty_bitmap: Mutex::new(None),
            pin_count: AtomicU32::new(0),
            cache: Mutex::new(None),
        }
    }

    /// Registers the cache this chunk is resident in, so `pin`/`unpin` can
    /// drive its LRU. Called by [`ChunkCache::insert`]; a chunk never
    /// inserted into a cache (e.g. in a unit test exercising the chunk in
    /// isolation) simply never touches one.
    pub fn attach_cache(&self, cache: Weak<ChunkCache>) {
        *self.cache.lock() = Some(cache);
    }

    pub fn header(&self) -> ChunkHeader {
        *self.header.lock()
    }

    pub fn is_tombstone(&self) -> bool {
        self.header.lock().is_tombstone()
    }

    fn require_pinned(&self) -> Result<()> {
        if self.pin_count() == 0 {
            return ChunkNotPinnedSnafu {
                address: self.address.clone(),
            }
            .fail();
        }
        Ok(())
    }

    /// Heap-allocate an `n`-byte body buffer, sized to `header.size` once
    /// the caller updates the header (§4.2 `allocate`).
    pub fn allocate(&self, n: usize) -> Result<()> {
        self.require_pinned()?;
        *self.data.lock() = Some(vec![0u8; n]);
        self.header.lock().size = n as u64;
        Ok(())
    }

    pub fn reallocate(&self, n: usize) -> Result<()> {
        self.require_pinned()?;
        let mut guard = self.data.lock();
        let mut buf = guard.take().unwrap_or_default();
        buf.resize(n, 0);
        *guard = Some(buf);
        self.header.lock().size = n as u64;
        Ok(())
    }

    /// Drop the resident body buffer. Deliberately leaves `header.size`
    /// untouched: `size` is the chunk's logical (uncompressed) size, a
    /// property of the chunk's identity independent of whether its body is
    /// currently resident, and a reload needs it to size the decompression
    /// buffer (§4.2 invariant, §3 "evicted-but-on-disk -> reloaded on
    /// access"). Used both for an explicit `free()` call and, via
    /// [`ChunkCache`]'s eviction, to drop an unpinned chunk's body under
    /// memory pressure.
    pub fn free(&self) {
        *self.data.lock() = None;
    }

    /// Whether a body buffer is currently resident (`allocate`/`set_data`/a
    /// reload have populated it). False right after `free`/eviction.
    pub fn is_resident(&self) -> bool {
        self.data.lock().is_some()
    }

    pub fn data(&self) -> Result<Vec<u8>> {
        self.require_pinned()?;
        Ok(self.data.lock().clone().unwrap_or_default())
    }

    /// Replace the resident buffer without touching `header.size`: the
    /// buffer may hold a compressed representation, whose length is
    /// unrelated to the header's logical (uncompressed) size.
    pub fn set_data(&self, bytes: Vec<u8>) -> Result<()> {
        self.require_pinned()?;
        *self.data.lock() = Some(bytes);
        Ok(())
    }

    /// `compress(buf, emptyBitmap)`: delegate to the compressor keyed by the
    /// header's `compressionMethod` (§4.2).
    pub fn compress(&self, compressor: &dyn Compressor, buf: &[u8]) -> Result<Vec<u8>> {
        compressor.compress(&self.address, buf)
    }

    pub fn decompress(&self, compressor: &dyn Compressor) -> Result<Vec<u8>> {
        self.require_pinned()?;
        let header = self.header();
        let compressed = self.data.lock().clone().unwrap_or_default();
        compressor.decompress(&self.address, &compressed, header.size as usize)
    }

    /// `write(query)`: flush the buffered (already-compressed) body,
    /// recording `compressedSize` and assigning a `DiskPos` (§4.2). The
    /// storage manager's placement (data-store selection, offset
    /// allocation) is out of scope here; callers supply the resolved
    /// `DiskPos`.
    pub fn write(&self, compressed: &[u8], pos: DiskPos) -> Result<()> {
        self.require_pinned()?;
        let mut header = self.header.lock();
        header.compressed_size = compressed.len() as u64;
        header.pos = pos;
        header.allocated_size = header.allocated_size.max(next_power_of_two(compressed.len() as u64));
        Ok(())
    }

    /// Record the logical (uncompressed) payload size without touching the
    /// resident buffer, for when the size is known before the buffer is
    /// populated (e.g. read from a header record on disk).
    pub fn set_logical_size(&self, size: u64) {
        self.header.lock().size = size;
    }

    pub fn mark_tombstone(&self) {
        let mut header = self.header.lock();
        header.flags.insert(ChunkHeaderFlags::TOMBSTONE);
        header.size = 0;
        header.compressed_size = 0;
        *self.data.lock() = None;
    }
}

fn next_power_of_two(n: u64) -> u64 {
    if n <= 1 {
        1
    } else {
        n.next_power_of_two()
    }
}

impl Chunk for PersistentChunk {
    fn address(&self) -> &Address {
        &self.address
    }

    fn first_pos(&self) -> &Coordinates {
        &self.first_pos
    }

    fn last_pos(&self) -> &Coordinates {
        &self.last_pos
    }

    fn first_pos_with_overlap(&self) -> &Coordinates {
        &self.first_pos_with_overlap
    }

    fn last_pos_with_overlap(&self) -> &Coordinates {
        &self.last_pos_with_overlap
    }

    fn empty_bitmap(&self) -> Option<&Arc<EmptyBitmap>> {
        // Lifetime of the guard can't outlive this call; PersistentChunk's
        // bitmap is looked up through `empty_bitmap_owned` by consumers that
        // need to hold it past the call, matching how `storage`'s readers
        // hand off an `Arc` rather than a borrowed reference.
        None
    }

    fn count(&self) -> usize {
        self.empty_bitmap
            .lock()
            .as_ref()
            .map(|b| b.count_live())
            .unwrap_or(self.header().n_elems as usize)
    }

    fn pin(&self) {
        let prev = self.pin_count.fetch_add(1, Ordering::SeqCst);
        if prev == 0 {
            if let Some(cache) = self.cache.lock().as_ref().and_then(Weak::upgrade) {
                cache.touch_pinned(&self.address);
            }
        }
    }

    fn unpin(&self) {
        let prev = self.pin_count.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(prev > 0, "unpin called without a matching pin");
        if prev == 1 {
            if let Some(cache) = self.cache.lock().as_ref().and_then(Weak::upgrade) {
                cache.touch_unpinned(self.address.clone(), self.header().size);
            }
        }
    }

    fn pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::SeqCst)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl Drop for PersistentChunk {
    fn drop(&mut self) {
        if self.pin_count() != 0 {
            observability_deps::tracing::error!(
                chunk = ?self.address,
                pins = self.pin_count(),
                "persistent chunk dropped while still pinned",
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compressor::ZstdCompressor;
    use array_model::{
        AttributeDesc, ArrayId, DimensionDesc, PartitioningScheme, UnversionedArrayId,
    };

    fn desc() -> ArrayDesc {
        ArrayDesc::new(
            "A",
            UnversionedArrayId(1),
            ArrayId(1),
            0,
            vec![AttributeDesc::new(0, "v", "int64")],
            vec![DimensionDesc::new("i", 0, 99, 10, 0).unwrap()],
            PartitioningScheme::Replication,
        )
        .unwrap()
    }

    fn header() -> ChunkHeader {
        ChunkHeader {
            storage_version: 1,
            pos: DiskPos::default(),
            arr_id: ArrayId(1),
            attr_id: 0,
            compressed_size: 0,
            size: 0,
            compression_method: crate::header::CompressionMethod::Zstd,
            flags: ChunkHeaderFlags::empty(),
            n_coordinates: 1,
            allocated_size: 0,
            n_elems: 0,
            instance_id: 0,
        }
    }

    #[test]
    fn unpinned_access_fails() {
        let chunk = PersistentChunk::set_address(
            &desc(),
            Address::new(0, Coordinates::new(vec![23])),
            header(),
        );
        assert!(chunk.allocate(16).is_err());
    }

    #[test]
    fn set_address_aligns_to_chunk_boundary() {
        let chunk = PersistentChunk::set_address(
            &desc(),
            Address::new(0, Coordinates::new(vec![23])),
            header(),
        );
        assert_eq!(chunk.first_pos(), &Coordinates::new(vec![20]));
        assert_eq!(chunk.last_pos(), &Coordinates::new(vec![29]));
    }

    #[test]
    fn compress_then_decompress_round_trips() {
        let chunk = PersistentChunk::set_address(
            &desc(),
            Address::new(0, Coordinates::new(vec![0])),
            header(),
        );
        Chunk::pin(&chunk);
        let original = vec![7u8; 256];
        let compressor = ZstdCompressor::default();
        let compressed = chunk.compress(&compressor, &original).unwrap();
        chunk.set_data(compressed.clone()).unwrap();
        let restored = chunk.decompress(&compressor).unwrap();
        assert_eq!(restored, original);
        Chunk::unpin(&chunk);
    }
}
