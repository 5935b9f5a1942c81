use crate::access::AccessMode;
use crate::empty_bitmap::EmptyBitmap;
use crate::error::Result;
use crate::value::Value;
use array_model::{Address, ArrayDesc, Coordinates};
use std::sync::Arc;

/// Capability shared by every chunk representation: in-memory (`MemChunk`),
/// delegated (`DelegateChunk`), and persistent (`storage::PersistentChunk`).
/// A small trait rather than a base class, per §9's redesign note on
/// replacing deep inheritance with capability traits.
pub trait Chunk: std::fmt::Debug + Send + Sync {
    fn address(&self) -> &Address;
    fn first_pos(&self) -> &Coordinates;
    fn last_pos(&self) -> &Coordinates;
    fn first_pos_with_overlap(&self) -> &Coordinates;
    fn last_pos_with_overlap(&self) -> &Coordinates;
    fn empty_bitmap(&self) -> Option<&Arc<EmptyBitmap>>;
    /// Number of live cells, per the chunk's empty bitmap if present.
    fn count(&self) -> usize;
    /// Ref-counted pin; access without a pin is a storage-layer error for
    /// `PersistentChunk`, a no-op precondition for `MemChunk` (§3 Lifecycle,
    /// §4.2).
    fn pin(&self);
    fn unpin(&self);
    fn pin_count(&self) -> u32;
    /// Downcast hook for merge/concat machinery that needs concrete payload
    /// access (e.g. `MemChunk`'s dense values) rather than going through a
    /// full `ChunkIterator`.
    fn as_any(&self) -> &dyn std::any::Any;
}

/// Chunk-at-a-time iteration over one attribute of an `Array` (§4.1).
pub trait ArrayIterator: std::fmt::Debug {
    fn end(&self) -> bool;
    /// Advance to the next chunk in row-major chunkCoords order.
    fn advance(&mut self);
    fn get_position(&self) -> Option<&Coordinates>;
    fn get_chunk(&mut self) -> Arc<dyn Chunk>;
    /// Returns `false` (rather than erroring) for a non-random-access array,
    /// per §4.1.
    fn set_position(&mut self, pos: &Coordinates) -> bool;
    fn reset(&mut self);
}

/// Cell-at-a-time iteration over one chunk (§4.1).
pub trait ChunkIterator: std::fmt::Debug {
    fn end(&self) -> bool;
    fn advance(&mut self);
    fn get_position(&self) -> Option<&Coordinates>;
    fn get_item(&self) -> Result<&Value>;
    fn is_empty(&self) -> bool;
    fn write_item(&mut self, value: Value) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
    fn set_position(&mut self, pos: &Coordinates) -> bool;
}

/// A tile: a horizontally-aligned slab of values returned together when a
/// chunk iterator is in `TILE_MODE` (§4.1, GLOSSARY). `get_data` returns
/// `None` at end-of-chunk / a hole, matching the source's sentinel `-1`.
pub trait TileChunkIterator: ChunkIterator {
    fn get_data(
        &mut self,
        logical_start: &Coordinates,
        max_values: usize,
    ) -> Option<(Vec<Value>, Vec<Coordinates>)>;
}

/// The top-level array abstraction: a tree of operators composes these by
/// ownership (Arc), never by inheritance (§9).
pub trait Array: std::fmt::Debug + Send + Sync {
    fn array_desc(&self) -> &ArrayDesc;
    fn supported_access(&self) -> AccessMode;
    fn get_array_iterator(&self, attr_id: u32) -> Box<dyn ArrayIterator>;
}
