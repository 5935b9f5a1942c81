use crate::empty_bitmap::EmptyBitmap;
use crate::mem_chunk::MemChunk;
use crate::traits::Chunk;
use array_model::{Address, Coordinates};
use std::sync::Arc;

impl Chunk for MemChunk {
    fn address(&self) -> &Address {
        MemChunk::address(self)
    }

    fn first_pos(&self) -> &Coordinates {
        MemChunk::first_pos(self)
    }

    fn last_pos(&self) -> &Coordinates {
        MemChunk::last_pos(self)
    }

    fn first_pos_with_overlap(&self) -> &Coordinates {
        MemChunk::first_pos_with_overlap(self)
    }

    fn last_pos_with_overlap(&self) -> &Coordinates {
        MemChunk::last_pos_with_overlap(self)
    }

    fn empty_bitmap(&self) -> Option<&Arc<EmptyBitmap>> {
        MemChunk::empty_bitmap(self)
    }

    fn count(&self) -> usize {
        MemChunk::count(self)
    }

    fn pin(&self) {
        MemChunk::pin(self)
    }

    fn unpin(&self) {
        MemChunk::unpin(self)
    }

    fn pin_count(&self) -> u32 {
        MemChunk::pin_count(self)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
