//! Chunk and iterator model (C1): the `Array`/`ArrayIterator`/`Chunk`/
//! `ChunkIterator` capability traits, their in-memory implementations, and
//! the `MergeArray`/`ConcatArray` composition arrays built on top of them.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(missing_debug_implementations, clippy::clone_on_ref_ptr)]

mod access;
mod concat;
mod delegate;
mod empty_bitmap;
mod error;
mod iteration_mode;
mod mem_array;
mod mem_chunk;
mod mem_chunk_impl;
mod mem_chunk_iterator;
mod merge;
mod rle;
mod traits;
mod value;

pub use access::AccessMode;
pub use concat::ConcatArray;
pub use delegate::DelegateBase;
pub use empty_bitmap::EmptyBitmap;
pub use error::{Error, Result};
pub use iteration_mode::IterationMode;
pub use mem_array::{MemArray, MemArrayIterator};
pub use mem_chunk::{DensePayload, MemChunk, Payload};
pub use mem_chunk_iterator::{DensePayloadOwned, MemChunkReadIterator, MemChunkWriteIterator};
pub use merge::MergeArray;
pub use rle::{RleSegment, RlePayload};
pub use traits::{Array, ArrayIterator, Chunk, ChunkIterator, TileChunkIterator};
pub use value::Value;
