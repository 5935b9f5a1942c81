//! On-disk chunk storage (§3 PersistentChunk on-disk layout, §4.2, §6):
//! the [`header`]/[`codec`] wire format for a storage header file, a
//! pluggable [`compressor`], the [`persistent_chunk::PersistentChunk`]
//! lifecycle (pin/unpin/allocate/compress), a resident-body [`cache`]
//! (`SharedMemCache`/LRU), and the [`manager::StorageManager`] that
//! drives all of the above against real files.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(missing_debug_implementations, clippy::clone_on_ref_ptr)]

pub mod cache;
pub mod codec;
pub mod compressor;
pub mod error;
pub mod header;
pub mod manager;
pub mod persistent_chunk;

pub use cache::ChunkCache;
pub use compressor::{Compressor, NoneCompressor, ZstdCompressor};
pub use error::{Error, Result};
pub use header::{
    ChunkDescriptor, ChunkHeader, ChunkHeaderFlags, CompressionMethod, DiskPos, StorageHeader,
    HEADER_SIZE, MAX_NUM_DIMS_SUPPORTED, STORAGE_MAGIC,
};
pub use manager::StorageManager;
pub use persistent_chunk::PersistentChunk;
