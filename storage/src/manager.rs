//! Storage manager: owns one header file and one data-store file, and
//! drives the `PersistentChunk` lifecycle described in §3/§4.2 end to end —
//! `create`/`open` the header file, `save`/`load` individual chunks, and
//! bump-allocate payload offsets in power-of-two buddy blocks.
//!
//! A single data store (rather than the source's "one file per array") is
//! the simplification this crate makes: §1 scopes the storage manager's
//! placement policy as an implementation detail the redesign is free to
//! simplify, so long as `DiskPos`'s `(ds_guid, offs)` shape and the
//! power-of-two `allocatedSize` invariant (§4.2) are preserved.

use crate::cache::ChunkCache;
use crate::codec::{CHUNK_HEADER_WIRE_SIZE, STORAGE_HEADER_WIRE_SIZE};
use crate::compressor::Compressor;
use crate::error::{ChunkNotFoundSnafu, CorruptedHeaderSnafu, MissingDataStoreSnafu, Result};
use crate::header::{ChunkDescriptor, DiskPos, StorageHeader, HEADER_SIZE};
use crate::persistent_chunk::PersistentChunk;
use array_model::{Address, Coordinates, InstanceId};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DEFAULT_DS_GUID: u64 = 1;

fn no_address_err(reason: impl Into<String>) -> crate::error::Error {
    CorruptedHeaderSnafu {
        address: Address::new(0, Coordinates::new(vec![])),
        reason: reason.into(),
    }
    .build()
}

/// Tracks the next free offset in the single data store this manager
/// writes payloads to, bump-allocating power-of-two blocks (§4.2
/// `allocatedSize`, §6 "allocated in power-of-two buddy blocks").
#[derive(Debug)]
struct DataStore {
    guid: u64,
    path: PathBuf,
    next_offset: u64,
}

impl DataStore {
    fn allocate(&mut self, requested: u64) -> DiskPos {
        let size = requested.max(1).next_power_of_two();
        let offs = self.next_offset;
        self.next_offset += size;
        DiskPos {
            ds_guid: self.guid,
            hdr_pos: 0,
            offs,
        }
    }
}

/// Owns one storage header file plus its chunk directory and resident-body
/// cache (§4.2, §5). One instance per running engine process in the
/// source; here, one per call site that needs persistence (tests construct
/// a fresh one per temp directory).
#[derive(Debug)]
pub struct StorageManager {
    header_path: PathBuf,
    header: Mutex<StorageHeader>,
    data_store: Mutex<DataStore>,
    cache: Arc<ChunkCache>,
}

impl StorageManager {
    /// Create a brand-new header file at `header_path`, truncating any
    /// existing contents, reserving the first [`HEADER_SIZE`] bytes for the
    /// [`StorageHeader`] record (§3, §6).
    pub fn create(
        header_path: impl AsRef<Path>,
        data_store_path: impl AsRef<Path>,
        instance_id: InstanceId,
        cache_capacity_bytes: u64,
    ) -> Result<Self> {
        let header = StorageHeader::new(instance_id.get(), 1, 1);
        let mut file = File::create(header_path.as_ref()).map_err(|e| no_address_err(e.to_string()))?;
        let mut buf = Vec::with_capacity(HEADER_SIZE as usize);
        header
            .write_to(&mut buf)
            .map_err(|e| no_address_err(e.to_string()))?;
        buf.resize(HEADER_SIZE as usize, 0);
        file.write_all(&buf).map_err(|e| no_address_err(e.to_string()))?;

        File::create(data_store_path.as_ref()).map_err(|e| no_address_err(e.to_string()))?;

        Ok(Self {
            header_path: header_path.as_ref().to_path_buf(),
            header: Mutex::new(header),
            data_store: Mutex::new(DataStore {
                guid: DEFAULT_DS_GUID,
                path: data_store_path.as_ref().to_path_buf(),
                next_offset: 0,
            }),
            cache: ChunkCache::new(cache_capacity_bytes),
        })
    }

    /// Open an existing header file, validating its magic/version against
    /// this reader's own supported bracket (§6 "A reader refuses a file
    /// whose magic or version falls outside its own range").
    pub fn open(
        header_path: impl AsRef<Path>,
        data_store_path: impl AsRef<Path>,
        cache_capacity_bytes: u64,
    ) -> Result<Self> {
        let mut file = File::open(header_path.as_ref()).map_err(|e| no_address_err(e.to_string()))?;
        let mut buf = vec![0u8; STORAGE_HEADER_WIRE_SIZE];
        file.read_exact(&mut buf).map_err(|e| no_address_err(e.to_string()))?;
        let header = StorageHeader::read_from(&mut &buf[..]).map_err(|e| no_address_err(e.to_string()))?;
        header.validate(1, 1)?;

        let data_len = std::fs::metadata(data_store_path.as_ref())
            .map(|m| m.len())
            .unwrap_or(0);

        Ok(Self {
            header_path: header_path.as_ref().to_path_buf(),
            header: Mutex::new(header),
            data_store: Mutex::new(DataStore {
                guid: DEFAULT_DS_GUID,
                path: data_store_path.as_ref().to_path_buf(),
                next_offset: data_len,
            }),
            cache: ChunkCache::new(cache_capacity_bytes),
        })
    }

    pub fn cache(&self) -> &Arc<ChunkCache> {
        &self.cache
    }

    pub fn header(&self) -> StorageHeader {
        *self.header.lock()
    }

    /// `write(query)` end to end: allocate payload space, persist the
    /// (already compressed) body to the data store, append the chunk
    /// header record, and bump `nChunks`/`currPos` (§4.2, §3 on-disk
    /// layout, §8 "`currPos >= HEADER_SIZE`; `nChunks` equals the count of
    /// non-tombstone chunk headers").
    ///
    /// `chunk` must already be pinned with its logical body resident
    /// (`allocate`/`set_data` called). The same `Arc` is linked into the
    /// manager's cache directory, so a subsequent `load` of this address
    /// within the process sees the identical instance rather than a
    /// reconstructed copy.
    pub fn save(&self, chunk: &Arc<PersistentChunk>, compressor: &dyn Compressor) -> Result<()> {
        let compressed = chunk.compress(compressor, &chunk.data()?)?;

        let pos = {
            let mut ds = self.data_store.lock();
            let pos = ds.allocate(compressed.len() as u64);
            let mut file = OpenOptions::new().write(true).open(&ds.path).map_err(|e| {
                MissingDataStoreSnafu { ds_guid: pos.ds_guid }.build().also_log(&e)
            })?;
            file.seek(SeekFrom::Start(pos.offs)).map_err(|e| {
                MissingDataStoreSnafu { ds_guid: pos.ds_guid }.build().also_log(&e)
            })?;
            file.write_all(&compressed).map_err(|e| {
                MissingDataStoreSnafu { ds_guid: pos.ds_guid }.build().also_log(&e)
            })?;
            pos
        };
        chunk.write(&compressed, pos)?;

        let descriptor = ChunkDescriptor::new(chunk.header(), chunk.address().chunk_coords.as_slice().to_vec());
        let record_len = CHUNK_HEADER_WIRE_SIZE as u64 + descriptor.coordinates.len() as u64 * 8;

        let mut header_file = OpenOptions::new()
            .write(true)
            .open(&self.header_path)
            .map_err(|e| CorruptedHeaderSnafu { address: chunk.address().clone(), reason: e.to_string() }.build())?;
        let mut storage_header = self.header.lock();
        header_file
            .seek(SeekFrom::Start(storage_header.curr_pos))
            .and_then(|_| write_chunk_descriptor(&mut header_file, &descriptor))
            .map_err(|e| CorruptedHeaderSnafu { address: chunk.address().clone(), reason: e.to_string() }.build())?;

        storage_header.curr_pos += record_len;
        if !chunk.is_tombstone() {
            storage_header.n_chunks += 1;
        }
        header_file
            .seek(SeekFrom::Start(0))
            .and_then(|_| storage_header.write_to(&mut header_file))
            .map_err(|e| CorruptedHeaderSnafu { address: chunk.address().clone(), reason: e.to_string() }.build())?;

        self.cache.insert(Arc::clone(chunk));
        Ok(())
    }

    /// `load(chunk.addr)`: fetch the cached entry if its body is resident,
    /// otherwise pin it and reload the compressed payload from the data
    /// store before decompressing in place (§3 Lifecycle
    /// "evicted-but-on-disk -> reloaded on access"). Returns the chunk
    /// pinned; the caller owns the matching `unpin`.
    pub fn load(&self, address: &Address, compressor: &dyn Compressor) -> Result<Arc<PersistentChunk>> {
        let cached = self
            .cache
            .get(address)
            .ok_or_else(|| ChunkNotFoundSnafu { address: address.clone() }.build())?;

        let already_pinned = cached.pin_count() > 0;
        if !already_pinned {
            chunk::Chunk::pin(cached.as_ref());
        }

        let header = cached.header();
        if !cached.is_resident() && header.compressed_size > 0 {
            let mut file = File::open(&self.data_store.lock().path).map_err(|e| {
                MissingDataStoreSnafu { ds_guid: header.pos.ds_guid }.build().also_log(&e)
            })?;
            file.seek(SeekFrom::Start(header.pos.offs)).map_err(|e| {
                MissingDataStoreSnafu { ds_guid: header.pos.ds_guid }.build().also_log(&e)
            })?;
            let mut compressed = vec![0u8; header.compressed_size as usize];
            file.read_exact(&mut compressed).map_err(|e| {
                MissingDataStoreSnafu { ds_guid: header.pos.ds_guid }.build().also_log(&e)
            })?;
            cached.set_data(compressed)?;
            let decompressed = cached.decompress(compressor)?;
            cached.set_data(decompressed)?;
        }

        Ok(cached)
    }
}

fn write_chunk_descriptor(file: &mut File, descriptor: &ChunkDescriptor) -> std::io::Result<()> {
    descriptor.header.write_to(file)?;
    for c in &descriptor.coordinates {
        file.write_all(&c.to_le_bytes())?;
    }
    Ok(())
}

/// Logs the underlying I/O error once at the call site before it's
/// discarded into a storage-layer error variant that doesn't carry it.
trait AlsoLog {
    fn also_log(self, io_err: &std::io::Error) -> Self;
}

impl AlsoLog for crate::error::Error {
    fn also_log(self, io_err: &std::io::Error) -> Self {
        observability_deps::tracing::error!(error = %io_err, "storage I/O error");
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compressor::ZstdCompressor;
    use crate::header::{ChunkHeader, ChunkHeaderFlags, CompressionMethod};
    use array_model::{ArrayDesc, ArrayId, AttributeDesc, DimensionDesc, PartitioningScheme, UnversionedArrayId};

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

    #[test]
    fn chunk_round_trips_through_a_freshly_created_store() {
        let dir = test_helpers::tmp_dir().unwrap();
        let header_path = dir.path().join("storage.header");
        let ds_path = dir.path().join("0.data");
        let mgr = StorageManager::create(&header_path, &ds_path, InstanceId(0), 1 << 20).unwrap();

        let d = desc();
        let address = Address::new(0, Coordinates::new(vec![0]));
        let chunk_header = ChunkHeader {
            storage_version: 1,
            pos: DiskPos::default(),
            arr_id: d.id(),
            attr_id: 0,
            compressed_size: 0,
            size: 0,
            compression_method: CompressionMethod::Zstd,
            flags: ChunkHeaderFlags::empty(),
            n_coordinates: 1,
            allocated_size: 0,
            n_elems: 100,
            instance_id: 0,
        };
        let pc = Arc::new(PersistentChunk::set_address(&d, address.clone(), chunk_header));
        chunk::Chunk::pin(pc.as_ref());
        let body: Vec<u8> = (0..100i64).flat_map(|v| (v * v).to_le_bytes()).collect();
        pc.allocate(body.len()).unwrap();
        pc.set_data(body.clone()).unwrap();

        let compressor = ZstdCompressor::default();
        mgr.save(&pc, &compressor).unwrap();
        assert_eq!(mgr.header().n_chunks, 1);
        assert!(mgr.header().curr_pos >= HEADER_SIZE);

        let loaded = mgr.load(&address, &compressor).unwrap();
        assert_eq!(loaded.data().unwrap(), body);
        chunk::Chunk::unpin(pc.as_ref());
    }

    #[test]
    fn evicted_chunk_body_is_reloaded_from_disk_on_next_pin() {
        let dir = test_helpers::tmp_dir().unwrap();
        let header_path = dir.path().join("storage.header");
        let ds_path = dir.path().join("0.data");
        // Capacity of 1 byte: unpinning the chunk right after `save` must
        // evict its resident body immediately (§4.2, §3 Lifecycle).
        let mgr = StorageManager::create(&header_path, &ds_path, InstanceId(0), 1).unwrap();

        let d = desc();
        let address = Address::new(0, Coordinates::new(vec![0]));
        let chunk_header = ChunkHeader {
            storage_version: 1,
            pos: DiskPos::default(),
            arr_id: d.id(),
            attr_id: 0,
            compressed_size: 0,
            size: 0,
            compression_method: CompressionMethod::Zstd,
            flags: ChunkHeaderFlags::empty(),
            n_coordinates: 1,
            allocated_size: 0,
            n_elems: 100,
            instance_id: 0,
        };
        let pc = Arc::new(PersistentChunk::set_address(&d, address.clone(), chunk_header));
        chunk::Chunk::pin(pc.as_ref());
        let body: Vec<u8> = (0..100i64).flat_map(|v| (v * v).to_le_bytes()).collect();
        pc.allocate(body.len()).unwrap();
        pc.set_data(body.clone()).unwrap();

        let compressor = ZstdCompressor::default();
        mgr.save(&pc, &compressor).unwrap();
        chunk::Chunk::unpin(pc.as_ref());

        assert!(!pc.is_resident(), "unpinning past capacity must evict the body");
        assert_eq!(
            pc.header().size,
            body.len() as u64,
            "free() must keep the logical size a reload needs to decompress into"
        );

        let loaded = mgr.load(&address, &compressor).unwrap();
        assert_eq!(loaded.data().unwrap(), body);
        chunk::Chunk::unpin(loaded.as_ref());
    }

    #[test]
    fn load_of_unknown_address_fails() {
        let dir = test_helpers::tmp_dir().unwrap();
        let mgr = StorageManager::create(
            dir.path().join("storage.header"),
            dir.path().join("0.data"),
            InstanceId(0),
            1 << 20,
        )
        .unwrap();
        let compressor = ZstdCompressor::default();
        let address = Address::new(0, Coordinates::new(vec![0]));
        assert!(mgr.load(&address, &compressor).is_err());
    }
}
