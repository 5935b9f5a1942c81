use array_model::ArrayId;
use bitflags::bitflags;

/// Storage format magic, identifying a header file produced by this crate
/// (§3 PersistentChunk on-disk layout, §6 Storage magic & versioning).
pub const STORAGE_MAGIC: u32 = 0x5C1D_B123;

/// Page-aligned size of the [`StorageHeader`] record at the start of the
/// header file.
pub const HEADER_SIZE: u64 = 4096;

/// Upper bound on the number of dimensions a [`ChunkDescriptor`] can record
/// coordinates for.
pub const MAX_NUM_DIMS_SUPPORTED: usize = 16;

/// The 4 KiB page-aligned record at the start of a storage header file
/// (§3, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageHeader {
    pub magic: u32,
    pub version_lower_bound: u32,
    pub version_upper_bound: u32,
    /// Byte offset in the header file where the next `ChunkHeader` record
    /// will be appended.
    pub curr_pos: u64,
    /// Count of non-tombstone chunk headers (§8 testable property).
    pub n_chunks: u64,
    pub instance_id: u32,
}

impl StorageHeader {
    pub fn new(instance_id: u32, version_lower_bound: u32, version_upper_bound: u32) -> Self {
        Self {
            magic: STORAGE_MAGIC,
            version_lower_bound,
            version_upper_bound,
            curr_pos: HEADER_SIZE,
            n_chunks: 0,
            instance_id,
        }
    }

    /// Validate magic and that `self`'s recorded version falls within the
    /// reader's own supported bracket (§6: "A reader refuses a file whose
    /// magic or version falls outside its own range").
    pub fn validate(
        &self,
        reader_version_lower_bound: u32,
        reader_version_upper_bound: u32,
    ) -> crate::error::Result<()> {
        use crate::error::{MagicMismatchSnafu, UnsupportedVersionSnafu};
        if self.magic != STORAGE_MAGIC {
            return MagicMismatchSnafu {
                expected: STORAGE_MAGIC,
                found: self.magic,
            }
            .fail();
        }
        if self.version_lower_bound > reader_version_upper_bound
            || self.version_upper_bound < reader_version_lower_bound
        {
            return UnsupportedVersionSnafu {
                found: self.version_upper_bound,
                lower: reader_version_lower_bound,
                upper: reader_version_upper_bound,
            }
            .fail();
        }
        Ok(())
    }
}

/// Identifies a chunk's payload location: a data-store (by guid) and a byte
/// offset within it (§3 PersistentChunk on-disk layout).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiskPos {
    pub ds_guid: u64,
    pub hdr_pos: u64,
    pub offs: u64,
}

bitflags! {
    /// `ChunkHeader` flag byte (§3).
    #[derive(Default)]
    pub struct ChunkHeaderFlags: u8 {
        const DELTA_CHUNK = 0b0000_0010;
        const TOMBSTONE   = 0b0000_1000;
    }
}

/// Compression method recorded on a [`ChunkHeader`]. Distinct from
/// `array_model::CompressionMethod` only in that this is the on-disk tag a
/// [`crate::compressor::Compressor`] is keyed by; kept separate so the
/// storage wire format doesn't change shape if the descriptor-level enum
/// grows variants the storage format doesn't support yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CompressionMethod {
    None = 0,
    Zstd = 1,
}

/// One chunk-header record (§3 PersistentChunk on-disk layout).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub storage_version: u32,
    pub pos: DiskPos,
    pub arr_id: ArrayId,
    pub attr_id: u32,
    pub compressed_size: u64,
    /// Uncompressed payload size; `header.size == allocated buffer size`
    /// whenever the chunk's data is resident (§4.2 invariant).
    pub size: u64,
    pub compression_method: CompressionMethod,
    pub flags: ChunkHeaderFlags,
    pub n_coordinates: u32,
    /// Power-of-two buddy-block size actually reserved on disk; invariant
    /// `compressedSize <= allocatedSize` (§4.2).
    pub allocated_size: u64,
    pub n_elems: u64,
    pub instance_id: u32,
}

impl ChunkHeader {
    pub fn is_tombstone(&self) -> bool {
        self.flags.contains(ChunkHeaderFlags::TOMBSTONE)
    }

    /// A tombstone header records deletion without payload: `size == 0` and
    /// the `TOMBSTONE` flag set (§3, §4.2 invariant).
    pub fn tombstone(arr_id: ArrayId, attr_id: u32, instance_id: u32, pos: DiskPos) -> Self {
        Self {
            storage_version: 1,
            pos,
            arr_id,
            attr_id,
            compressed_size: 0,
            size: 0,
            compression_method: CompressionMethod::None,
            flags: ChunkHeaderFlags::TOMBSTONE,
            n_coordinates: 0,
            allocated_size: 0,
            n_elems: 0,
            instance_id,
        }
    }
}

/// A chunk header plus its chunk's coordinates, up to
/// [`MAX_NUM_DIMS_SUPPORTED`] dimensions (§3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkDescriptor {
    pub header: ChunkHeader,
    pub coordinates: Vec<i64>,
}

impl ChunkDescriptor {
    pub fn new(header: ChunkHeader, coordinates: Vec<i64>) -> Self {
        debug_assert!(coordinates.len() <= MAX_NUM_DIMS_SUPPORTED);
        debug_assert_eq!(header.n_coordinates as usize, coordinates.len());
        Self { header, coordinates }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips_magic_and_version() {
        let h = StorageHeader::new(0, 1, 1);
        assert!(h.validate(1, 1).is_ok());
    }

    #[test]
    fn header_rejects_version_outside_reader_range() {
        let h = StorageHeader::new(0, 2, 2);
        assert!(h.validate(0, 1).is_err());
    }

    #[test]
    fn tombstone_header_has_zero_size_and_flag() {
        let h = ChunkHeader::tombstone(ArrayId(1), 0, 0, DiskPos::default());
        assert!(h.is_tombstone());
        assert_eq!(h.size, 0);
    }
}
