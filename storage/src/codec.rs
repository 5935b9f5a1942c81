//! Explicit little-endian byte framing for the on-disk header records (§3,
//! §6). A stable on-disk layout is not a Rust-only wire format, so this
//! follows the teacher's `byteorder`-based framing rather than a
//! Rust-specific serialization crate.
use crate::header::{
    ChunkHeader, ChunkHeaderFlags, CompressionMethod, DiskPos, StorageHeader, STORAGE_MAGIC,
};
use array_model::ArrayId;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

pub const STORAGE_HEADER_WIRE_SIZE: usize = 32;
pub const CHUNK_HEADER_WIRE_SIZE: usize = 82;

impl StorageHeader {
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u32::<LittleEndian>(self.magic)?;
        w.write_u32::<LittleEndian>(self.version_lower_bound)?;
        w.write_u32::<LittleEndian>(self.version_upper_bound)?;
        w.write_u64::<LittleEndian>(self.curr_pos)?;
        w.write_u64::<LittleEndian>(self.n_chunks)?;
        w.write_u32::<LittleEndian>(self.instance_id)?;
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        Ok(Self {
            magic: r.read_u32::<LittleEndian>()?,
            version_lower_bound: r.read_u32::<LittleEndian>()?,
            version_upper_bound: r.read_u32::<LittleEndian>()?,
            curr_pos: r.read_u64::<LittleEndian>()?,
            n_chunks: r.read_u64::<LittleEndian>()?,
            instance_id: r.read_u32::<LittleEndian>()?,
        })
    }
}

impl DiskPos {
    fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u64::<LittleEndian>(self.ds_guid)?;
        w.write_u64::<LittleEndian>(self.hdr_pos)?;
        w.write_u64::<LittleEndian>(self.offs)?;
        Ok(())
    }

    fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        Ok(Self {
            ds_guid: r.read_u64::<LittleEndian>()?,
            hdr_pos: r.read_u64::<LittleEndian>()?,
            offs: r.read_u64::<LittleEndian>()?,
        })
    }
}

impl ChunkHeader {
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u32::<LittleEndian>(self.storage_version)?;
        self.pos.write_to(w)?;
        w.write_u64::<LittleEndian>(self.arr_id.0)?;
        w.write_u32::<LittleEndian>(self.attr_id)?;
        w.write_u64::<LittleEndian>(self.compressed_size)?;
        w.write_u64::<LittleEndian>(self.size)?;
        w.write_u8(self.compression_method as u8)?;
        w.write_u8(self.flags.bits())?;
        w.write_u32::<LittleEndian>(self.n_coordinates)?;
        w.write_u64::<LittleEndian>(self.allocated_size)?;
        w.write_u64::<LittleEndian>(self.n_elems)?;
        w.write_u32::<LittleEndian>(self.instance_id)?;
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let storage_version = r.read_u32::<LittleEndian>()?;
        let pos = DiskPos::read_from(r)?;
        let arr_id = ArrayId(r.read_u64::<LittleEndian>()?);
        let attr_id = r.read_u32::<LittleEndian>()?;
        let compressed_size = r.read_u64::<LittleEndian>()?;
        let size = r.read_u64::<LittleEndian>()?;
        let compression_method = match r.read_u8()? {
            1 => CompressionMethod::Zstd,
            _ => CompressionMethod::None,
        };
        let flags = ChunkHeaderFlags::from_bits_truncate(r.read_u8()?);
        let n_coordinates = r.read_u32::<LittleEndian>()?;
        let allocated_size = r.read_u64::<LittleEndian>()?;
        let n_elems = r.read_u64::<LittleEndian>()?;
        let instance_id = r.read_u32::<LittleEndian>()?;
        Ok(Self {
            storage_version,
            pos,
            arr_id,
            attr_id,
            compressed_size,
            size,
            compression_method,
            flags,
            n_coordinates,
            allocated_size,
            n_elems,
            instance_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_header_round_trips_through_bytes() {
        let h = StorageHeader::new(3, 1, 2);
        let mut buf = Vec::new();
        h.write_to(&mut buf).unwrap();
        let back = StorageHeader::read_from(&mut &buf[..]).unwrap();
        assert_eq!(h, back);
    }

    #[test]
    fn chunk_header_round_trips_through_bytes() {
        let h = ChunkHeader {
            storage_version: 1,
            pos: DiskPos {
                ds_guid: 7,
                hdr_pos: 4096,
                offs: 128,
            },
            arr_id: ArrayId(42),
            attr_id: 0,
            compressed_size: 64,
            size: 128,
            compression_method: CompressionMethod::Zstd,
            flags: ChunkHeaderFlags::empty(),
            n_coordinates: 1,
            allocated_size: 128,
            n_elems: 16,
            instance_id: 0,
        };
        let mut buf = Vec::new();
        h.write_to(&mut buf).unwrap();
        let back = ChunkHeader::read_from(&mut &buf[..]).unwrap();
        assert_eq!(h, back);
    }
}
