use crate::error::{CompressionFailedSnafu, DecompressionFailedSnafu, Result};
use crate::header::CompressionMethod;
use array_model::Address;

/// A pluggable (de)compression strategy keyed by [`CompressionMethod`] (§4.2
/// `compress`/`decompress`). The teacher's `parquet_file` crate depends on
/// `zstd` for exactly this purpose, so the default implementation wraps the
/// same crate.
pub trait Compressor: std::fmt::Debug + Send + Sync {
    fn method(&self) -> CompressionMethod;
    fn compress(&self, address: &Address, buf: &[u8]) -> Result<Vec<u8>>;
    fn decompress(&self, address: &Address, buf: &[u8], decompressed_size: usize) -> Result<Vec<u8>>;
}

/// No-op compressor: payload passes through unchanged.
#[derive(Debug, Default)]
pub struct NoneCompressor;

impl Compressor for NoneCompressor {
    fn method(&self) -> CompressionMethod {
        CompressionMethod::None
    }

    fn compress(&self, _address: &Address, buf: &[u8]) -> Result<Vec<u8>> {
        Ok(buf.to_vec())
    }

    fn decompress(&self, _address: &Address, buf: &[u8], _decompressed_size: usize) -> Result<Vec<u8>> {
        Ok(buf.to_vec())
    }
}

/// Zstd-backed compressor, the default for real-attribute chunk bodies.
#[derive(Debug)]
pub struct ZstdCompressor {
    level: i32,
}

impl ZstdCompressor {
    pub fn new(level: i32) -> Self {
        Self { level }
    }
}

impl Default for ZstdCompressor {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Compressor for ZstdCompressor {
    fn method(&self) -> CompressionMethod {
        CompressionMethod::Zstd
    }

    fn compress(&self, address: &Address, buf: &[u8]) -> Result<Vec<u8>> {
        zstd::bulk::compress(buf, self.level).map_err(|e| {
            CompressionFailedSnafu {
                address: address.clone(),
                reason: e.to_string(),
            }
            .build()
        })
    }

    fn decompress(&self, address: &Address, buf: &[u8], decompressed_size: usize) -> Result<Vec<u8>> {
        zstd::bulk::decompress(buf, decompressed_size).map_err(|e| {
            DecompressionFailedSnafu {
                address: address.clone(),
                reason: e.to_string(),
            }
            .build()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use array_model::Coordinates;

    fn addr() -> Address {
        Address::new(0, Coordinates::new(vec![0]))
    }

    #[test]
    fn zstd_round_trips_a_buffer() {
        let c = ZstdCompressor::default();
        let original = b"hello chunk payload".repeat(8);
        let compressed = c.compress(&addr(), &original).unwrap();
        let restored = c.decompress(&addr(), &compressed, original.len()).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn none_compressor_is_identity() {
        let c = NoneCompressor;
        let original = vec![1u8, 2, 3, 4];
        let compressed = c.compress(&addr(), &original).unwrap();
        assert_eq!(compressed, original);
        let restored = c.decompress(&addr(), &compressed, original.len()).unwrap();
        assert_eq!(restored, original);
    }
}
