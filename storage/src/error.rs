use array_model::Address;
use snafu::Snafu;

/// Errors raised by the persistent-chunk / storage-header layer (§4.2, §7
/// "Storage errors").
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("chunk {address:?} accessed without a matching pin()"))]
    ChunkNotPinned { address: Address },

    #[snafu(display("cannot reallocate chunk {address:?}: {reason}"))]
    ReallocationFailed { address: Address, reason: String },

    #[snafu(display(
        "storage header magic mismatch: expected {expected:#x}, found {found:#x}"
    ))]
    MagicMismatch { expected: u32, found: u32 },

    #[snafu(display(
        "storage header version {found} outside supported range [{lower}, {upper}]"
    ))]
    UnsupportedVersion { found: u32, lower: u32, upper: u32 },

    #[snafu(display("corrupted chunk header at {address:?}: {reason}"))]
    CorruptedHeader { address: Address, reason: String },

    #[snafu(display("missing data store {ds_guid}"))]
    MissingDataStore { ds_guid: u64 },

    #[snafu(display("compression failed for chunk {address:?}: {reason}"))]
    CompressionFailed { address: Address, reason: String },

    #[snafu(display("decompression failed for chunk {address:?}: {reason}"))]
    DecompressionFailed { address: Address, reason: String },

    #[snafu(display("no chunk recorded at {address:?}"))]
    ChunkNotFound { address: Address },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
