use array_model::Coordinates;
use snafu::Snafu;

/// User/system errors raised by cell-level iteration and chunk-level merges
/// (§7: "Cell-level iteration and chunk-level merges raise user/system
/// errors synchronously; the operator propagates to `execute()` which fails
/// the query").
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("setPosition({pos}) failed during chunk merge"))]
    SetPositionFailed { pos: Coordinates },

    #[snafu(display(
        "chunk size mismatch in bitwise merge: {left} vs {right} cells"
    ))]
    ChunkSizeMismatch { left: usize, right: usize },

    #[snafu(display("attribute {attr_id} opened with NO_EMPTY_CHECK but no empty bitmap is available"))]
    MissingEmptyBitmap { attr_id: u32 },

    #[snafu(display("write attempted on a chunk iterator not opened for writing"))]
    NotWritable,

    #[snafu(display("getItem() called past end of chunk iteration"))]
    IteratorExhausted,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
