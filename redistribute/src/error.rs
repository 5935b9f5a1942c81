use array_model::Address;
use snafu::Snafu;

/// Errors raised while merging received chunks into a destination array
/// (§4.5 "Chunk merge at the destination").
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("pulling redistributed chunks failed: {source}"))]
    Pull { source: stream_array::Error },

    #[snafu(display("no cached empty-bitmap chunk for {address:?}; bitmap attribute must precede its data attributes"))]
    MissingBitmap { address: Address },
}

impl From<stream_array::Error> for Error {
    fn from(source: stream_array::Error) -> Self {
        Error::Pull { source }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
