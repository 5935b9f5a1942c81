use snafu::Snafu;

/// Errors raised while building or validating array/dimension/attribute
/// descriptors. Cell- and chunk-level errors live in the `chunk` crate;
/// this one stays scoped to the descriptor types defined here.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display(
        "dimension '{name}' has non-positive chunk interval {chunk_interval}"
    ))]
    NonPositiveChunkInterval { name: String, chunk_interval: i64 },

    #[snafu(display(
        "dimension '{name}' current range [{curr_start}, {curr_end}] is outside \
         declared range [{start_min}, {end_max}]"
    ))]
    CurrentRangeOutOfBounds {
        name: String,
        curr_start: i64,
        curr_end: i64,
        start_min: i64,
        end_max: i64,
    },

    #[snafu(display("array descriptor has no dimensions"))]
    NoDimensions,

    #[snafu(display(
        "coordinates have {got} components, dimension descriptor has {expected}"
    ))]
    CoordinateArity { got: usize, expected: usize },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
