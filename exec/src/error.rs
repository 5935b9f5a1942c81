use snafu::Snafu;

/// Errors raised while building, validating, or running a query's physical
/// plan (§7: user/system errors propagate synchronously from `execute()` to
/// fail the query; resource errors cover the coordinator/worker handshake).
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("query {query_id} was cancelled"))]
    QueryCancelled { query_id: trace::QueryId },

    #[snafu(display("query {query_id} failed: {reason}"))]
    QueryFailed { query_id: trace::QueryId, reason: String },

    #[snafu(display(
        "coordinator gave up waiting for {waiting_on}'s notification after {elapsed_ms}ms \
         (SCIDB_LE_RESOURCE_BUSY)"
    ))]
    ResourceBusy { waiting_on: String, elapsed_ms: u64 },

    #[snafu(display("external sort operator failed: {source}"))]
    Sort { source: extsort::Error },

    #[snafu(display("redistribute operator failed: {source}"))]
    Redistribute { source: redistribute::Error },

    #[snafu(display("pulling an input stream failed: {source}"))]
    Pull { source: scatter_gather::Error },
}

impl From<tracker::Error> for Error {
    fn from(source: tracker::Error) -> Self {
        match source {
            tracker::Error::DeadlockTimeout { waiting_on, elapsed_ms } => {
                Error::ResourceBusy { waiting_on, elapsed_ms }
            }
            other => Error::QueryFailed {
                query_id: trace::QueryId::new(0),
                reason: other.to_string(),
            },
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
