use array_model::InstanceId;
use snafu::Snafu;

/// Errors raised by the SG wire protocol layer (§7 "Network errors":
/// malformed message, unknown source instance; plus the query-liveness
/// check §9's redesign note asks every remote callback to make before
/// touching shared state).
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("invalid SG message: {reason}"))]
    InvalidMessage { reason: String },

    #[snafu(display("chunk message from unknown source instance {instance}"))]
    UnknownSourceInstance { instance: InstanceId },

    #[snafu(display("query is no longer live"))]
    QueryGone,

    #[snafu(display(
        "producer at attribute {attr_id} stream {stream} raised an error: {message}"
    ))]
    Remote { attr_id: u32, stream: usize, message: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
