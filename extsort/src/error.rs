use snafu::Snafu;

/// Errors raised while building or draining an external sort (§7: resource
/// errors for the scheduler, system errors for a malformed output schema).
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("computing the sorted output's array descriptor failed: {source}"))]
    Schema { source: array_model::Error },

    #[snafu(display("scheduling a sort or merge job failed: {source}"))]
    Queue { source: tracker::Error },

    #[snafu(display(
        "sort scheduler's job-completion channel closed before every partition finished; \
         a sort or merge job likely panicked"
    ))]
    SchedulerChannelClosed,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
