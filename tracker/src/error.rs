use snafu::Snafu;

/// User-visible resource errors raised by the work-queue layer (§7: "Resource
/// errors ... queue overflow"). `PushBack` (inter-queue back-pressure) and a
/// scheduler-level retry are deliberately *not* members of this enum — they
/// are control-flow signals absorbed by the caller, not failures (§7 Retry
/// signals, §9 redesign note).
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("work queue overflow: size {size} would exceed max {max}"))]
    Overflow { size: usize, max: usize },

    #[snafu(display("deadlock timeout waiting for {waiting_on} after {elapsed_ms}ms"))]
    DeadlockTimeout { waiting_on: String, elapsed_ms: u64 },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
