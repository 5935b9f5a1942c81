//! Sort configuration (§4.6 "Configuration (from global config)"). A plain
//! struct rather than a reach into a global-config singleton, per the
//! ambient-stack redesign note (SPEC_FULL.md §1: "pass a context handle
//! through operator `execute()` rather than reaching for a singleton").

/// `memLimit` bounds one sort job's `TupleArray` before it spills to a run;
/// `nStreams` is the merge fan-in; `pipelineLimit` bounds how many runs may
/// be alive at once; `numJobs` is the sort-side parallelism, forced to 1 by
/// the caller when the input isn't `RANDOM` access (§4.6 Configuration).
#[derive(Debug, Clone, Copy)]
pub struct SortConfig {
    pub mem_limit: usize,
    pub n_streams: usize,
    pub pipeline_limit: usize,
    pub num_jobs: usize,
}

impl SortConfig {
    pub fn new(mem_limit: usize, n_streams: usize, pipeline_limit: usize, num_jobs: usize) -> Self {
        let n_streams = n_streams.max(2);
        Self {
            mem_limit: mem_limit.max(1),
            n_streams,
            pipeline_limit: pipeline_limit.max(n_streams),
            num_jobs: num_jobs.max(1),
        }
    }
}

impl Default for SortConfig {
    /// A small-but-workable default for tests and callers that don't read
    /// from a real deployment's configuration.
    fn default() -> Self {
        Self::new(32 * 1024 * 1024, 4, 8, 1)
    }
}
