//! The external sort engine itself (§4.6): partition the input round-robin
//! across `numJobs` sort jobs, let each fill and spill `TupleArray` runs,
//! merge runs down with `MergeSortArray` whenever the pipeline backs up,
//! and materialize the final run into a `MemArray`. A sort job that fills
//! the pipeline past `pipelineLimit` outstanding runs yields the rest of its
//! partition back to the scheduler as a fresh dispatch instead of spilling
//! further, so a merge can interleave before the pipeline grows unbounded.
//!
//! The scheduler loop runs on the calling thread and dispatches job bodies
//! onto a [`tracker::WorkQueue`] (§2: "Sorts ... drive partial runs through
//! memory ... using C8 to schedule asynchronous work"), matching jobs back
//! to completions over a `std::sync::mpsc` channel the way
//! `tracker::task::ThreadPoolJobQueue`'s own worker loop reports job
//! completion back to the queue.

use crate::config::SortConfig;
use crate::error::{QueueSnafu, Result, SchedulerChannelClosedSnafu, SchemaSnafu};
use crate::merge_sort_array::MergeSortArray;
use crate::tuple::{estimate_row_footprint, Tuple, TupleComparator};
use crate::tuple_array::TupleArray;
use array_model::{ArrayDesc, AttributeDesc, Coordinates, DimensionDesc, PartitioningScheme};
use chunk::{AccessMode, Array, EmptyBitmap, MemArray, MemChunk, Payload, Value};
use parking_lot::Mutex as PlMutex;
use snafu::ResultExt;
use std::sync::mpsc;
use std::sync::Arc;
use tracker::{JobQueue, ThreadPoolJobQueue, WorkQueue};

/// The declared chunk interval of the sorted output's unbounded dimension
/// `n` (§8 Scenario 1: `[n=0:*,1000000,0]`).
const OUTPUT_CHUNK_INTERVAL: i64 = 1_000_000;

enum JobDone {
    Sort,
    Merge,
}

/// Run the external sort end to end (§4.6 steps 1-4) and return the
/// materialized `MemArray`. `preserve_positions` appends `chunkPos`/`cellPos`
/// coordinate attributes to the output schema (§4.6 "Output: ... Optional
/// `preservePositions`").
pub fn external_sort(
    input: Arc<dyn Array>,
    comparator: Arc<dyn TupleComparator>,
    config: SortConfig,
    preserve_positions: bool,
) -> Result<Arc<MemArray>> {
    let source_desc = input.array_desc().clone();
    let data_attrs: Vec<u32> = source_desc.data_attributes().map(AttributeDesc::id).collect();
    let row_footprint = estimate_row_footprint(&source_desc, preserve_positions);

    // §4.6 Configuration: "numJobs ... 1 if input is not RANDOM".
    let num_jobs = if input.supported_access() == AccessMode::Random {
        config.num_jobs
    } else {
        1
    };

    let partitions = partition_positions(input.as_ref(), num_jobs);
    let num_partitions = partitions.len();

    let metrics = metric::Registry::new();
    let pool = ThreadPoolJobQueue::new("extsort", num_jobs.max(1));
    let queue = WorkQueue::new(
        "extsort-jobs",
        pool as Arc<dyn JobQueue>,
        num_jobs.max(1),
        num_jobs.max(1) + config.pipeline_limit,
        &metrics,
    );

    let results: Arc<PlMutex<Vec<Vec<Tuple>>>> = Arc::new(PlMutex::new(Vec::new()));
    let (done_tx, done_rx) = mpsc::channel::<JobDone>();

    for partition in partitions {
        let ctx = SortJobCtx {
            queue: Arc::clone(&queue),
            input: Arc::clone(&input),
            data_attrs: data_attrs.clone(),
            positions: partition,
            comparator: Arc::clone(&comparator),
            row_footprint,
            config,
            preserve_positions,
            results: Arc::clone(&results),
            tx: done_tx.clone(),
        };
        dispatch_sort_job(ctx)?;
    }

    // §4.6 step 3 "Scheduler loop": reap finished jobs, then decide whether
    // the next dispatch is another merge or (were sort jobs still dynamic)
    // another partition. Every partition here is already dispatched
    // up-front — see the module doc comment — so the only dispatch
    // decision left at each reap is "does the pipeline need a merge".
    let mut partitions_remaining = num_partitions;
    let mut merges_in_flight = 0usize;

    loop {
        if partitions_remaining == 0 && merges_in_flight == 0 && results.lock().len() <= 1 {
            break;
        }

        match done_rx.recv() {
            Ok(JobDone::Sort) => partitions_remaining -= 1,
            Ok(JobDone::Merge) => merges_in_flight -= 1,
            Err(_disconnected) => return SchedulerChannelClosedSnafu.fail(),
        }

        let results_len = results.lock().len();
        let all_partitions_done = partitions_remaining == 0 && merges_in_flight == 0;
        let should_merge = results_len > config.n_streams || (all_partitions_done && results_len > 1);

        if should_merge {
            let take_n = config.n_streams.min(results_len);
            let runs: Vec<Vec<Tuple>> = results.lock().drain(0..take_n).collect();
            let comparator = Arc::clone(&comparator);
            let results = Arc::clone(&results);
            let tx = done_tx.clone();
            merges_in_flight += 1;
            queue
                .enqueue(Box::new(move || {
                    let merged = MergeSortArray::new(runs).drain_all(comparator.as_ref());
                    results.lock().push(merged);
                    let _ = tx.send(JobDone::Merge);
                }))
                .context(QueueSnafu)?;
        }
    }

    let final_run = results.lock().pop().unwrap_or_default();
    build_output(&source_desc, final_run, preserve_positions)
}

/// Split the input's chunk positions (read off attribute 0's iterator, the
/// "shape" attribute every array has) round-robin across `num_jobs`
/// partitions (§4.6 step 1 "split chunks of the input round-robin across
/// `numJobs` sort jobs").
fn partition_positions(input: &dyn Array, num_jobs: usize) -> Vec<Vec<Coordinates>> {
    let num_jobs = num_jobs.max(1);
    let mut positions = Vec::new();
    let mut it = input.get_array_iterator(0);
    while !it.end() {
        if let Some(pos) = it.get_position() {
            positions.push(pos.clone());
        }
        it.advance();
    }

    let mut parts = vec![Vec::new(); num_jobs];
    for (i, pos) in positions.into_iter().enumerate() {
        parts[i % num_jobs].push(pos);
    }
    parts
}

/// The state one sort job's (possibly several) dispatches over a partition
/// share: the partition shrinks every time the job yields back to the
/// scheduler with runs still outstanding past `pipelineLimit`.
struct SortJobCtx {
    queue: Arc<WorkQueue>,
    input: Arc<dyn Array>,
    data_attrs: Vec<u32>,
    positions: Vec<Coordinates>,
    comparator: Arc<dyn TupleComparator>,
    row_footprint: usize,
    config: SortConfig,
    preserve_positions: bool,
    results: Arc<PlMutex<Vec<Vec<Tuple>>>>,
    tx: mpsc::Sender<JobDone>,
}

/// Enqueue the first dispatch of a partition's sort job.
fn dispatch_sort_job(ctx: SortJobCtx) -> Result<()> {
    let queue = Arc::clone(&ctx.queue);
    queue
        .enqueue(Box::new(move || run_sort_job_and_requeue(ctx)))
        .context(QueueSnafu)
}

/// Run a dispatch of `run_sort_job` and, if it yielded with positions still
/// unprocessed (§4.6 step 1/3: the shared run count reached `pipelineLimit`),
/// re-enqueue the rest of the partition as a fresh job so the scheduler loop
/// gets a turn to interleave a merge before this partition piles on more
/// runs. Only the final dispatch of a partition reports `JobDone::Sort`.
fn run_sort_job_and_requeue(ctx: SortJobCtx) {
    let remaining = run_sort_job(
        ctx.input.as_ref(),
        &ctx.data_attrs,
        &ctx.positions,
        ctx.comparator.as_ref(),
        ctx.row_footprint,
        ctx.config.mem_limit,
        ctx.config.pipeline_limit,
        ctx.preserve_positions,
        &ctx.results,
    );

    if remaining.is_empty() {
        let _ = ctx.tx.send(JobDone::Sort);
        return;
    }

    let queue = Arc::clone(&ctx.queue);
    let next = SortJobCtx { positions: remaining, ..ctx };
    match queue.reserve() {
        Ok(reservation) => queue.enqueue_reserved(reservation, Box::new(move || run_sort_job_and_requeue(next))),
        // Queue briefly at capacity: keep making progress on this worker
        // rather than stalling the partition indefinitely. Degrades to a
        // non-interleaved finish for the rest of this partition only.
        Err(_) => run_sort_job_and_requeue(next),
    }
}

/// One dispatch of a sort job's body (§4.6 step 1): walk this partition's
/// remaining chunk positions, extract a tuple per live cell, and spill a
/// sorted run whenever the accumulating `TupleArray` would cross
/// `mem_limit`. Once a whole position's rows have spilled a run and the
/// shared run count has reached `pipeline_limit`, stop and return the
/// positions not yet processed (§4.6 step 1/3, §8's memory-bound property)
/// rather than continuing to pile runs onto an already-backed-up pipeline.
#[allow(clippy::too_many_arguments)]
fn run_sort_job(
    input: &dyn Array,
    data_attrs: &[u32],
    positions: &[Coordinates],
    comparator: &dyn TupleComparator,
    row_footprint: usize,
    mem_limit: usize,
    pipeline_limit: usize,
    preserve_positions: bool,
    results: &PlMutex<Vec<Vec<Tuple>>>,
) -> Vec<Coordinates> {
    let mut current = TupleArray::new(row_footprint);
    for (i, pos) in positions.iter().enumerate() {
        let mut spilled = false;
        for row in extract_tuples(input, data_attrs, pos, preserve_positions) {
            current.push(row);
            if current.estimated_bytes() >= mem_limit {
                current.sort(comparator);
                results.lock().push(current.into_rows());
                current = TupleArray::new(row_footprint);
                spilled = true;
            }
        }
        if spilled && results.lock().len() >= pipeline_limit {
            return positions[i + 1..].to_vec();
        }
    }
    if !current.is_empty() {
        current.sort(comparator);
        results.lock().push(current.into_rows());
    }
    Vec::new()
}

/// Read every data attribute's chunk at `pos` and emit one tuple per live
/// cell, in `data_attrs` order, optionally followed by `(chunkPos, cellPos)`
/// when `preserve_positions` is set (§4.6 Output "preservePositions").
fn extract_tuples(
    input: &dyn Array,
    data_attrs: &[u32],
    pos: &Coordinates,
    preserve_positions: bool,
) -> Vec<Tuple> {
    let mut per_attr_dense: Vec<Vec<Value>> = Vec::with_capacity(data_attrs.len());
    let mut bitmap: Option<Arc<EmptyBitmap>> = None;
    let mut chunk_len = 0usize;

    for &attr_id in data_attrs {
        let mut it = input.get_array_iterator(attr_id);
        if !it.set_position(pos) {
            per_attr_dense.push(Vec::new());
            continue;
        }
        let chunk = it.get_chunk();
        let mem = chunk
            .as_any()
            .downcast_ref::<MemChunk>()
            .expect("external sort input is MemChunk-backed");
        let dense = mem.payload().to_dense();
        chunk_len = chunk_len.max(dense.len());
        if bitmap.is_none() {
            bitmap = mem.empty_bitmap().cloned();
        }
        per_attr_dense.push(dense);
    }

    let mut rows = Vec::new();
    for i in 0..chunk_len {
        let live = match &bitmap {
            Some(b) => b.is_live(i),
            None => per_attr_dense
                .iter()
                .any(|d| d.get(i).map(|v| !v.is_null()).unwrap_or(false)),
        };
        if !live {
            continue;
        }
        let mut row: Tuple = per_attr_dense
            .iter()
            .map(|d| d.get(i).cloned().unwrap_or(Value::Null))
            .collect();
        if preserve_positions {
            row.push(Value::String(pos.to_string()));
            row.push(Value::Int64(i as i64));
        }
        rows.push(row);
    }
    rows
}

/// Materialize the fully merged run into a `MemArray` with the unbounded
/// dimension `n` and synthetic empty tag (§4.6 Output).
fn build_output(source_desc: &ArrayDesc, rows: Vec<Tuple>, preserve_positions: bool) -> Result<Arc<MemArray>> {
    let mut attrs: Vec<AttributeDesc> = source_desc.data_attributes().cloned().collect();
    if preserve_positions {
        let chunk_pos_id = attrs.len() as u32;
        attrs.push(AttributeDesc::new(chunk_pos_id, "chunkPos", "string"));
        attrs.push(AttributeDesc::new(chunk_pos_id + 1, "cellPos", "int64"));
    }
    let empty_id = attrs.len() as u32;
    attrs.push(AttributeDesc::empty_indicator(empty_id));
    let num_data_attrs = attrs.len() - 1;

    // An empty result is a zero-length dimension (§8 boundary: "a sort over
    // an empty array returns an empty array whose schema matches the
    // computed output schema").
    let end_max = if rows.is_empty() { -1 } else { i64::MAX };
    let dim = DimensionDesc::new("n", 0, end_max, OUTPUT_CHUNK_INTERVAL, 0).context(SchemaSnafu)?;

    let out_desc = ArrayDesc::new(
        format!("{}_sorted", source_desc.name()),
        source_desc.uaid(),
        source_desc.id(),
        source_desc.version(),
        attrs,
        vec![dim],
        PartitioningScheme::LocalInstance,
    )
    .context(SchemaSnafu)?;

    let out = MemArray::new(out_desc.clone());
    if rows.is_empty() {
        return Ok(out);
    }

    let mut start = 0usize;
    while start < rows.len() {
        let end = (start + OUTPUT_CHUNK_INTERVAL as usize).min(rows.len());
        let chunk_rows = &rows[start..end];
        let first_pos = Coordinates::new(vec![start as i64]);
        let bitmap = Arc::new(EmptyBitmap::new_all_full(chunk_rows.len()));

        for attr_idx in 0..num_data_attrs {
            let mut chunk = MemChunk::new_for_position(&out_desc, attr_idx as u32, &first_pos);
            let column: Vec<Value> = chunk_rows.iter().map(|r| r[attr_idx].clone()).collect();
            chunk.set_payload(Payload::Dense(column));
            chunk.set_empty_bitmap(Arc::clone(&bitmap));
            out.insert_chunk(chunk);
        }
        start = end;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple::{ColumnComparator, SortKey};
    use array_model::{AttributeDesc, ArrayId, UnversionedArrayId};

    fn input_desc(end_max: i64, chunk_interval: i64) -> ArrayDesc {
        ArrayDesc::new(
            "A",
            UnversionedArrayId(1),
            ArrayId(1),
            0,
            vec![AttributeDesc::new(0, "v", "int64")],
            vec![DimensionDesc::new("i", 0, end_max, chunk_interval, 0).unwrap()],
            PartitioningScheme::Replication,
        )
        .unwrap()
    }

    fn input_array(values: &[i64], chunk_interval: i64) -> Arc<dyn Array> {
        let desc = input_desc(values.len() as i64 - 1, chunk_interval);
        let arr = MemArray::new(desc.clone());
        let mut start = 0usize;
        while start < values.len() {
            let end = (start + chunk_interval as usize).min(values.len());
            let slice = &values[start..end];
            let mut chunk = MemChunk::new_for_position(&desc, 0, &Coordinates::new(vec![start as i64]));
            chunk.set_payload(Payload::Dense(slice.iter().map(|v| Value::Int64(*v)).collect()));
            chunk.set_empty_bitmap(Arc::new(EmptyBitmap::new_all_full(slice.len())));
            arr.insert_chunk(chunk);
            start = end;
        }
        arr
    }

    fn sorted_values(out: &MemArray) -> Vec<i64> {
        let mut it = out.get_array_iterator(0);
        let mut values = Vec::new();
        while !it.end() {
            let chunk = it.get_chunk();
            let mem = chunk.as_any().downcast_ref::<MemChunk>().unwrap();
            for v in mem.payload().to_dense() {
                match v {
                    Value::Int64(n) => values.push(n),
                    other => panic!("unexpected value {other:?}"),
                }
            }
            it.advance();
        }
        values
    }

    /// §8 Scenario 1: sort `[3,1,4,1,5]` ascending on `v` over a single
    /// in-memory chunk; expect `[1,1,3,4,5]` out.
    #[test]
    fn scenario_sort_ascending_in_memory() {
        let input = input_array(&[3, 1, 4, 1, 5], 5);
        let comparator: Arc<dyn TupleComparator> = Arc::new(ColumnComparator::new(vec![SortKey::ascending(0)]));
        let out = external_sort(input, comparator, SortConfig::default(), false).unwrap();
        assert_eq!(sorted_values(&out), vec![1, 1, 3, 4, 5]);
    }

    #[test]
    fn sort_preserves_length_and_total_order_with_duplicate_keys() {
        let values: Vec<i64> = (0..200).map(|i| (i * 37) % 53).collect();
        let input = input_array(&values, 16);
        let comparator: Arc<dyn TupleComparator> = Arc::new(ColumnComparator::new(vec![SortKey::ascending(0)]));
        let out = external_sort(input, comparator, SortConfig::default(), false).unwrap();
        let result = sorted_values(&out);
        assert_eq!(result.len(), values.len());
        assert!(result.windows(2).all(|w| w[0] <= w[1]));
    }

    /// §8 Scenario 5 (scaled down): force multiple spilled runs by setting
    /// `memLimit` far below the input size, and check the merged output is
    /// a single fully sorted run.
    #[test]
    fn sort_spills_multiple_runs_and_merges_to_a_total_order() {
        let n = 2_000i64;
        let values: Vec<i64> = (0..n).rev().collect();
        let input = input_array(&values, 200);
        let comparator: Arc<dyn TupleComparator> = Arc::new(ColumnComparator::new(vec![SortKey::ascending(0)]));
        // one int64 column ~ 8 bytes/row; a 256-byte mem_limit spills
        // roughly every 32 rows, forcing many runs through the merge path.
        let config = SortConfig::new(256, 4, 8, 1);
        let out = external_sort(input, comparator, config, false).unwrap();
        let result = sorted_values(&out);
        assert_eq!(result.len(), n as usize);
        assert!(result.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(result.first(), Some(&0));
        assert_eq!(result.last(), Some(&(n - 1)));
    }

    #[test]
    fn sort_over_empty_array_returns_empty_array_with_matching_schema() {
        let desc = input_desc(-1, 4);
        let input = MemArray::new(desc);
        let comparator: Arc<dyn TupleComparator> = Arc::new(ColumnComparator::new(vec![SortKey::ascending(0)]));
        let out = external_sort(input, comparator, SortConfig::default(), false).unwrap();
        assert_eq!(out.num_chunks(), 0);
        assert_eq!(out.array_desc().attributes().len(), 2); // v + empty tag
    }
}
