//! `MergeSortArray` (§4.6): "a k-way merge: at each step it evaluates the
//! comparator on the head tuple of each stream, emits the minimum, and
//! advances that stream." Runs over already-sorted in-memory runs, which is
//! all a `MergeJob` ever hands it (§4.6 step 2).

use crate::tuple::{Tuple, TupleComparator};
use std::cmp::Ordering;

/// A k-way merge over `n_streams` sorted runs. Ties are broken by the
/// lower stream index (§4.6 Guarantees: "ties resolved by stream index"),
/// which also makes the merge itself stable when every input run is.
#[derive(Debug)]
pub struct MergeSortArray {
    streams: Vec<std::vec::IntoIter<Tuple>>,
    heads: Vec<Option<Tuple>>,
}

impl MergeSortArray {
    pub fn new(runs: Vec<Vec<Tuple>>) -> Self {
        let mut streams: Vec<std::vec::IntoIter<Tuple>> =
            runs.into_iter().map(|r| r.into_iter()).collect();
        let heads = streams.iter_mut().map(|s| s.next()).collect();
        Self { streams, heads }
    }

    pub fn num_streams(&self) -> usize {
        self.streams.len()
    }

    /// Pop the next tuple in the merged order, or `None` once every stream
    /// is exhausted.
    pub fn next(&mut self, comparator: &dyn TupleComparator) -> Option<Tuple> {
        let mut min_idx: Option<usize> = None;
        for i in 0..self.heads.len() {
            if self.heads[i].is_none() {
                continue;
            }
            min_idx = match min_idx {
                None => Some(i),
                Some(j) => {
                    let ord = comparator.compare(
                        self.heads[i].as_ref().unwrap(),
                        self.heads[j].as_ref().unwrap(),
                    );
                    // Strictly `Less` only: ties keep the earlier (lower-
                    // index) stream's tuple as the winner.
                    if ord == Ordering::Less {
                        Some(i)
                    } else {
                        Some(j)
                    }
                }
            };
        }
        let idx = min_idx?;
        let result = self.heads[idx].take();
        self.heads[idx] = self.streams[idx].next();
        result
    }

    /// Drain the full merge into one sorted run (what a `MergeJob`
    /// produces, per §4.6 step 2).
    pub fn drain_all(mut self, comparator: &dyn TupleComparator) -> Vec<Tuple> {
        let mut out = Vec::new();
        while let Some(t) = self.next(comparator) {
            out.push(t);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple::{ColumnComparator, SortKey};
    use chunk::Value;

    fn run(vals: &[i64]) -> Vec<Tuple> {
        vals.iter().map(|v| vec![Value::Int64(*v)]).collect()
    }

    #[test]
    fn merges_sorted_runs_into_one_sorted_sequence() {
        let merge = MergeSortArray::new(vec![run(&[1, 4, 7]), run(&[2, 3, 9]), run(&[0, 5])]);
        let cmp = ColumnComparator::new(vec![SortKey::ascending(0)]);
        let out = merge.drain_all(&cmp);
        let vals: Vec<_> = out.iter().map(|r| r[0].as_int64().unwrap()).collect();
        assert_eq!(vals, vec![0, 1, 2, 3, 4, 5, 7, 9]);
    }

    #[test]
    fn ties_resolve_to_the_lower_stream_index() {
        // Both streams offer a `1` first; stream 0's tuple must win.
        let a = vec![Value::Int64(1)];
        let b = vec![Value::Int64(1)];
        let mut merge = MergeSortArray::new(vec![vec![a.clone()], vec![b.clone()]]);
        let cmp = ColumnComparator::new(vec![SortKey::ascending(0)]);
        let first = merge.next(&cmp).unwrap();
        assert_eq!(first, a);
        let second = merge.next(&cmp).unwrap();
        assert_eq!(second, b);
        assert!(merge.next(&cmp).is_none());
    }

    #[test]
    fn empty_runs_merge_to_empty() {
        let merge = MergeSortArray::new(vec![vec![], vec![]]);
        let cmp = ColumnComparator::new(vec![SortKey::ascending(0)]);
        assert!(merge.drain_all(&cmp).is_empty());
    }
}
