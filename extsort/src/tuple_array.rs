//! `TupleArray` (§4.6): the in-memory buffer one sort job fills until it
//! reaches `memLimit`, then sorts in place and hands off as a run.

use crate::tuple::{Tuple, TupleComparator};

/// A bounded in-memory run: rows accumulate until [`TupleArray::estimated_bytes`]
/// would exceed the caller's `memLimit`, at which point the caller sorts it
/// and starts a fresh one (§4.6 step 1). Sorting uses Rust's stable
/// `sort_by`, so within one run ties keep their arrival order — the
/// "ties resolved by stream index" guarantee (§4.6 Guarantees) only matters
/// once runs are merged, at which point [`crate::merge_sort_array::MergeSortArray`]
/// takes over tie-breaking.
#[derive(Debug, Default)]
pub struct TupleArray {
    rows: Vec<Tuple>,
    row_footprint: usize,
}

impl TupleArray {
    pub fn new(row_footprint: usize) -> Self {
        Self {
            rows: Vec::new(),
            row_footprint: row_footprint.max(1),
        }
    }

    pub fn push(&mut self, row: Tuple) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// A plain `rows * estimated-row-footprint` bound, cheap enough to call
    /// after every push (§4.6 "fills a `TupleArray` ... until `memLimit` is
    /// reached").
    pub fn estimated_bytes(&self) -> usize {
        self.rows.len() * self.row_footprint
    }

    /// Sort in place with the supplied comparator (§4.6 "sorts in place
    /// with an introspective quicksort / tuple comparator"). Rust's pattern-
    /// defeating quicksort-derived `sort_unstable_by` would break the
    /// within-run tie order the final `MergeSortArray` relies on for its
    /// own tie-break rule, so this uses the stable `sort_by` instead.
    pub fn sort(&mut self, comparator: &dyn TupleComparator) {
        self.rows.sort_by(|a, b| comparator.compare(a, b));
    }

    pub fn rows(&self) -> &[Tuple] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Tuple> {
        self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple::{ColumnComparator, SortKey};
    use chunk::Value;

    #[test]
    fn sort_orders_rows_by_key_ascending() {
        let mut arr = TupleArray::new(8);
        arr.push(vec![Value::Int64(3)]);
        arr.push(vec![Value::Int64(1)]);
        arr.push(vec![Value::Int64(2)]);
        arr.sort(&ColumnComparator::new(vec![SortKey::ascending(0)]));
        let vals: Vec<_> = arr.rows().iter().map(|r| r[0].as_int64().unwrap()).collect();
        assert_eq!(vals, vec![1, 2, 3]);
    }

    #[test]
    fn estimated_bytes_scales_with_row_count() {
        let mut arr = TupleArray::new(16);
        assert_eq!(arr.estimated_bytes(), 0);
        arr.push(vec![Value::Int64(1)]);
        arr.push(vec![Value::Int64(2)]);
        assert_eq!(arr.estimated_bytes(), 32);
    }
}
