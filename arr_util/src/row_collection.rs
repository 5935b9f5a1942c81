//! Row buffering for `groupBy`-shaped operators: gathers cells belonging to
//! the same group before they are written out as one chunk. Grounded on
//! `original_source/include/array/RowCollection.h`'s role (buffer rows,
//! then iterate them back out group by group) but reshaped as an owning
//! Rust collection instead of a chunk-backed append structure.
use array_model::Coordinates;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;

/// One buffered row: the group key plus its constituent values.
#[derive(Debug, Clone)]
pub struct Row<T> {
    pub key: Coordinates,
    pub values: Vec<T>,
}

/// Buffers rows by group key, then hands back read iterators over a
/// snapshot. Per §5, "Array iterators in a RowCollection share one mutex
/// across concurrent row iterators" — `RowCollection` guards its iterator
/// cursor state with a single `parking_lot::Mutex` rather than one per
/// iterator, so concurrent readers serialize on advancing the cursor
/// instead of racing on independent state.
pub struct RowCollection<T> {
    groups: BTreeMap<Coordinates, Vec<T>>,
    /// Shared cursor over `groups`' keys, used by [`RowIterator`].
    cursor: Mutex<Vec<Coordinates>>,
}

impl<T> fmt::Debug for RowCollection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowCollection")
            .field("groups", &self.groups.len())
            .finish()
    }
}

impl<T> Default for RowCollection<T> {
    fn default() -> Self {
        Self {
            groups: BTreeMap::new(),
            cursor: Mutex::new(Vec::new()),
        }
    }
}

impl<T: Clone> RowCollection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: Coordinates, value: T) {
        self.groups.entry(key).or_default().push(value);
    }

    pub fn num_groups(&self) -> usize {
        self.groups.len()
    }

    pub fn group(&self, key: &Coordinates) -> Option<&[T]> {
        self.groups.get(key).map(Vec::as_slice)
    }

    /// Build a row-ordered iterator over all groups, in ascending key order
    /// (matching row-major chunk order, §4.1).
    pub fn rows(&self) -> RowIterator<'_, T> {
        *self.cursor.lock() = self.groups.keys().cloned().collect();
        RowIterator { collection: self }
    }
}

/// A cursor-based iterator drawing its position from the shared,
/// mutex-guarded cursor on [`RowCollection`].
#[derive(Debug)]
pub struct RowIterator<'a, T> {
    collection: &'a RowCollection<T>,
}

impl<'a, T: Clone> Iterator for RowIterator<'a, T> {
    type Item = Row<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let key = {
            let mut cursor = self.collection.cursor.lock();
            if cursor.is_empty() {
                return None;
            }
            cursor.remove(0)
        };
        let values = self.collection.group(&key)?.to_vec();
        Some(Row { key, values })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_values_by_key() {
        let mut rc = RowCollection::new();
        rc.push(Coordinates::new(vec![0]), 1);
        rc.push(Coordinates::new(vec![0]), 2);
        rc.push(Coordinates::new(vec![1]), 3);
        assert_eq!(rc.num_groups(), 2);
        assert_eq!(rc.group(&Coordinates::new(vec![0])), Some([1, 2].as_slice()));
    }

    #[test]
    fn rows_iterate_in_key_order() {
        let mut rc = RowCollection::new();
        rc.push(Coordinates::new(vec![1]), "b");
        rc.push(Coordinates::new(vec![0]), "a");
        let keys: Vec<_> = rc.rows().map(|r| r.key).collect();
        assert_eq!(
            keys,
            vec![Coordinates::new(vec![0]), Coordinates::new(vec![1])]
        );
    }
}
