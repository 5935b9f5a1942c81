/// The hidden attribute defining which cells of a chunk are live (§3, §4.1).
/// Stored densely (one bit per cell position within the chunk, including
/// overlap) since the bitmap itself is already the compact representation
/// real-attribute chunks build on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmptyBitmap {
    bits: Vec<bool>,
}

impl EmptyBitmap {
    pub fn new_all_empty(len: usize) -> Self {
        Self {
            bits: vec![false; len],
        }
    }

    pub fn new_all_full(len: usize) -> Self {
        Self {
            bits: vec![true; len],
        }
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn is_live(&self, index: usize) -> bool {
        self.bits.get(index).copied().unwrap_or(false)
    }

    pub fn set_live(&mut self, index: usize, live: bool) {
        self.bits[index] = live;
    }

    pub fn count_live(&self) -> usize {
        self.bits.iter().filter(|b| **b).count()
    }

    pub fn union(&self, other: &Self) -> Self {
        debug_assert_eq!(self.len(), other.len());
        Self {
            bits: self
                .bits
                .iter()
                .zip(other.bits.iter())
                .map(|(a, b)| *a || *b)
                .collect(),
        }
    }

    /// Iterate the live positions, in ascending (row-major) order.
    pub fn live_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits
            .iter()
            .enumerate()
            .filter_map(|(i, live)| live.then_some(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_is_cellwise_or() {
        let mut a = EmptyBitmap::new_all_empty(3);
        a.set_live(0, true);
        let mut b = EmptyBitmap::new_all_empty(3);
        b.set_live(1, true);
        let u = a.union(&b);
        assert_eq!(u.count_live(), 2);
        assert!(u.is_live(0));
        assert!(u.is_live(1));
        assert!(!u.is_live(2));
    }

    #[test]
    fn merge_disjoint_equals_union() {
        let mut a = EmptyBitmap::new_all_empty(4);
        a.set_live(0, true);
        let empty = EmptyBitmap::new_all_empty(4);
        let merged = a.union(&empty);
        assert_eq!(merged, a);
    }
}
