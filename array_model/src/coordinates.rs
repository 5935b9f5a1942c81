use std::cmp::Ordering;
use std::fmt;

/// An ordered sequence of signed 64-bit integers identifying one cell in
/// n-dimensional space (§3 Coordinates). `Ord` is strict lexicographic order
/// ("`CoordinatesLess`" in the spec) so `Coordinates` can be used directly as
/// a `BTreeMap` key wherever the engine needs "the minimum position across
/// ready streams" (§4.3) or row-major chunk ordering (§4.1).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Coordinates(Vec<i64>);

impl Coordinates {
    pub fn new(values: impl Into<Vec<i64>>) -> Self {
        Self(values.into())
    }

    pub fn num_dims(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }

    pub fn get(&self, dim: usize) -> Option<i64> {
        self.0.get(dim).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        self.0.iter().copied()
    }
}

impl From<Vec<i64>> for Coordinates {
    fn from(v: Vec<i64>) -> Self {
        Self(v)
    }
}

impl PartialOrd for Coordinates {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Strict lexicographic order: `CoordinatesLess` in the spec.
impl Ord for Coordinates {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{v}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexicographic_order() {
        let a = Coordinates::new(vec![0, 5]);
        let b = Coordinates::new(vec![0, 6]);
        let c = Coordinates::new(vec![1, 0]);
        assert!(a < b);
        assert!(b < c);
        assert!(a < c);
    }

    #[test]
    fn display_matches_brace_notation() {
        let c = Coordinates::new(vec![1, 2, 3]);
        assert_eq!(c.to_string(), "{1,2,3}");
    }
}
