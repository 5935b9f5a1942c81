//! The operator-contract types named in §4.7 but not part of the core data
//! model: `ArrayDistribution` (declared input/output partitioning) and
//! `PhysicalBoundaries` (a conservative cell-space bounding box). Both are
//! plain value types owned by `exec` rather than `array_model`, since they
//! describe an operator's requirements/guarantees about a schema, not the
//! schema itself.

use array_model::{Coordinates, PartitioningScheme};

/// An operator's declared or required partitioning for one array edge of the
/// plan (§4.7 `requiresRedistribute`/`getOutputDistribution`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayDistribution {
    pub scheme: PartitioningScheme,
}

impl ArrayDistribution {
    pub fn new(scheme: PartitioningScheme) -> Self {
        Self { scheme }
    }

    /// `redistribute` is a no-op when the input already satisfies what an
    /// operator requires (§4.5 redistribute is "partitioning-scheme
    /// transition plumbing" — nothing to transition when schemes match).
    pub fn satisfies(&self, required: &ArrayDistribution) -> bool {
        self.scheme == required.scheme
    }
}

/// A conservative cell-space bounding box over every dimension of a schema
/// (§4.7 `getOutputBoundaries`). `start`/`end` are inclusive; an operator
/// that can't bound its output returns [`PhysicalBoundaries::unbounded`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalBoundaries {
    start: Coordinates,
    end: Coordinates,
}

impl PhysicalBoundaries {
    pub fn new(start: Coordinates, end: Coordinates) -> Self {
        Self { start, end }
    }

    pub fn unbounded(num_dims: usize) -> Self {
        Self {
            start: Coordinates::new(vec![i64::MIN; num_dims]),
            end: Coordinates::new(vec![i64::MAX; num_dims]),
        }
    }

    pub fn start(&self) -> &Coordinates {
        &self.start
    }

    pub fn end(&self) -> &Coordinates {
        &self.end
    }

    /// A box is empty when any dimension's start exceeds its end — the same
    /// "zero-length dimension yields no chunks" rule applied to a bounding
    /// box rather than a `DimensionDesc` (§8 boundary behaviors).
    pub fn is_empty(&self) -> bool {
        self.start
            .as_slice()
            .iter()
            .zip(self.end.as_slice())
            .any(|(s, e)| s > e)
    }

    /// Componentwise union: the smallest box containing both inputs, used to
    /// combine per-input boundaries into an operator's output boundaries.
    pub fn union(&self, other: &Self) -> Self {
        let start: Vec<i64> = self
            .start
            .as_slice()
            .iter()
            .zip(other.start.as_slice())
            .map(|(a, b)| *a.min(b))
            .collect();
        let end: Vec<i64> = self
            .end
            .as_slice()
            .iter()
            .zip(other.end.as_slice())
            .map(|(a, b)| *a.max(b))
            .collect();
        Self {
            start: Coordinates::new(start),
            end: Coordinates::new(end),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn satisfies_checks_scheme_equality() {
        let a = ArrayDistribution::new(PartitioningScheme::HashPartitioned);
        let b = ArrayDistribution::new(PartitioningScheme::HashPartitioned);
        let c = ArrayDistribution::new(PartitioningScheme::Replication);
        assert!(a.satisfies(&b));
        assert!(!a.satisfies(&c));
    }

    #[test]
    fn union_takes_componentwise_min_and_max() {
        let a = PhysicalBoundaries::new(Coordinates::new(vec![0, 5]), Coordinates::new(vec![10, 10]));
        let b = PhysicalBoundaries::new(Coordinates::new(vec![2, -3]), Coordinates::new(vec![4, 20]));
        let u = a.union(&b);
        assert_eq!(u.start().as_slice(), &[0, -3]);
        assert_eq!(u.end().as_slice(), &[10, 20]);
    }

    #[test]
    fn unbounded_spans_the_full_i64_range() {
        let b = PhysicalBoundaries::unbounded(2);
        assert_eq!(b.start().as_slice(), &[i64::MIN, i64::MIN]);
        assert_eq!(b.end().as_slice(), &[i64::MAX, i64::MAX]);
    }

    #[test]
    fn start_past_end_is_empty() {
        let b = PhysicalBoundaries::new(Coordinates::new(vec![5]), Coordinates::new(vec![4]));
        assert!(b.is_empty());
    }
}
