use crate::Coordinates;
use std::cmp::Ordering;

/// `(attrId, chunkCoords)` — identifies one chunk uniquely within an array
/// (§3 Address). Strict order is `attrId` then lexicographic on coords,
/// which is also the order `ArrayIterator::++` walks chunks in (§4.1).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    pub attr_id: u32,
    pub chunk_coords: Coordinates,
}

impl Address {
    pub fn new(attr_id: u32, chunk_coords: Coordinates) -> Self {
        Self {
            attr_id,
            chunk_coords,
        }
    }
}

impl PartialOrd for Address {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Address {
    fn cmp(&self, other: &Self) -> Ordering {
        self.attr_id
            .cmp(&other.attr_id)
            .then_with(|| self.chunk_coords.cmp(&other.chunk_coords))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_by_attr_id_before_coords() {
        let a = Address::new(1, Coordinates::new(vec![0, 0]));
        let b = Address::new(0, Coordinates::new(vec![100, 100]));
        assert!(b < a, "lower attrId sorts first regardless of coords");
    }

    #[test]
    fn orders_by_coords_within_same_attr() {
        let a = Address::new(0, Coordinates::new(vec![0, 0]));
        let b = Address::new(0, Coordinates::new(vec![0, 1]));
        assert!(a < b);
    }
}
