use array_model::{ArrayDesc, Coordinates};

/// Maps cell coordinates within one chunk to/from a row-major linear index,
/// and chunk coordinates to/from chunk-grid indices. Used by `TupleArray`
/// (`extsort`) to give every input chunk a stable row-major footprint, and
/// by `MemChunk` tile access (`chunk`) to compute tile offsets.
#[derive(Debug, Clone)]
pub struct CoordMapper {
    /// Per-dimension chunk interval, used to size the cell-within-chunk grid.
    chunk_intervals: Vec<i64>,
}

impl CoordMapper {
    pub fn from_array_desc(desc: &ArrayDesc) -> Self {
        Self {
            chunk_intervals: desc
                .dimensions()
                .iter()
                .map(|d| d.chunk_interval())
                .collect(),
        }
    }

    pub fn num_dims(&self) -> usize {
        self.chunk_intervals.len()
    }

    /// Row-major linear index of `coords` within the chunk starting at
    /// `chunk_first_pos`, accounting for overlap widening (the cell grid
    /// spans `chunk_interval[i] + 2*overlap[i]` per dimension when overlaps
    /// are present; callers that never use overlaps pass `overlaps` of all
    /// zeros).
    pub fn linear_index(
        &self,
        coords: &Coordinates,
        chunk_first_pos_with_overlap: &[i64],
        overlaps: &[i64],
    ) -> usize {
        let mut index: usize = 0;
        for d in 0..self.num_dims() {
            let extent = (self.chunk_intervals[d] + 2 * overlaps[d]) as usize;
            let offset = (coords.get(d).unwrap() - chunk_first_pos_with_overlap[d]) as usize;
            index = index * extent + offset;
        }
        index
    }

    /// Inverse of [`Self::linear_index`]: recover coordinates from a
    /// row-major linear index within the chunk.
    pub fn coords_from_linear_index(
        &self,
        mut index: usize,
        chunk_first_pos_with_overlap: &[i64],
        overlaps: &[i64],
    ) -> Coordinates {
        let mut values = vec![0i64; self.num_dims()];
        for d in (0..self.num_dims()).rev() {
            let extent = (self.chunk_intervals[d] + 2 * overlaps[d]) as usize;
            let offset = index % extent;
            index /= extent;
            values[d] = chunk_first_pos_with_overlap[d] + offset as i64;
        }
        Coordinates::new(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use array_model::{
        AttributeDesc, ArrayDesc, ArrayId, DimensionDesc, PartitioningScheme, UnversionedArrayId,
    };

    fn desc() -> ArrayDesc {
        ArrayDesc::new(
            "A",
            UnversionedArrayId(1),
            ArrayId(1),
            0,
            vec![AttributeDesc::new(0, "v", "int64")],
            vec![
                DimensionDesc::new("i", 0, 9, 4, 0).unwrap(),
                DimensionDesc::new("j", 0, 9, 4, 0).unwrap(),
            ],
            PartitioningScheme::Replication,
        )
        .unwrap()
    }

    #[test]
    fn round_trips_through_linear_index() {
        let mapper = CoordMapper::from_array_desc(&desc());
        let first = vec![4, 4];
        let overlaps = vec![0, 0];
        let coords = Coordinates::new(vec![5, 6]);
        let idx = mapper.linear_index(&coords, &first, &overlaps);
        let back = mapper.coords_from_linear_index(idx, &first, &overlaps);
        assert_eq!(back, coords);
    }

    #[test]
    fn row_major_order() {
        let mapper = CoordMapper::from_array_desc(&desc());
        let first = vec![0, 0];
        let overlaps = vec![0, 0];
        let a = mapper.linear_index(&Coordinates::new(vec![0, 0]), &first, &overlaps);
        let b = mapper.linear_index(&Coordinates::new(vec![0, 1]), &first, &overlaps);
        let c = mapper.linear_index(&Coordinates::new(vec![1, 0]), &first, &overlaps);
        assert_eq!(a, 0);
        assert_eq!(b, 1);
        assert_eq!(c, mapper.chunk_intervals[1] as usize);
    }
}
