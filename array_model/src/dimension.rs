use crate::error::{CurrentRangeOutOfBoundsSnafu, NonPositiveChunkIntervalSnafu, Result};

/// One dimension of an [`crate::ArrayDesc`] (§3 Dimension descriptor).
///
/// `start_min`/`end_max` are the array's declared, immutable bounds;
/// `curr_start`/`curr_end` track the live high-water mark as data is
/// written (SciDB arrays grow but never shrink their declared bounds).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionDesc {
    name: String,
    start_min: i64,
    end_max: i64,
    curr_start: i64,
    curr_end: i64,
    chunk_interval: i64,
    chunk_overlap: i64,
}

impl DimensionDesc {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        start_min: i64,
        end_max: i64,
        chunk_interval: i64,
        chunk_overlap: i64,
    ) -> Result<Self> {
        let name = name.into();
        if chunk_interval <= 0 {
            return NonPositiveChunkIntervalSnafu {
                name,
                chunk_interval,
            }
            .fail();
        }
        Ok(Self {
            curr_start: start_min,
            curr_end: start_min,
            name,
            start_min,
            end_max,
            chunk_interval,
            chunk_overlap: chunk_overlap.max(0),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start_min(&self) -> i64 {
        self.start_min
    }

    pub fn end_max(&self) -> i64 {
        self.end_max
    }

    pub fn curr_start(&self) -> i64 {
        self.curr_start
    }

    pub fn curr_end(&self) -> i64 {
        self.curr_end
    }

    pub fn chunk_interval(&self) -> i64 {
        self.chunk_interval
    }

    pub fn chunk_overlap(&self) -> i64 {
        self.chunk_overlap
    }

    /// Extend the live high-water mark, used by writing iterators as new
    /// chunks materialize beyond the current range. `start_min`/`end_max`
    /// never change.
    pub fn grow_current_range(&mut self, start: i64, end: i64) -> Result<()> {
        let new_start = self.curr_start.min(start);
        let new_end = self.curr_end.max(end);
        if new_start < self.start_min || new_end > self.end_max {
            return CurrentRangeOutOfBoundsSnafu {
                name: self.name.clone(),
                curr_start: new_start,
                curr_end: new_end,
                start_min: self.start_min,
                end_max: self.end_max,
            }
            .fail();
        }
        self.curr_start = new_start;
        self.curr_end = new_end;
        Ok(())
    }

    /// Zero-length dimension: `start_min > end_max`. Iterators over such a
    /// dimension are immediately `end()` (§8 boundary behaviors).
    pub fn is_empty(&self) -> bool {
        self.start_min > self.end_max
    }

    /// The aligned first position of the chunk containing `pos`, per the
    /// invariant `firstPos[i] % chunkInterval[i] == startMin[i] % chunkInterval[i]`.
    pub fn chunk_first_pos(&self, pos: i64) -> i64 {
        let offset = pos - self.start_min;
        let aligned = offset.div_euclid(self.chunk_interval) * self.chunk_interval;
        self.start_min + aligned
    }

    /// `lastPos[i] = min(firstPos[i] + chunkInterval[i] - 1, endMax[i])`; the
    /// chunk sitting exactly at `endMax` is never split further (§8).
    pub fn chunk_last_pos(&self, first_pos: i64) -> i64 {
        (first_pos + self.chunk_interval - 1).min(self.end_max)
    }

    pub fn first_pos_with_overlap(&self, first_pos: i64) -> i64 {
        (first_pos - self.chunk_overlap).max(self.start_min)
    }

    pub fn last_pos_with_overlap(&self, last_pos: i64) -> i64 {
        (last_pos + self.chunk_overlap).min(self.end_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_alignment_matches_start_min_offset() {
        let d = DimensionDesc::new("i", 3, 100, 10, 0).unwrap();
        // startMin % chunkInterval == 3 % 10 == 3
        assert_eq!(d.chunk_first_pos(3), 3);
        assert_eq!(d.chunk_first_pos(12), 3);
        assert_eq!(d.chunk_first_pos(13), 13);
    }

    #[test]
    fn chunk_at_end_max_is_not_split() {
        let d = DimensionDesc::new("i", 0, 24, 10, 0).unwrap();
        // chunk starting at 20 would normally run to 29, but endMax clamps it
        assert_eq!(d.chunk_last_pos(20), 24);
    }

    #[test]
    fn overlap_shrinks_toward_start_min_and_end_max() {
        let d = DimensionDesc::new("i", 0, 99, 10, 2).unwrap();
        assert_eq!(d.first_pos_with_overlap(0), 0); // clamped, can't go below startMin
        assert_eq!(d.first_pos_with_overlap(10), 8);
        assert_eq!(d.last_pos_with_overlap(99), 99); // clamped at endMax
        assert_eq!(d.last_pos_with_overlap(19), 21);
    }

    #[test]
    fn zero_length_dimension_is_empty() {
        let d = DimensionDesc::new("i", 5, 4, 10, 0).unwrap();
        assert!(d.is_empty());
    }

    #[test]
    fn non_positive_chunk_interval_rejected() {
        assert!(DimensionDesc::new("i", 0, 10, 0, 0).is_err());
    }
}
