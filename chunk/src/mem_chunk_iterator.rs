use crate::empty_bitmap::EmptyBitmap;
use crate::error::{IteratorExhaustedSnafu, NotWritableSnafu, Result};
use crate::iteration_mode::IterationMode;
use crate::mem_chunk::{MemChunk, Payload};
use crate::traits::{ChunkIterator, TileChunkIterator};
use crate::value::Value;
use array_model::Coordinates;
use std::sync::Arc;

/// Per-dimension extents of the cell grid an iterator walks: the overlap
/// region when `IGNORE_OVERLAPS` is not set, the core region otherwise.
fn extents(chunk: &MemChunk, mode: IterationMode) -> (Vec<i64>, Vec<i64>) {
    if mode.contains(IterationMode::IGNORE_OVERLAPS) {
        (
            chunk.first_pos().as_slice().to_vec(),
            chunk.last_pos().as_slice().to_vec(),
        )
    } else {
        (
            chunk.first_pos_with_overlap().as_slice().to_vec(),
            chunk.last_pos_with_overlap().as_slice().to_vec(),
        )
    }
}

fn grid_len(first: &[i64], last: &[i64]) -> usize {
    first
        .iter()
        .zip(last.iter())
        .map(|(f, l)| (l - f + 1).max(0) as usize)
        .product()
}

fn coords_from_index(index: usize, first: &[i64], last: &[i64]) -> Coordinates {
    let mut index = index;
    let mut values = vec![0i64; first.len()];
    for d in (0..first.len()).rev() {
        let extent = (last[d] - first[d] + 1).max(1) as usize;
        values[d] = first[d] + (index % extent) as i64;
        index /= extent;
    }
    Coordinates::new(values)
}

/// Cell-at-a-time read iterator over a [`MemChunk`]'s RLE/dense payload
/// (§4.1 ChunkIterator contract). Pins the chunk for its whole lifetime and
/// unpins on drop, matching "a ChunkIterator holds a non-owning reference
/// into exactly one chunk and pins it for its lifetime" (§3 Ownership).
#[derive(Debug)]
pub struct MemChunkReadIterator {
    chunk: Arc<MemChunk>,
    mode: IterationMode,
    first: Vec<i64>,
    last: Vec<i64>,
    len: usize,
    cursor: usize,
    empty_bitmap: Option<Arc<EmptyBitmap>>,
    /// Cached value at `cursor`, refreshed on every position change so
    /// `get_item` can hand back a plain reference instead of recomputing
    /// into a temporary (the RLE/dense lookup returns an owned `Value`).
    current: Value,
}

impl MemChunkReadIterator {
    pub fn new(chunk: Arc<MemChunk>, mode: IterationMode) -> Self {
        chunk.pin();
        let (first, last) = extents(&chunk, mode);
        let len = grid_len(&first, &last);
        let empty_bitmap = chunk.empty_bitmap().cloned();
        let mut it = Self {
            chunk,
            mode,
            first,
            last,
            len,
            cursor: 0,
            empty_bitmap,
            current: Value::Null,
        };
        it.skip_to_live();
        it.refresh_current();
        it
    }

    fn is_live_at(&self, index: usize) -> bool {
        if self.mode.contains(IterationMode::NO_EMPTY_CHECK) {
            return true;
        }
        match &self.empty_bitmap {
            Some(b) => b.is_live(index),
            None => true,
        }
    }

    fn skip_to_live(&mut self) {
        if !self.mode.contains(IterationMode::IGNORE_EMPTY_CELLS) {
            return;
        }
        while self.cursor < self.len && !self.is_live_at(self.cursor) {
            self.cursor += 1;
        }
    }

    fn refresh_current(&mut self) {
        self.current = if self.cursor < self.len {
            self.chunk.payload().get(self.cursor).unwrap_or(Value::Null)
        } else {
            Value::Null
        };
    }
}

impl Drop for MemChunkReadIterator {
    fn drop(&mut self) {
        self.chunk.unpin();
    }
}

impl ChunkIterator for MemChunkReadIterator {
    fn end(&self) -> bool {
        self.cursor >= self.len
    }

    fn advance(&mut self) {
        if self.cursor < self.len {
            self.cursor += 1;
        }
        self.skip_to_live();
        self.refresh_current();
    }

    fn get_position(&self) -> Option<&Coordinates> {
        None
    }

    fn get_item(&self) -> Result<&Value> {
        if self.end() {
            return IteratorExhaustedSnafu.fail();
        }
        Ok(&self.current)
    }

    fn is_empty(&self) -> bool {
        !self.is_live_at(self.cursor.min(self.len.saturating_sub(1)))
    }

    fn write_item(&mut self, _value: Value) -> Result<()> {
        NotWritableSnafu.fail()
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn set_position(&mut self, pos: &Coordinates) -> bool {
        let idx = pos
            .as_slice()
            .iter()
            .zip(self.first.iter())
            .map(|(p, f)| p - f)
            .collect::<Vec<_>>();
        if idx.iter().any(|v| *v < 0) {
            return false;
        }
        let mut linear = 0usize;
        for d in 0..self.first.len() {
            let extent = (self.last[d] - self.first[d] + 1).max(1) as usize;
            linear = linear * extent + idx[d] as usize;
        }
        if linear >= self.len {
            return false;
        }
        self.cursor = linear;
        self.refresh_current();
        true
    }
}

impl MemChunkReadIterator {
    pub fn position(&self) -> Option<Coordinates> {
        if self.end() {
            None
        } else {
            Some(coords_from_index(self.cursor, &self.first, &self.last))
        }
    }
}

impl TileChunkIterator for MemChunkReadIterator {
    fn get_data(
        &mut self,
        logical_start: &Coordinates,
        max_values: usize,
    ) -> Option<(Vec<Value>, Vec<Coordinates>)> {
        if !self.set_position(logical_start) {
            return None;
        }
        let mut values = Vec::new();
        let mut coords = Vec::new();
        while !self.end() && values.len() < max_values {
            values.push(self.get_item().ok()?.clone());
            coords.push(self.position()?);
            self.advance();
        }
        if values.is_empty() {
            None
        } else {
            Some((values, coords))
        }
    }
}

/// Writing iterator for a [`MemChunk`] under construction. Populates a
/// dense payload and, when this is the first attribute opened for the
/// chunk's position, the shared empty bitmap (§4.1: "the first written
/// attribute populates the empty bitmap").
#[derive(Debug)]
pub struct MemChunkWriteIterator {
    first: Vec<i64>,
    last: Vec<i64>,
    len: usize,
    cursor: usize,
    dense: Vec<Value>,
    bitmap: EmptyBitmap,
    mode: IterationMode,
}

impl MemChunkWriteIterator {
    pub fn new(chunk: &MemChunk, mode: IterationMode) -> Result<Self> {
        if mode.inherits_empty_bitmap() && chunk.empty_bitmap().is_none() {
            return crate::error::MissingEmptyBitmapSnafu {
                attr_id: chunk.address().attr_id,
            }
            .fail();
        }
        let (first, last) = extents(chunk, mode);
        let len = grid_len(&first, &last);
        Ok(Self {
            first,
            last,
            len,
            cursor: 0,
            dense: vec![Value::Null; len],
            bitmap: EmptyBitmap::new_all_empty(len),
            mode,
        })
    }

    pub fn into_parts(self) -> (DensePayloadOwned, EmptyBitmap) {
        (self.dense, self.bitmap)
    }
}

pub type DensePayloadOwned = Vec<Value>;

impl ChunkIterator for MemChunkWriteIterator {
    fn end(&self) -> bool {
        self.cursor >= self.len
    }

    fn advance(&mut self) {
        if self.cursor < self.len {
            self.cursor += 1;
        }
    }

    fn get_position(&self) -> Option<&Coordinates> {
        None
    }

    fn get_item(&self) -> Result<&Value> {
        self.dense
            .get(self.cursor)
            .ok_or_else(|| crate::error::Error::IteratorExhausted)
    }

    fn is_empty(&self) -> bool {
        self.cursor >= self.len || !self.bitmap.is_live(self.cursor)
    }

    fn write_item(&mut self, value: Value) -> Result<()> {
        if self.end() {
            return IteratorExhaustedSnafu.fail();
        }
        self.bitmap.set_live(self.cursor, !value.is_null() || !self.mode.contains(IterationMode::IGNORE_NULL_VALUES));
        self.dense[self.cursor] = value;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn set_position(&mut self, pos: &Coordinates) -> bool {
        let idx: Vec<i64> = pos
            .as_slice()
            .iter()
            .zip(self.first.iter())
            .map(|(p, f)| p - f)
            .collect();
        if idx.iter().any(|v| *v < 0) {
            return false;
        }
        let mut linear = 0usize;
        for d in 0..self.first.len() {
            let extent = (self.last[d] - self.first[d] + 1).max(1) as usize;
            linear = linear * extent + idx[d] as usize;
        }
        if linear >= self.len {
            return false;
        }
        self.cursor = linear;
        true
    }
}

impl Payload {
    pub fn from_owned_dense(dense: DensePayloadOwned) -> Self {
        Payload::Dense(dense)
    }
}
