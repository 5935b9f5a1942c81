use crate::access::AccessMode;
use crate::mem_chunk::{MemChunk, Payload};
use crate::traits::{Array, ArrayIterator, Chunk};
use crate::value::Value;
use array_model::{Address, ArrayDesc, Coordinates, DimensionDesc};
use std::sync::Arc;

/// Concatenates N inputs along dimension 0 (§4.1 Merge/Concat). When the
/// seam between two inputs lands exactly on a chunk boundary of the
/// concatenated schema, chunks are delegated straight through with only
/// their coordinates translated (`simpleAppend`); otherwise a proxy chunk
/// straddling the two inputs is synthesized cell-by-cell.
#[derive(Debug, Clone)]
pub struct ConcatArray {
    desc: ArrayDesc,
    inputs: Vec<Arc<dyn Array>>,
    /// Output-space dim-0 offset contributed by each preceding input.
    offsets: Vec<i64>,
    chunk_interval: i64,
}

impl ConcatArray {
    pub fn new(desc: ArrayDesc, inputs: Vec<Arc<dyn Array>>) -> Arc<Self> {
        let mut offsets = Vec::with_capacity(inputs.len());
        let mut running = desc.dimensions()[0].start_min();
        for input in &inputs {
            offsets.push(running);
            let dim0 = &input.array_desc().dimensions()[0];
            running += dim0.end_max() - dim0.start_min() + 1;
        }
        let chunk_interval = desc.dimensions()[0].chunk_interval();
        Arc::new(Self {
            desc,
            inputs,
            offsets,
            chunk_interval,
        })
    }

    /// Locate which input owns output dim-0 coordinate `pos0`, and the
    /// corresponding input-space coordinate.
    fn locate(&self, pos0: i64) -> Option<(usize, i64)> {
        for i in (0..self.inputs.len()).rev() {
            if pos0 >= self.offsets[i] {
                let input_dim0_start = self.inputs[i].array_desc().dimensions()[0].start_min();
                return Some((i, pos0 - self.offsets[i] + input_dim0_start));
            }
        }
        None
    }

    /// True when the output chunk at `first0..=last0` falls entirely within
    /// one input *and* that input's own dimension-0 chunk boundary lines up
    /// (the `simpleAppend` fast path).
    fn is_simple_append(&self, first0: i64, last0: i64) -> Option<(usize, i64)> {
        let (i, in_first0) = self.locate(first0)?;
        let (j, in_last0) = self.locate(last0)?;
        if i != j {
            return None;
        }
        let input_dim0: &DimensionDesc = &self.inputs[i].array_desc().dimensions()[0];
        if input_dim0.chunk_first_pos(in_first0) == in_first0
            && in_last0 == input_dim0.chunk_last_pos(in_first0)
        {
            Some((i, self.offsets[i] - input_dim0.start_min()))
        } else {
            None
        }
    }
}

impl Array for ConcatArray {
    fn array_desc(&self) -> &ArrayDesc {
        &self.desc
    }

    fn supported_access(&self) -> AccessMode {
        AccessMode::most_restrictive(self.inputs.iter().map(|a| a.supported_access()))
    }

    fn get_array_iterator(&self, attr_id: u32) -> Box<dyn ArrayIterator> {
        let dim0 = &self.desc.dimensions()[0];
        let mut positions = Vec::new();
        let mut pos = dim0.start_min();
        while pos <= dim0.end_max() {
            // Only 1-D concatenation ships cell positions here; higher-rank
            // arrays concatenated along dim 0 require identical shapes on
            // the remaining dimensions across inputs, which is asserted by
            // construction rather than re-derived per chunk.
            positions.push(Coordinates::new(vec![pos]));
            pos += self.chunk_interval;
        }
        Box::new(ConcatArrayIterator {
            array: self.clone(),
            attr_id,
            positions,
            cursor: 0,
        })
    }
}

#[derive(Debug)]
struct ConcatArrayIterator {
    array: ConcatArray,
    attr_id: u32,
    positions: Vec<Coordinates>,
    cursor: usize,
}

impl ConcatArrayIterator {
    fn build_chunk(&self) -> MemChunk {
        let pos = &self.positions[self.cursor];
        let dim0 = &self.array.desc.dimensions()[0];
        let first0 = dim0.chunk_first_pos(pos.get(0).unwrap());
        let last0 = dim0.chunk_last_pos(first0);
        let address = Address::new(self.attr_id, Coordinates::new(vec![first0]));

        if let Some((input_idx, translate)) = self.array.is_simple_append(first0, last0) {
            // simpleAppend fast path: delegate straight through, translate
            // only the chunk's own coordinates into output space.
            let mut it = self.array.inputs[input_idx].get_array_iterator(self.attr_id);
            let input_first0 = first0 - translate;
            if it.set_position(&Coordinates::new(vec![input_first0])) {
                let chunk = it.get_chunk();
                let mem = chunk
                    .as_any()
                    .downcast_ref::<MemChunk>()
                    .expect("concat inputs are MemChunk-backed");
                return MemChunk::new(
                    address,
                    Coordinates::new(vec![first0]),
                    Coordinates::new(vec![last0]),
                    Coordinates::new(vec![first0]),
                    Coordinates::new(vec![last0]),
                    mem.payload().clone(),
                    mem.empty_bitmap().cloned(),
                );
            }
        }

        // General path: synthesize a proxy chunk cell-by-cell, pulling
        // from whichever input owns each output position.
        let len = (last0 - first0 + 1) as usize;
        let mut dense = vec![Value::Null; len];
        for (i, out0) in (first0..=last0).enumerate() {
            if let Some((input_idx, in0)) = self.array.locate(out0) {
                let input = &self.array.inputs[input_idx];
                let input_dim0 = &input.array_desc().dimensions()[0];
                let mut it = input.get_array_iterator(self.attr_id);
                let chunk_first = input_dim0.chunk_first_pos(in0);
                if it.set_position(&Coordinates::new(vec![chunk_first])) {
                    let chunk = it.get_chunk();
                    let mem = chunk.as_any().downcast_ref::<MemChunk>().unwrap();
                    let local_index = (in0 - chunk_first) as usize;
                    dense[i] = mem.payload().get(local_index).unwrap_or(Value::Null);
                }
            }
        }
        MemChunk::new(
            address,
            Coordinates::new(vec![first0]),
            Coordinates::new(vec![last0]),
            Coordinates::new(vec![first0]),
            Coordinates::new(vec![last0]),
            Payload::Dense(dense),
            None,
        )
    }
}

impl ArrayIterator for ConcatArrayIterator {
    fn end(&self) -> bool {
        self.cursor >= self.positions.len()
    }

    fn advance(&mut self) {
        if self.cursor < self.positions.len() {
            self.cursor += 1;
        }
    }

    fn get_position(&self) -> Option<&Coordinates> {
        self.positions.get(self.cursor)
    }

    fn get_chunk(&mut self) -> Arc<dyn Chunk> {
        Arc::new(self.build_chunk())
    }

    fn set_position(&mut self, pos: &Coordinates) -> bool {
        match self.positions.iter().position(|p| p == pos) {
            Some(i) => {
                self.cursor = i;
                true
            }
            None => false,
        }
    }

    fn reset(&mut self) {
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem_array::MemArray;
    use array_model::{AttributeDesc, ArrayId, PartitioningScheme, UnversionedArrayId};

    fn one_d_desc(id: u64, start: i64, end: i64, chunk: i64) -> ArrayDesc {
        ArrayDesc::new(
            "A",
            UnversionedArrayId(id),
            ArrayId(id),
            0,
            vec![AttributeDesc::new(0, "v", "int64")],
            vec![DimensionDesc::new("i", start, end, chunk, 0).unwrap()],
            PartitioningScheme::Replication,
        )
        .unwrap()
    }

    fn array(values: Vec<i64>, desc: ArrayDesc) -> Arc<dyn Array> {
        let arr = MemArray::new(desc);
        let mut chunk = MemChunk::new_for_position(arr.array_desc(), 0, &Coordinates::new(vec![0]));
        chunk.set_payload(Payload::Dense(values.into_iter().map(Value::Int64).collect()));
        arr.insert_chunk(chunk);
        arr
    }

    #[test]
    fn scenario_three_aligned_concat_uses_simple_append() {
        let a = array(vec![7, 8], one_d_desc(1, 0, 1, 2));
        let b = array(vec![9, 10], one_d_desc(2, 0, 1, 2));
        let out_desc = one_d_desc(3, 0, 3, 2);
        let concat = ConcatArray::new(out_desc, vec![a, b]);

        let mut it = concat.get_array_iterator(0);
        let mut all = Vec::new();
        while !it.end() {
            let chunk = it.get_chunk();
            let mem = chunk.as_any().downcast_ref::<MemChunk>().unwrap();
            all.extend(mem.payload().to_dense());
            it.advance();
        }
        assert_eq!(
            all,
            vec![
                Value::Int64(7),
                Value::Int64(8),
                Value::Int64(9),
                Value::Int64(10)
            ]
        );
        // chunk interval (2) divides each input's length (2): the seam at
        // output position 2 lines up with a chunk boundary.
        assert!(concat.is_simple_append(0, 1).is_some());
        assert!(concat.is_simple_append(2, 3).is_some());
    }
}
