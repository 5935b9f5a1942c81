use crate::access::AccessMode;
use crate::mem_chunk::MemChunk;
use crate::traits::{Array, ArrayIterator, Chunk};
use array_model::{Address, ArrayDesc, Coordinates};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// The concrete, fully materialized, random-access array: the output type
/// of the external sort (§4.6), `redistributeToRandomAccess` (§4.5), and
/// the terminal storing operators (§4.2) before they are persisted.
#[derive(Debug)]
pub struct MemArray {
    desc: ArrayDesc,
    chunks: Mutex<BTreeMap<Address, Arc<MemChunk>>>,
}

impl MemArray {
    pub fn new(desc: ArrayDesc) -> Arc<Self> {
        Arc::new(Self {
            desc,
            chunks: Mutex::new(BTreeMap::new()),
        })
    }

    pub fn insert_chunk(&self, chunk: MemChunk) {
        self.chunks
            .lock()
            .insert(chunk.address().clone(), Arc::new(chunk));
    }

    pub fn get_chunk(&self, address: &Address) -> Option<Arc<MemChunk>> {
        self.chunks.lock().get(address).cloned()
    }

    pub fn num_chunks(&self) -> usize {
        self.chunks.lock().len()
    }
}

impl Array for MemArray {
    fn array_desc(&self) -> &ArrayDesc {
        &self.desc
    }

    fn supported_access(&self) -> AccessMode {
        AccessMode::Random
    }

    fn get_array_iterator(&self, attr_id: u32) -> Box<dyn ArrayIterator> {
        let addrs: Vec<Address> = self
            .chunks
            .lock()
            .keys()
            .filter(|a| a.attr_id == attr_id)
            .cloned()
            .collect();
        Box::new(MemArrayIterator {
            chunks: self.chunks.lock().clone(),
            addrs,
            cursor: 0,
        })
    }
}

#[derive(Debug)]
pub struct MemArrayIterator {
    chunks: BTreeMap<Address, Arc<MemChunk>>,
    addrs: Vec<Address>,
    cursor: usize,
}

impl ArrayIterator for MemArrayIterator {
    fn end(&self) -> bool {
        self.cursor >= self.addrs.len()
    }

    fn advance(&mut self) {
        if self.cursor < self.addrs.len() {
            self.cursor += 1;
        }
    }

    fn get_position(&self) -> Option<&Coordinates> {
        self.addrs.get(self.cursor).map(|a| &a.chunk_coords)
    }

    fn get_chunk(&mut self) -> Arc<dyn Chunk> {
        let addr = &self.addrs[self.cursor];
        self.chunks.get(addr).expect("chunk present for address").clone()
    }

    fn set_position(&mut self, pos: &Coordinates) -> bool {
        match self.addrs.iter().position(|a| &a.chunk_coords == pos) {
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
    use crate::mem_chunk::Payload;
    use crate::value::Value;
    use array_model::{
        AttributeDesc, ArrayId, DimensionDesc, PartitioningScheme, UnversionedArrayId,
    };

    fn desc() -> ArrayDesc {
        ArrayDesc::new(
            "A",
            UnversionedArrayId(1),
            ArrayId(1),
            0,
            vec![AttributeDesc::new(0, "v", "int64")],
            vec![DimensionDesc::new("i", 0, 9, 4, 0).unwrap()],
            PartitioningScheme::Replication,
        )
        .unwrap()
    }

    #[test]
    fn iterates_chunks_in_row_major_order() {
        let arr = MemArray::new(desc());
        let mut c1 = MemChunk::new_for_position(arr.array_desc(), 0, &Coordinates::new(vec![4]));
        c1.set_payload(Payload::Dense(vec![Value::Int64(1)]));
        let mut c0 = MemChunk::new_for_position(arr.array_desc(), 0, &Coordinates::new(vec![0]));
        c0.set_payload(Payload::Dense(vec![Value::Int64(0)]));
        arr.insert_chunk(c1);
        arr.insert_chunk(c0);

        let mut it = arr.get_array_iterator(0);
        assert_eq!(it.get_position(), Some(&Coordinates::new(vec![0])));
        it.advance();
        assert_eq!(it.get_position(), Some(&Coordinates::new(vec![4])));
        it.advance();
        assert!(it.end());
    }
}
