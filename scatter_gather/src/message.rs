use array_model::{Coordinates, InstanceId};
use chunk::MemChunk;
use std::sync::Arc;

/// Identifies which merge a chunk message participates in (§6): a plain
/// remote-array fetch, or one leg of an SG-array merge across instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjType {
    RemoteArrayMerge,
    SgArrayMerge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    None,
    Zstd,
}

/// Request sent to a source instance for one (attribute, stream) pair.
/// `position_only` asks only for the next coordinates, not the chunk body,
/// so `MultiStreamArray` can compare positions across streams before
/// committing to a full fetch (§4.3 step 1, §4.4).
#[derive(Debug, Clone)]
pub struct FetchMsg {
    pub attribute_id: u32,
    pub position_only: bool,
    pub obj_type: ObjType,
    pub query_id: trace::QueryId,
}

/// A producer's reply. `chunk` is `None` for a position-only reply or an
/// EOF marker; `next_coordinates` piggy-backs the position of the chunk
/// that *would* follow, letting a consumer skip a round trip when it only
/// needed the position (§6 message shape, §4.4 flow control).
#[derive(Debug, Clone)]
pub struct ChunkMsg {
    pub msg_id: u64,
    pub attribute_id: u32,
    pub source_instance: InstanceId,
    pub dest_stream: usize,
    pub chunk: Option<Arc<MemChunk>>,
    pub compression_method: CompressionMethod,
    pub decompressed_size: u64,
    pub coordinates: Option<Coordinates>,
    pub next_coordinates: Option<Coordinates>,
    pub count: u64,
    pub sparse_flag: bool,
    pub rle_flag: bool,
    pub eof: bool,
    pub warnings: Vec<String>,
    pub obj_type: ObjType,
    pub launch_id: u64,
}

impl ChunkMsg {
    pub fn is_position_only(&self) -> bool {
        self.chunk.is_none() && !self.eof
    }

    pub fn position(&self) -> Option<Coordinates> {
        self.next_coordinates.clone().or_else(|| self.coordinates.clone())
    }
}
