bitflags::bitflags! {
    /// Chunk-iterator open-mode bitmask (§4.1).
    #[derive(Default)]
    pub struct IterationMode: u32 {
        const IGNORE_EMPTY_CELLS    = 0b0000_0000_0001;
        const IGNORE_DEFAULT_VALUES = 0b0000_0000_0010;
        const IGNORE_NULL_VALUES    = 0b0000_0000_0100;
        const IGNORE_OVERLAPS       = 0b0000_0000_1000;
        const APPEND_CHUNK          = 0b0000_0001_0000;
        const APPEND_EMPTY_BITMAP   = 0b0000_0010_0000;
        const NO_EMPTY_CHECK        = 0b0000_0100_0000;
        const SEQUENTIAL_WRITE      = 0b0000_1000_0000;
        const SPARSE_CHUNK          = 0b0001_0000_0000;
        const TILE_MODE             = 0b0010_0000_0000;
        const INTENDED_TILE_MODE    = 0b0100_0000_0000;
    }
}

impl IterationMode {
    /// "The first written attribute populates the empty bitmap; subsequent
    /// attributes must be opened with NO_EMPTY_CHECK to inherit it" (§4.1).
    pub fn inherits_empty_bitmap(&self) -> bool {
        self.contains(IterationMode::NO_EMPTY_CHECK)
    }
}
