/// Compression method tag stored in the on-disk chunk header (§3, §4.2).
/// The concrete `Compressor` implementations live in `storage`; this is just
/// the descriptor-level identifier so `array_model` doesn't need to depend
/// on the storage crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    None,
    Zstd,
}

bitflags::bitflags! {
    /// Attribute flags (§3 Attribute descriptor).
    #[derive(Default)]
    pub struct AttributeFlags: u8 {
        const NULLABLE = 0b0000_0001;
        /// Marks the hidden empty-bitmap attribute appended by `ArrayDesc`.
        const EMPTY_INDICATOR = 0b0000_0010;
    }
}

/// One typed column of cells shared by every cell in the array (§3, GLOSSARY).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDesc {
    id: u32,
    name: String,
    type_id: String,
    flags: AttributeFlags,
    default_compression: CompressionMethod,
}

impl AttributeDesc {
    pub fn new(id: u32, name: impl Into<String>, type_id: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            type_id: type_id.into(),
            flags: AttributeFlags::empty(),
            default_compression: CompressionMethod::None,
        }
    }

    pub fn with_flags(mut self, flags: AttributeFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_compression(mut self, method: CompressionMethod) -> Self {
        self.default_compression = method;
        self
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    pub fn is_nullable(&self) -> bool {
        self.flags.contains(AttributeFlags::NULLABLE)
    }

    pub fn is_empty_indicator(&self) -> bool {
        self.flags.contains(AttributeFlags::EMPTY_INDICATOR)
    }

    pub fn default_compression(&self) -> CompressionMethod {
        self.default_compression
    }

    /// The hidden empty-bitmap attribute appended to every `ArrayDesc`'s
    /// attribute list (§3 ArrayDesc: "the last may be a hidden empty-bitmap
    /// attribute").
    pub fn empty_indicator(id: u32) -> Self {
        Self::new(id, "EmptyTag", "bool").with_flags(AttributeFlags::EMPTY_INDICATOR)
    }
}
