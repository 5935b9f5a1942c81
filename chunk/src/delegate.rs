use crate::traits::Array;
use std::sync::Arc;

/// The common shape every delegating array embeds by composition rather
/// than inheritance (§9 redesign note): a reference to the array(s) it
/// wraps, and an `is_clone` flag that lets `MergeArray`/`ConcatArray`
/// shortcut straight through to a single input when there's exactly one
/// and it isn't actually being transformed (§4.1: "permits shortcutting
/// getSize/getData/pin/unPin straight through").
#[derive(Debug, Clone)]
pub struct DelegateBase {
    pub inputs: Vec<Arc<dyn Array>>,
    pub is_clone: bool,
}

impl DelegateBase {
    pub fn new(inputs: Vec<Arc<dyn Array>>) -> Self {
        let is_clone = inputs.len() == 1;
        Self { inputs, is_clone }
    }
}
