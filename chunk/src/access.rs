/// Declared random-access capability of an `Array` (§4.1). Ordered from
/// least to most capable so that a composed array's
/// [`AccessMode::most_restrictive`] — "composed arrays return the minimum of
/// their inputs" — is a plain `min` over the ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AccessMode {
    /// Only a single forward pass is supported; `setPosition` always fails.
    SinglePass,
    /// Multiple passes are supported via `reset()`, but not arbitrary seek.
    MultiPass,
    /// `setPosition` to any chunk coordinates is supported.
    Random,
}

impl AccessMode {
    /// The least capable of a set of inputs' access modes — what a
    /// composed/delegating array should declare (§4.1: "Composed arrays
    /// return the minimum of their inputs").
    pub fn most_restrictive(modes: impl IntoIterator<Item = AccessMode>) -> AccessMode {
        modes.into_iter().min().unwrap_or(AccessMode::Random)
    }

    pub fn supports_set_position(&self) -> bool {
        matches!(self, AccessMode::Random)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn most_restrictive_picks_the_weakest_mode() {
        let modes = [AccessMode::Random, AccessMode::SinglePass, AccessMode::MultiPass];
        assert_eq!(AccessMode::most_restrictive(modes), AccessMode::SinglePass);
    }

    #[test]
    fn empty_input_set_defaults_to_random() {
        assert_eq!(AccessMode::most_restrictive([]), AccessMode::Random);
    }
}
