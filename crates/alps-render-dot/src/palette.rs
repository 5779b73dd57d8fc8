//! Fixed transition color coding.

use alps_core::DescriptorType;

/// Glyph drawn in the transition's color before its label.
pub const TRANSITION_GLYPH: &str = "\u{25A0}";

/// Colors keyed by transition type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionPalette {
    pub safe: &'static str,
    pub unsafe_: &'static str,
    pub idempotent: &'static str,
    /// Anything that is not a recognised transition type.
    pub other: &'static str,
}

impl Default for TransitionPalette {
    fn default() -> Self {
        Self {
            safe: "#00A86B",
            unsafe_: "#FF4136",
            idempotent: "#D4A000",
            other: "#000000",
        }
    }
}

impl TransitionPalette {
    #[must_use]
    pub fn color_for(&self, transition_type: &str) -> &'static str {
        match DescriptorType::parse(transition_type) {
            Some(DescriptorType::Safe) => self.safe,
            Some(DescriptorType::Unsafe) => self.unsafe_,
            Some(DescriptorType::Idempotent) => self.idempotent,
            Some(DescriptorType::Semantic) | None => self.other,
        }
    }
}
