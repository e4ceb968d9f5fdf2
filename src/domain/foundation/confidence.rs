//! Confidence value object (0.0-1.0 scale).

use serde::{Deserialize, Serialize};
use std::fmt;

/// A score between 0.0 and 1.0 inclusive.
///
/// Construction always clamps, so out-of-range model output can never
/// leak into a routing decision or response envelope.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f32", into = "f32")]
pub struct Confidence(f32);

impl Confidence {
    /// No confidence at all; used by the error envelope.
    pub const ZERO: Self = Self(0.0);

    /// Fallback confidence when a classifier could not be used.
    pub const FALLBACK: Self = Self(0.5);

    /// Certainty; used when the caller names the agent explicitly.
    pub const CERTAIN: Self = Self(1.0);

    /// Creates a new Confidence, clamping to the valid range.
    ///
    /// NaN maps to zero.
    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            return Self::ZERO;
        }
        Self(value.clamp(0.0, 1.0))
    }

    /// Returns the raw score.
    pub fn value(&self) -> f32 {
        self.0
    }

    /// Returns true if the score is strictly below the threshold.
    pub fn is_below(&self, threshold: f32) -> bool {
        self.0 < threshold
    }
}

impl Default for Confidence {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<f32> for Confidence {
    fn from(value: f32) -> Self {
        Self::new(value)
    }
}

impl From<Confidence> for f32 {
    fn from(c: Confidence) -> Self {
        c.0
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn accepts_values_in_range() {
        assert_eq!(Confidence::new(0.0).value(), 0.0);
        assert_eq!(Confidence::new(0.75).value(), 0.75);
        assert_eq!(Confidence::new(1.0).value(), 1.0);
    }

    #[test]
    fn clamps_out_of_range_values() {
        assert_eq!(Confidence::new(1.7).value(), 1.0);
        assert_eq!(Confidence::new(-0.2).value(), 0.0);
    }

    #[test]
    fn nan_becomes_zero() {
        assert_eq!(Confidence::new(f32::NAN), Confidence::ZERO);
    }

    #[test]
    fn deserialization_clamps() {
        let c: Confidence = serde_json::from_str("3.5").unwrap();
        assert_eq!(c, Confidence::CERTAIN);
    }

    #[test]
    fn is_below_is_strict() {
        assert!(Confidence::new(0.79).is_below(0.8));
        assert!(!Confidence::new(0.8).is_below(0.8));
    }

    #[test]
    fn displays_two_decimals() {
        assert_eq!(Confidence::new(0.5).to_string(), "0.50");
    }

    proptest! {
        #[test]
        fn always_within_unit_interval(raw in proptest::num::f32::ANY) {
            let c = Confidence::new(raw);
            prop_assert!((0.0..=1.0).contains(&c.value()));
        }
    }
}
