use serde::{Deserialize, Serialize};

/// A host fitness value constrained to the range [0.0, f64::MAX].
///
/// Scores that come out negative or NaN are clamped to zero, and infinite
/// scores (an overflowing exponential) are clamped to `f64::MAX`, so every
/// stored value is a valid roulette weight.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct FitnessValue(f64);

impl FitnessValue {
    /// Zero fitness: the individual never reproduces unless every weight is zero.
    pub const ZERO: FitnessValue = FitnessValue(0.0);

    /// Creates a new FitnessValue, clamping the input to [0.0, f64::MAX].
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self::ZERO;
        }
        Self(value.clamp(0.0, f64::MAX))
    }

    /// Returns the inner f64 value.
    pub fn get(self) -> f64 {
        self.0
    }
}

impl From<f64> for FitnessValue {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl Default for FitnessValue {
    fn default() -> Self {
        Self::ZERO
    }
}
