use serde::{Deserialize, Serialize};
use std::fmt;

/// Importance score clamped to `[0.0, 1.0]`.
///
/// Either supplied directly by the caller or computed by the ADM
/// scoring engine; never stored out of range.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct ImportanceScore(f64);

impl ImportanceScore {
    /// Threshold above which a memory is a strong candidate for
    /// reinforcement during evolution scoring.
    pub const HIGH: f64 = 0.8;
    /// Threshold below which a memory is a pruning candidate.
    pub const LOW: f64 = 0.2;

    /// Create a new score, clamping to `[0.0, 1.0]`. NaN (which clamp
    /// would pass through) degrades to the neutral midpoint.
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self(0.5);
        }
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn is_high(self) -> bool {
        self.0 >= Self::HIGH
    }

    pub fn is_low(self) -> bool {
        self.0 <= Self::LOW
    }
}

impl Default for ImportanceScore {
    /// A freshly-ingested memory with no signal either way starts at
    /// the midpoint, not zero; zero would bias every ranking against
    /// unscored memories.
    fn default() -> Self {
        Self(0.5)
    }
}

impl fmt::Display for ImportanceScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}

impl From<f64> for ImportanceScore {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl From<ImportanceScore> for f64 {
    fn from(s: ImportanceScore) -> Self {
        s.0
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn clamps_out_of_range_values() {
        assert_eq!(ImportanceScore::new(1.5).value(), 1.0);
        assert_eq!(ImportanceScore::new(-0.5).value(), 0.0);
    }

    #[test]
    fn thresholds() {
        assert!(ImportanceScore::new(0.85).is_high());
        assert!(ImportanceScore::new(0.1).is_low());
        assert!(!ImportanceScore::new(0.5).is_high());
        assert!(!ImportanceScore::new(0.5).is_low());
    }

    proptest! {
        #[test]
        fn any_input_lands_in_unit_interval(value in proptest::num::f64::ANY) {
            let score = ImportanceScore::new(value);
            prop_assert!((0.0..=1.0).contains(&score.value()));
        }
    }
}
