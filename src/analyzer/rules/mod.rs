//! Westgard control rules

pub mod four_one_s;
pub mod mean_bias;
pub mod one_three_s;
pub mod range_four_s;
pub mod two_two_s;

pub use four_one_s::FourOneSRule;
pub use mean_bias::MeanBiasRule;
pub use one_three_s::OneThreeSRule;
pub use range_four_s::RangeFourSRule;
pub use two_two_s::TwoTwoSRule;

use crate::Violation;

/// Trait for control rules evaluated over standardized deviations
pub trait ControlRule: Sync {
    /// Name of the rule (chart label)
    fn name(&self) -> &'static str {
        self.violation().label()
    }

    /// Violation reported when the rule matches
    fn violation(&self) -> Violation;

    /// Number of trailing values the rule inspects
    fn window(&self) -> usize;

    /// Check the trailing `window()` z-scores, oldest first
    fn matches(&self, tail: &[f64]) -> bool;
}

/// Sign of a z-score: 1, -1, or 0 for no deviation
pub(crate) fn side(z: f64) -> i8 {
    if z > 0.0 {
        1
    } else if z < 0.0 {
        -1
    } else {
        0
    }
}

/// All values strictly on the same side of the anchor
pub(crate) fn same_side(values: &[f64]) -> bool {
    match values.first().map(|z| side(*z)) {
        Some(0) | None => false,
        Some(first) => values.iter().all(|z| side(*z) == first),
    }
}
