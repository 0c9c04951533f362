//! R4S: random error, two consecutive points spanning four standard deviations.

use super::{side, ControlRule};
use crate::Violation;

pub struct RangeFourSRule;

impl RangeFourSRule {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RangeFourSRule {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlRule for RangeFourSRule {
    fn violation(&self) -> Violation {
        Violation::Range4S
    }

    fn window(&self) -> usize {
        2
    }

    fn matches(&self, tail: &[f64]) -> bool {
        let [previous, last] = tail else {
            return false;
        };
        side(*previous) * side(*last) == -1 && (last - previous).abs() >= 4.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_sides_four_sd_apart_match() {
        assert!(RangeFourSRule.matches(&[2.0, -2.0]));
        assert!(RangeFourSRule.matches(&[-0.5, 3.5]));
    }

    #[test]
    fn opposite_sides_under_four_sd_do_not_match() {
        assert!(!RangeFourSRule.matches(&[1.9, -2.0]));
    }

    #[test]
    fn same_side_wide_range_does_not_match() {
        assert!(!RangeFourSRule.matches(&[0.5, 5.0]));
    }

    #[test]
    fn zero_point_has_no_side() {
        assert!(!RangeFourSRule.matches(&[0.0, 4.0]));
    }
}
