//! 22S: two consecutive points beyond two standard deviations on one side.

use super::{same_side, ControlRule};
use crate::Violation;

pub struct TwoTwoSRule;

impl TwoTwoSRule {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TwoTwoSRule {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlRule for TwoTwoSRule {
    fn violation(&self) -> Violation {
        Violation::Shift22S
    }

    fn window(&self) -> usize {
        2
    }

    fn matches(&self, tail: &[f64]) -> bool {
        same_side(tail) && tail.iter().all(|z| z.abs() >= 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_beyond_two_sd_same_side_match() {
        assert!(TwoTwoSRule.matches(&[2.0, 2.0]));
        assert!(TwoTwoSRule.matches(&[-2.5, -2.1]));
    }

    #[test]
    fn one_inside_two_sd_does_not_match() {
        assert!(!TwoTwoSRule.matches(&[2.5, 1.9]));
    }

    #[test]
    fn opposite_sides_do_not_match() {
        assert!(!TwoTwoSRule.matches(&[2.5, -2.5]));
    }
}
