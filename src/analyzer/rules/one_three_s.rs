//! 13S: single point beyond three standard deviations.

use super::ControlRule;
use crate::Violation;

pub struct OneThreeSRule;

impl OneThreeSRule {
    pub fn new() -> Self {
        Self
    }
}

impl Default for OneThreeSRule {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlRule for OneThreeSRule {
    fn violation(&self) -> Violation {
        Violation::Outlier13S
    }

    fn window(&self) -> usize {
        1
    }

    fn matches(&self, tail: &[f64]) -> bool {
        tail.last().is_some_and(|z| z.abs() >= 3.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_sd_boundary_matches_both_sides() {
        assert!(OneThreeSRule.matches(&[3.0]));
        assert!(OneThreeSRule.matches(&[-3.0]));
        assert!(OneThreeSRule.matches(&[f64::INFINITY]));
    }

    #[test]
    fn inside_three_sd_does_not_match() {
        assert!(!OneThreeSRule.matches(&[2.99]));
        assert!(!OneThreeSRule.matches(&[]));
    }
}
