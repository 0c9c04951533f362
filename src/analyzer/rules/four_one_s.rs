//! 41S: systematic shift beyond one standard deviation.

use super::{same_side, ControlRule};
use crate::Violation;

/// Four consecutive points at least 1 SD from the mean, same side
pub struct FourOneSRule;

impl FourOneSRule {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FourOneSRule {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlRule for FourOneSRule {
    fn violation(&self) -> Violation {
        Violation::Shift41S
    }

    fn window(&self) -> usize {
        4
    }

    fn matches(&self, tail: &[f64]) -> bool {
        same_side(tail) && tail.iter().all(|z| z.abs() >= 1.0)
    }
}
