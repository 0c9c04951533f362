//! 8X: persistent one-sided bias.
//! Magnitude is irrelevant; any nonzero deviation counts toward the run.

use super::{same_side, ControlRule};
use crate::Violation;

/// Eight consecutive points on the same side of the baseline mean
pub struct MeanBiasRule;

impl MeanBiasRule {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MeanBiasRule {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlRule for MeanBiasRule {
    fn violation(&self) -> Violation {
        Violation::Bias8X
    }

    fn window(&self) -> usize {
        8
    }

    fn matches(&self, tail: &[f64]) -> bool {
        same_side(tail)
    }
}
