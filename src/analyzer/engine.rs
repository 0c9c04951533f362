//! Rule engine - runs the Westgard rules over a series in priority order

use super::rules::{
    ControlRule, FourOneSRule, MeanBiasRule, OneThreeSRule, RangeFourSRule, TwoTwoSRule,
};
use crate::Violation;

/// Westgard rules in priority order. Longer-window patterns come first so
/// that a single-point rule never masks the pattern that explains the tail.
static WESTGARD_RULES: [&dyn ControlRule; 5] = [
    &MeanBiasRule,
    &FourOneSRule,
    &RangeFourSRule,
    &TwoTwoSRule,
    &OneThreeSRule,
];

/// Evaluates a series of run averages against a fixed baseline SD
pub struct RuleEngine {
    rules: &'static [&'static dyn ControlRule],
}

impl RuleEngine {
    /// Engine with the five Westgard rules
    pub fn new() -> Self {
        Self {
            rules: &WESTGARD_RULES,
        }
    }

    /// Rules in evaluation order
    pub fn rules(&self) -> impl Iterator<Item = &'static dyn ControlRule> + '_ {
        self.rules.iter().copied()
    }

    /// Return the first rule violated by the tail of the series.
    ///
    /// `averages[0]` is the anchor and is never evaluated itself. Series
    /// with no point after the anchor never violate anything.
    pub fn evaluate(&self, averages: &[f64], sd: f64) -> Violation {
        let z: Vec<f64> = deviations(averages)
            .map(|d| standardize(d, sd))
            .collect();
        if z.is_empty() {
            return Violation::None;
        }

        for rule in self.rules() {
            let window = rule.window();
            if z.len() < window {
                continue;
            }
            if rule.matches(&z[z.len() - window..]) {
                log::trace!("rule {} matched tail {:?}", rule.name(), &z[z.len() - window..]);
                return rule.violation();
            }
        }
        Violation::None
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Evaluate with the default Westgard rule set
pub fn evaluate(averages: &[f64], sd: f64) -> Violation {
    RuleEngine::new().evaluate(averages, sd)
}

/// Deviations of every point after the anchor from the anchor
pub fn deviations(averages: &[f64]) -> impl Iterator<Item = f64> + '_ {
    let anchor = averages.first().copied().unwrap_or_default();
    averages.iter().skip(1).map(move |a| a - anchor)
}

/// Deviation in units of SD. A zero SD makes any nonzero deviation infinite
/// (sign kept) and a zero deviation zero.
pub fn standardize(deviation: f64, sd: f64) -> f64 {
    if sd == 0.0 {
        if deviation == 0.0 {
            0.0
        } else {
            deviation.signum() * f64::INFINITY
        }
    } else {
        deviation / sd
    }
}
