//! Analyzer module - Westgard multi-rule evaluation

pub mod engine;
pub mod rules;

pub use engine::{deviations, evaluate, standardize, RuleEngine};
