//! Config schema and deserialization

use crate::{Level, Severity, Violation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

pub const DEFAULT_HISTORY_FILENAME: &str = ".westgard-history.json";

/// Rule severity override (error, warning, info, off)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleSeverity {
    Error,
    Warning,
    Info,
    /// Keep the label in the history but never report it
    Off,
}

impl RuleSeverity {
    /// Convert to crate::Severity if not Off
    pub fn to_severity(self) -> Option<Severity> {
        match self {
            RuleSeverity::Error => Some(Severity::Error),
            RuleSeverity::Warning => Some(Severity::Warning),
            RuleSeverity::Info => Some(Severity::Info),
            RuleSeverity::Off => None,
        }
    }
}

/// Layout of a QC sheet export
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReaderConfig {
    /// Column holding the QC level label (0-based)
    pub sample_type_column: usize,
    /// Column holding the comma-separated failed analytes (0-based)
    pub failed_tests_column: usize,
    /// First analyte result column (0-based); every later column is an analyte
    pub first_result_column: usize,
    /// Level label → level number (1 or 2), matched case-insensitively
    pub level_labels: HashMap<String, u8>,
    /// Decimal places results are rounded to
    pub decimals: u32,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        let mut level_labels = HashMap::new();
        level_labels.insert("QC LV I".to_string(), 1);
        level_labels.insert("QC LV II".to_string(), 2);
        Self {
            sample_type_column: 3,
            failed_tests_column: 5,
            first_result_column: 6,
            level_labels,
            decimals: 2,
        }
    }
}

impl ReaderConfig {
    /// Map a sample type cell to a level
    pub fn level_for(&self, label: &str) -> Level {
        let label = label.trim();
        let level = self
            .level_labels
            .iter()
            .find(|(name, _)| name.trim().eq_ignore_ascii_case(label))
            .map(|(_, level)| *level);
        match level {
            Some(1) => Level::Level1,
            Some(2) => Level::Level2,
            _ => Level::Unclassified,
        }
    }
}

/// Root config structure for .westgardrc.json
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// History file (relative to the config directory). Default: .westgard-history.json
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<PathBuf>,

    /// Per-rule severity overrides keyed by chart label ("13S", "R4S", ...)
    #[serde(default)]
    pub rules: HashMap<String, RuleSeverity>,

    /// Glob patterns for input files to skip
    #[serde(default)]
    pub ignore: Vec<String>,

    /// Sheet export layout
    #[serde(default)]
    pub reader: ReaderConfig,
}

impl Config {
    /// Merge CLI overrides into config. CLI values take precedence.
    pub fn merge_with_cli(mut self, cli_history: Option<PathBuf>) -> Self {
        if cli_history.is_some() {
            self.history = cli_history;
        }
        self
    }

    /// History file path, defaulting to the standard name
    pub fn history_path(&self) -> PathBuf {
        self.history
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_HISTORY_FILENAME))
    }

    /// Get the configured severity for a rule, or None if not in config
    ///
    /// The chart label wins; otherwise the first case variant in key order.
    pub fn rule_severity(&self, violation: Violation) -> Option<RuleSeverity> {
        if let Some(severity) = self.rules.get(violation.label()) {
            return Some(*severity);
        }
        self.rules
            .iter()
            .filter(|(label, _)| Violation::from_label(label) == Some(violation))
            .min_by(|a, b| a.0.cmp(b.0))
            .map(|(_, severity)| *severity)
    }

    /// Reporting severity of a violation: every Westgard rule rejects the
    /// run unless downgraded in config. None means not reported.
    pub fn severity_of(&self, violation: Violation) -> Option<Severity> {
        if !violation.is_violation() {
            return None;
        }
        match self.rule_severity(violation) {
            Some(rs) => rs.to_severity(),
            None => Some(Severity::Error),
        }
    }

    /// Labels in `rules` that name no Westgard rule
    pub fn unknown_rules(&self) -> Vec<&str> {
        let mut unknown: Vec<&str> = self
            .rules
            .keys()
            .filter(|label| Violation::from_label(label).is_none())
            .map(|s| s.as_str())
            .collect();
        unknown.sort_unstable();
        unknown
    }
}
