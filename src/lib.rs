//! Westgard: multi-rule evaluator for laboratory QC measurements
//!
//! This library aggregates raw QC runs into per analyte+level baselines,
//! tracks the series of run averages, and flags the Westgard rule violated
//! by each newly appended point.

pub mod analyzer;
pub mod config;
pub mod history;
pub mod pipeline;
pub mod reader;
pub mod reporter;
pub mod series;
pub mod stats;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// QC material tier. Each level has its own independent control limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Level {
    #[serde(rename = "unclassified")]
    Unclassified,
    #[serde(rename = "level-1")]
    Level1,
    #[serde(rename = "level-2")]
    Level2,
}

impl Level {
    /// Levels that carry control limits, in evaluation order
    pub const TRACKED: [Level; 2] = [Level::Level1, Level::Level2];

    pub fn is_tracked(self) -> bool {
        self != Level::Unclassified
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Level::Unclassified => write!(f, "-"),
            Level::Level1 => write!(f, "Lvl1"),
            Level::Level2 => write!(f, "Lvl2"),
        }
    }
}

/// A single analyte result inside a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyteResult {
    pub analyte: String,
    pub value: f64,
}

/// One QC run as produced by a record source. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecord {
    /// Level classification of the sample
    pub level: Level,
    /// Analyte results in column order, unique by analyte name
    pub results: Vec<AnalyteResult>,
    /// Analytes marked as failed for this run
    #[serde(default)]
    pub failed: Vec<String>,
    /// Run date, already formatted by the source
    pub date: String,
}

impl RawRecord {
    pub fn new(level: Level, date: impl Into<String>) -> Self {
        Self {
            level,
            results: Vec::new(),
            failed: Vec::new(),
            date: date.into(),
        }
    }

    /// Add a result, replacing an earlier value for the same analyte
    pub fn with_result(mut self, analyte: impl Into<String>, value: f64) -> Self {
        self.insert_result(analyte.into(), value);
        self
    }

    /// Mark an analyte as failed for this run
    pub fn with_failed(mut self, analyte: impl Into<String>) -> Self {
        self.failed.push(analyte.into());
        self
    }

    /// Names are compared trimmed
    pub fn insert_result(&mut self, analyte: String, value: f64) {
        match self
            .results
            .iter_mut()
            .find(|r| r.analyte.trim() == analyte.trim())
        {
            Some(existing) => existing.value = value,
            None => self.results.push(AnalyteResult { analyte, value }),
        }
    }

    /// Result for an analyte, if the run measured it (names compared trimmed)
    pub fn result(&self, analyte: &str) -> Option<f64> {
        let analyte = analyte.trim();
        self.results
            .iter()
            .find(|r| r.analyte.trim() == analyte)
            .map(|r| r.value)
    }

    /// Whether the analyte is in this run's failed set (names compared trimmed)
    pub fn is_failed(&self, analyte: &str) -> bool {
        let analyte = analyte.trim();
        self.failed.iter().any(|f| f.trim() == analyte)
    }

    pub fn analytes(&self) -> impl Iterator<Item = &str> {
        self.results.iter().map(|r| r.analyte.as_str())
    }
}

/// Identity of a tracked series
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesKey {
    pub analyte: String,
    pub level: Level,
}

/// One point of a series: run average, run date and the rule it violated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlPoint {
    pub average: f64,
    pub date: String,
    pub warning: Violation,
}

/// A tracked analyte+level series anchored on its baseline.
///
/// The first point is the baseline mean and `sd` is the baseline standard
/// deviation; neither changes once the entry exists. Keeping average, date
/// and warning in one point keeps the three sequences the same length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesEntry {
    pub analyte: String,
    pub level: Level,
    /// Baseline standard deviation (population)
    pub sd: f64,
    pub points: Vec<ControlPoint>,
}

impl SeriesEntry {
    /// Start a series from a baseline mean. The anchor never violates a rule.
    pub fn baseline(
        analyte: impl Into<String>,
        level: Level,
        mean: f64,
        sd: f64,
        date: impl Into<String>,
    ) -> Self {
        Self {
            analyte: analyte.into(),
            level,
            sd,
            points: vec![ControlPoint {
                average: mean,
                date: date.into(),
                warning: Violation::None,
            }],
        }
    }

    pub fn key(&self) -> SeriesKey {
        SeriesKey {
            analyte: self.analyte.clone(),
            level: self.level,
        }
    }

    /// Baseline mean (first point)
    pub fn anchor(&self) -> Option<f64> {
        self.points.first().map(|p| p.average)
    }

    pub fn latest(&self) -> Option<&ControlPoint> {
        self.points.last()
    }

    pub fn averages(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.average).collect()
    }

    /// Append a run average and evaluate the rules over the extended series
    pub fn append(&mut self, average: f64, date: impl Into<String>) -> Violation {
        let mut averages = self.averages();
        averages.push(average);
        let warning = analyzer::evaluate(&averages, self.sd);
        self.points.push(ControlPoint {
            average,
            date: date.into(),
            warning,
        });
        warning
    }

    /// Z-score of the latest point against the anchor, None for an anchor-only series
    pub fn latest_z(&self) -> Option<f64> {
        if self.points.len() < 2 {
            return None;
        }
        let anchor = self.anchor()?;
        let latest = self.latest()?.average;
        Some(analyzer::standardize(latest - anchor, self.sd))
    }

    /// Control limits around the baseline mean, None for an empty series
    pub fn limits(&self) -> Option<ControlLimits> {
        self.anchor().map(|mean| ControlLimits::new(mean, self.sd))
    }
}

/// Levey-Jennings control limits at 1, 2 and 3 SD around the baseline mean
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlLimits {
    pub mean: f64,
    pub sd: f64,
}

impl ControlLimits {
    pub fn new(mean: f64, sd: f64) -> Self {
        Self { mean, sd }
    }

    /// `(lower, upper)` bounds at `k` standard deviations
    pub fn at(&self, k: f64) -> (f64, f64) {
        (self.mean - k * self.sd, self.mean + k * self.sd)
    }
}

/// Westgard rule outcome for a point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Violation {
    /// No rule violated
    #[default]
    #[serde(rename = "none")]
    None,
    /// Eight consecutive points on the same side of the baseline mean
    #[serde(rename = "8X")]
    Bias8X,
    /// Four consecutive points beyond 1 SD on the same side
    #[serde(rename = "41S")]
    Shift41S,
    /// Two consecutive points on opposite sides spanning at least 4 SD
    #[serde(rename = "R4S")]
    Range4S,
    /// Two consecutive points beyond 2 SD on the same side
    #[serde(rename = "22S")]
    Shift22S,
    /// One point beyond 3 SD
    #[serde(rename = "13S")]
    Outlier13S,
}

impl Violation {
    pub const RULES: [Violation; 5] = [
        Violation::Bias8X,
        Violation::Shift41S,
        Violation::Range4S,
        Violation::Shift22S,
        Violation::Outlier13S,
    ];

    /// Rule label as used on QC charts, empty for no violation
    pub fn label(self) -> &'static str {
        match self {
            Violation::None => "",
            Violation::Bias8X => "8X",
            Violation::Shift41S => "41S",
            Violation::Range4S => "R4S",
            Violation::Shift22S => "22S",
            Violation::Outlier13S => "13S",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::RULES
            .into_iter()
            .find(|v| v.label().eq_ignore_ascii_case(label))
    }

    pub fn is_violation(self) -> bool {
        self != Violation::None
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::None => write!(f, "ok"),
            other => write!(f, "{}", other.label()),
        }
    }
}

/// Severity assigned to a violation for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// Error kinds of the QC core
#[derive(Debug, Error, PartialEq)]
pub enum QcError {
    #[error("no data extracted from the QC source")]
    EmptyInput,
    #[error("no usable statistics could be computed from the QC data")]
    NoStatistics,
    #[error("no non-failed results for {analyte} {level}")]
    NoQualifyingData { analyte: String, level: Level },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn violation_labels_round_trip_through_from_label() {
        for rule in Violation::RULES {
            assert_eq!(Violation::from_label(rule.label()), Some(rule));
        }
        assert_eq!(Violation::from_label("r4s"), Some(Violation::Range4S));
        assert_eq!(Violation::from_label("12S"), None);
        assert_eq!(Violation::from_label(""), None);
    }

    #[test]
    fn violation_serializes_as_chart_label() {
        let json = serde_json::to_string(&Violation::Shift41S).unwrap();
        assert_eq!(json, "\"41S\"");
        let none: Violation = serde_json::from_str("\"none\"").unwrap();
        assert_eq!(none, Violation::None);
    }

    #[test]
    fn raw_record_replaces_duplicate_analyte() {
        let record = RawRecord::new(Level::Level1, "2020-10-20")
            .with_result("GLU", 5.0)
            .with_result("ALT", 30.0)
            .with_result("GLU", 5.5);
        assert_eq!(record.results.len(), 2);
        assert_eq!(record.result("GLU"), Some(5.5));
        assert_eq!(record.analytes().collect::<Vec<_>>(), vec!["GLU", "ALT"]);
    }

    #[test]
    fn raw_record_result_lookup_ignores_padding() {
        let record = RawRecord::new(Level::Level1, "d")
            .with_result(" GLU", 5.2)
            .with_result("GLU ", 5.4);
        assert_eq!(record.results.len(), 1);
        assert_eq!(record.result("GLU"), Some(5.4));
    }

    #[test]
    fn raw_record_failed_check_ignores_padding() {
        let record = RawRecord::new(Level::Level2, "d").with_failed(" ALT");
        assert!(record.is_failed("ALT"));
        assert!(record.is_failed("ALT "));
        assert!(!record.is_failed("AST"));
    }

    #[test]
    fn baseline_entry_starts_with_neutral_anchor() {
        let entry = SeriesEntry::baseline("GLU", Level::Level1, 5.0, 0.2, "2020-10-20");
        assert_eq!(entry.points.len(), 1);
        assert_eq!(entry.anchor(), Some(5.0));
        assert_eq!(entry.latest().unwrap().warning, Violation::None);
        assert_eq!(entry.latest_z(), None);
    }

    #[test]
    fn append_evaluates_against_anchor_and_fixed_sd() {
        let mut entry = SeriesEntry::baseline("GLU", Level::Level1, 10.0, 1.0, "d0");
        assert_eq!(entry.append(14.0, "d1"), Violation::Outlier13S);
        assert_eq!(entry.sd, 1.0);
        assert_eq!(entry.points.len(), 2);
        assert_eq!(entry.latest_z(), Some(4.0));
        assert_eq!(entry.latest().unwrap().date, "d1");
    }

    #[test]
    fn limits_are_centred_on_the_anchor() {
        let mut entry = SeriesEntry::baseline("GLU", Level::Level1, 10.0, 0.5, "d0");
        entry.append(12.0, "d1");
        let limits = entry.limits().unwrap();
        assert_eq!(limits.mean, 10.0);
        assert_eq!(limits.at(2.0), (9.0, 11.0));
        assert_eq!(limits.at(3.0), (8.5, 11.5));
    }

    #[test]
    fn level_display_matches_chart_names() {
        assert_eq!(Level::Level1.to_string(), "Lvl1");
        assert_eq!(Level::Level2.to_string(), "Lvl2");
        assert!(!Level::Unclassified.is_tracked());
    }
}
