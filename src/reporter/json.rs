//! JSON reporter for machine-readable output

use super::{latest_severity, ReportSummary};
use crate::config::Config;
use crate::series::MergeOutcome;
use crate::{ControlLimits, SeriesEntry, Severity};
use serde::Serialize;

/// Reporter for JSON output
pub struct JsonReporter {
    /// Whether to pretty-print JSON
    pretty: bool,
}

impl JsonReporter {
    /// Create a new JSON reporter
    pub fn new() -> Self {
        Self { pretty: false }
    }

    /// Enable pretty-printing
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    /// Report a history with summary
    pub fn report(&self, series: &[SeriesEntry], config: &Config) -> String {
        self.report_with_outcomes(series, &[], config)
    }

    /// Report a history plus the untracked entries dropped by an append
    pub fn report_with_outcomes(
        &self,
        series: &[SeriesEntry],
        outcomes: &[MergeOutcome],
        config: &Config,
    ) -> String {
        let output = JsonOutput {
            series: series
                .iter()
                .map(|entry| JsonSeries {
                    entry,
                    limits: entry.limits(),
                    latest_z: entry.latest_z().filter(|z| z.is_finite()),
                    severity: latest_severity(entry, config),
                })
                .collect(),
            untracked: outcomes
                .iter()
                .filter_map(|o| match o {
                    MergeOutcome::Untracked(key) => Some(format!("{} {}", key.analyte, key.level)),
                    MergeOutcome::Appended { .. } => None,
                })
                .collect(),
            summary: ReportSummary::from_series(series, config),
        };

        if self.pretty {
            serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
        } else {
            serde_json::to_string(&output).unwrap_or_else(|_| "{}".to_string())
        }
    }
}

impl Default for JsonReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonOutput<'a> {
    series: Vec<JsonSeries<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    untracked: Vec<String>,
    summary: ReportSummary,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonSeries<'a> {
    #[serde(flatten)]
    entry: &'a SeriesEntry,
    #[serde(skip_serializing_if = "Option::is_none")]
    limits: Option<ControlLimits>,
    #[serde(skip_serializing_if = "Option::is_none")]
    latest_z: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    severity: Option<Severity>,
}
