//! Reporter module for output formatting

pub mod console;
pub mod json;

pub use console::ConsoleReporter;
pub use json::JsonReporter;

use crate::config::Config;
use crate::{SeriesEntry, Severity, Violation};
use serde::Serialize;

/// Counts over a history, by the severity of each series' latest label
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub series_tracked: usize,
    pub total_points: usize,
    pub rejected: usize,
    pub warnings: usize,
    pub info: usize,
}

impl ReportSummary {
    pub fn from_series(series: &[SeriesEntry], config: &Config) -> Self {
        let mut summary = ReportSummary {
            series_tracked: series.len(),
            total_points: series.iter().map(|s| s.points.len()).sum(),
            ..Self::default()
        };
        for entry in series {
            match latest_severity(entry, config) {
                Some(Severity::Error) => summary.rejected += 1,
                Some(Severity::Warning) => summary.warnings += 1,
                Some(Severity::Info) => summary.info += 1,
                None => {}
            }
        }
        summary
    }
}

/// Reporting severity of the latest point of a series
pub fn latest_severity(entry: &SeriesEntry, config: &Config) -> Option<Severity> {
    let warning = entry.latest().map(|p| p.warning).unwrap_or(Violation::None);
    config.severity_of(warning)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuleSeverity;
    use crate::Level;

    fn flagged(analyte: &str, next: f64) -> SeriesEntry {
        let mut entry = SeriesEntry::baseline(analyte, Level::Level1, 0.0, 1.0, "d0");
        entry.append(next, "d1");
        entry
    }

    #[test]
    fn summary_counts_latest_labels_by_severity() {
        let series = vec![
            flagged("GLU", 4.0),
            flagged("ALT", 0.5),
            flagged("AST", -5.0),
            SeriesEntry::baseline("NA", Level::Level2, 140.0, 2.0, "d0"),
        ];
        let mut config = Config::default();
        config
            .rules
            .insert("13s".to_string(), RuleSeverity::Warning);

        let summary = ReportSummary::from_series(&series, &config);
        assert_eq!(summary.series_tracked, 4);
        assert_eq!(summary.total_points, 7);
        assert_eq!(summary.rejected, 0);
        assert_eq!(summary.warnings, 2);

        let summary = ReportSummary::from_series(&series, &Config::default());
        assert_eq!(summary.rejected, 2);
    }
}
