//! Console reporter with colored output

use super::{latest_severity, ReportSummary};
use crate::config::Config;
use crate::series::MergeOutcome;
use crate::{SeriesEntry, Severity, Violation};
use colored::Colorize;

/// Reporter for terminal output
pub struct ConsoleReporter {
    /// Whether to use colors
    use_colors: bool,
    /// Whether to show every point of every series
    verbose: bool,
}

impl ConsoleReporter {
    /// Create a new console reporter
    pub fn new() -> Self {
        Self {
            use_colors: true,
            verbose: false,
        }
    }

    /// Disable colors
    pub fn without_colors(mut self) -> Self {
        self.use_colors = false;
        self
    }

    /// Enable verbose output
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }

    /// Report a whole history
    pub fn report(&self, title: &str, series: &[SeriesEntry], config: &Config) {
        println!();
        println!("{}", format!("📊 Westgard QC: {}", title).bold());
        println!();

        if series.is_empty() {
            println!("   No tracked series. Run `westgard baseline` first.");
            println!();
            return;
        }

        for entry in series {
            println!("   {}", self.series_line(entry, config));
            if self.verbose {
                self.print_points(entry, config);
            }
        }
        println!();
        self.print_summary(&ReportSummary::from_series(series, config));
    }

    /// Report what an append did: new points, then untracked entries
    pub fn report_append(&self, series: &[SeriesEntry], outcomes: &[MergeOutcome], config: &Config) {
        self.report("appended runs", series, config);

        let untracked: Vec<_> = outcomes
            .iter()
            .filter_map(|o| match o {
                MergeOutcome::Untracked(key) => Some(key),
                MergeOutcome::Appended { .. } => None,
            })
            .collect();
        if !untracked.is_empty() {
            println!(
                "   {} {} measured series without a baseline were skipped{}",
                "ℹ".blue(),
                untracked.len(),
                if self.verbose { ":" } else { " (use --verbose to list)" }
            );
            if self.verbose {
                for key in untracked {
                    println!("       {} {} {}", "→".dimmed(), key.analyte, key.level);
                }
            }
            println!();
        }
    }

    /// Report in quiet mode (flagged series only)
    pub fn report_quiet(&self, series: &[SeriesEntry], config: &Config) {
        for entry in series {
            if latest_severity(entry, config).is_none() {
                continue;
            }
            let label = entry.latest().map(|p| p.warning).unwrap_or_default();
            println!("{} {}: {}", entry.analyte, entry.level, label);
        }
    }

    fn series_line(&self, entry: &SeriesEntry, config: &Config) -> String {
        let latest = entry.latest().map(|p| p.average).unwrap_or_default();
        let z = entry
            .latest_z()
            .map(format_z)
            .unwrap_or_else(|| "baseline".to_string());
        let limits = entry
            .limits()
            .map(|l| {
                let (lo, hi) = l.at(2.0);
                format!("2SD [{:.2} .. {:.2}]", lo, hi)
            })
            .unwrap_or_default();
        let warning = entry.latest().map(|p| p.warning).unwrap_or_default();

        format!(
            "{} {:<12} {:<5} {:>10.2}  {:>9}  {}  {}",
            self.icon(latest_severity(entry, config)),
            entry.analyte,
            entry.level.to_string(),
            latest,
            z,
            self.dim(&limits),
            self.colorize_label(warning, config)
        )
    }

    fn print_points(&self, entry: &SeriesEntry, config: &Config) {
        let anchor = entry.anchor().unwrap_or_default();
        for (i, point) in entry.points.iter().enumerate() {
            let gauge = if i == 0 {
                z_gauge(0.0)
            } else {
                z_gauge(crate::analyzer::standardize(point.average - anchor, entry.sd))
            };
            println!(
                "       {} {:<12} {:>10.2} {} {}",
                "↳".dimmed(),
                point.date,
                point.average,
                self.dim(&gauge),
                self.colorize_label(point.warning, config)
            );
        }
    }

    fn print_summary(&self, summary: &ReportSummary) {
        println!("{}", "═".repeat(60));
        println!("{}", "Summary".bold());
        println!("{}", "═".repeat(60));
        println!(
            "   Series tracked: {}",
            summary.series_tracked.to_string().bold()
        );
        println!("   Points:         {}", summary.total_points);
        let rejected = summary.rejected.to_string();
        println!(
            "   Rejected:       {}",
            if summary.rejected > 0 && self.use_colors {
                rejected.red().bold().to_string()
            } else {
                rejected
            }
        );
        println!("   Warnings:       {}", summary.warnings);
        println!();
    }

    fn icon(&self, severity: Option<Severity>) -> String {
        let icon = match severity {
            Some(Severity::Error) => "✗".red(),
            Some(Severity::Warning) => "⚠".yellow(),
            Some(Severity::Info) => "ℹ".blue(),
            None => "✓".green(),
        };
        if self.use_colors {
            icon.to_string()
        } else {
            icon.clear().to_string()
        }
    }

    fn colorize_label(&self, violation: Violation, config: &Config) -> String {
        let s = violation.to_string();
        if !self.use_colors {
            return s;
        }
        match config.severity_of(violation) {
            Some(Severity::Error) => s.red().bold().to_string(),
            Some(Severity::Warning) => s.yellow().to_string(),
            Some(Severity::Info) => s.blue().to_string(),
            None if violation.is_violation() => s.dimmed().to_string(),
            None => s.green().to_string(),
        }
    }

    fn dim(&self, s: &str) -> String {
        if self.use_colors {
            s.dimmed().to_string()
        } else {
            s.to_string()
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Signed z-score with two decimals, `±inf` beyond any limit
pub fn format_z(z: f64) -> String {
    if z.is_infinite() {
        let sign = if z > 0.0 { '+' } else { '-' };
        format!("z {}inf", sign)
    } else {
        format!("z {:+.2}", z)
    }
}

/// Position of a z-score on a -3..+3 SD scale, one cell per half SD
pub fn z_gauge(z: f64) -> String {
    const CELLS: usize = 13;
    let pos = ((z.clamp(-3.0, 3.0) + 3.0) * 2.0).round() as usize;
    let mut cells: Vec<char> = (0..CELLS)
        .map(|i| match i {
            0 | 12 => '|',
            2 | 10 => ':',
            6 => '+',
            _ => '·',
        })
        .collect();
    cells[pos.min(CELLS - 1)] = '●';
    let bar: String = cells.into_iter().collect();
    let overflow = if z > 3.0 {
        ">"
    } else if z < -3.0 {
        "<"
    } else {
        " "
    };
    format!("[{}]{}", bar, overflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_z_signs_and_infinity() {
        assert_eq!(format_z(1.234), "z +1.23");
        assert_eq!(format_z(-0.5), "z -0.50");
        assert_eq!(format_z(f64::INFINITY), "z +inf");
        assert_eq!(format_z(f64::NEG_INFINITY), "z -inf");
    }

    #[test]
    fn z_gauge_marks_position() {
        assert_eq!(z_gauge(0.0), "[|·:···●···:·|] ");
        assert_eq!(z_gauge(3.0), "[|·:···+···:·●] ");
        assert_eq!(z_gauge(-2.0), "[|·●···+···:·|] ");
    }

    #[test]
    fn z_gauge_flags_overflow() {
        assert!(z_gauge(7.0).ends_with("●]>"));
        assert!(z_gauge(f64::NEG_INFINITY).starts_with("[●"));
        assert!(z_gauge(f64::NEG_INFINITY).ends_with('<'));
    }
}
