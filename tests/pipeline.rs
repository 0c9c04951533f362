//! Integration tests: sheet exports through the full ingestion pipeline.

use std::path::{Path, PathBuf};
use westgard::config::ReaderConfig;
use westgard::pipeline::{ingest, run, Mode};
use westgard::reader::SheetReader;
use westgard::series::merge;
use westgard::{Level, QcError, RawRecord, SeriesEntry, Violation};

fn data(rel: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("test-data").join(rel)
}

fn reader(rel: &str) -> SheetReader {
    SheetReader::new(vec![data(rel)], ReaderConfig::default())
}

fn baselines() -> Vec<SeriesEntry> {
    ingest(&reader("baseline"), Vec::new(), Mode::Baseline)
        .unwrap_or_else(|e| panic!("baseline failed: {:#}", e))
        .series
}

fn find<'a>(series: &'a [SeriesEntry], analyte: &str, level: Level) -> &'a SeriesEntry {
    series
        .iter()
        .find(|s| s.analyte == analyte && s.level == level)
        .unwrap_or_else(|| panic!("no series {} {}", analyte, level))
}

#[test]
fn baseline_from_sheet_export() {
    let series = baselines();
    assert_eq!(series.len(), 4);

    let alt = find(&series, "ALT", Level::Level1);
    // The ALT result of the run marking ALT as failed is excluded
    assert_eq!(alt.anchor(), Some(30.0));
    assert_eq!(alt.sd, 1.0);

    let glu2 = find(&series, "GLU", Level::Level2);
    assert!((glu2.anchor().unwrap() - 15.0).abs() < 1e-9);
    assert!((glu2.sd - 0.2).abs() < 1e-9);

    assert!(series.iter().all(|s| s.analyte != "Na/K"));
}

#[test]
fn round_trip_keeps_the_baseline_anchor() {
    let original = baselines();
    let appended = ingest(&reader("runs/qc_02_10_20.csv"), original.clone(), Mode::Append)
        .unwrap()
        .series;

    assert_eq!(appended.len(), original.len());
    for (before, after) in original.iter().zip(&appended) {
        assert_eq!(after.anchor(), before.anchor());
        assert_eq!(after.sd, before.sd);
        assert_eq!(after.points.len(), before.points.len() + 1);
    }
}

#[test]
fn daily_runs_flag_the_glucose_outlier() {
    let mut series = baselines();
    for day in ["runs/qc_02_10_20.csv", "runs/qc_03_10_20.csv"] {
        series = ingest(&reader(day), series, Mode::Append).unwrap().series;
    }

    let glu = find(&series, "GLU", Level::Level1);
    let warnings: Vec<_> = glu.points.iter().map(|p| p.warning).collect();
    assert_eq!(
        warnings,
        vec![Violation::None, Violation::None, Violation::Outlier13S]
    );
    let dates: Vec<_> = glu.points.iter().map(|p| p.date.as_str()).collect();
    assert_eq!(dates, vec!["2020-10-01", "2020-10-02", "2020-10-03"]);

    let alt = find(&series, "ALT", Level::Level2);
    assert!(alt.points.iter().all(|p| p.warning == Violation::None));
}

#[test]
fn persistent_bias_is_flagged_as_8x() {
    let mut series = vec![SeriesEntry::baseline("GLU", Level::Level1, 5.0, 0.1, "d0")];
    let mut last = Violation::None;
    for day in 1..=8 {
        let batch = vec![RawRecord::new(Level::Level1, format!("d{}", day)).with_result("GLU", 5.05)];
        series = run_append(&batch, series);
        last = series[0].latest().unwrap().warning;
        if day < 8 {
            assert_eq!(last, Violation::None, "day {}", day);
        }
    }
    assert_eq!(last, Violation::Bias8X);
}

fn run_append(records: &[RawRecord], history: Vec<SeriesEntry>) -> Vec<SeriesEntry> {
    run(records, history, Mode::Append).unwrap().series
}

#[test]
fn merge_monotonicity_over_untouched_series() {
    let history = baselines();
    let only_glu = vec![SeriesEntry::baseline("GLU", Level::Level2, 15.1, 0.0, "d")];
    let merged = merge(history.clone(), only_glu);

    for (before, after) in history.iter().zip(&merged) {
        if before.analyte == "GLU" && before.level == Level::Level2 {
            assert_eq!(after.points.len(), before.points.len() + 1);
        } else {
            assert_eq!(after, before);
        }
    }
}

#[test]
fn empty_source_is_reported() {
    let none: Vec<RawRecord> = Vec::new();
    let err = ingest(&none, baselines(), Mode::Append).unwrap_err();
    assert_eq!(err.downcast_ref::<QcError>(), Some(&QcError::EmptyInput));
}
