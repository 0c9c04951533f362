//! Baseline statistics - mean and population SD per analyte+level

use crate::{Level, QcError, RawRecord, SeriesEntry};

/// Arithmetic mean, 0 for an empty slice.
///
/// Accumulated as offsets from the first value, so identical values give
/// that value back exactly and their SD is exactly 0.
pub fn mean(values: &[f64]) -> f64 {
    let Some(&first) = values.first() else {
        return 0.0;
    };
    first + values.iter().map(|v| v - first).sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by N), 0 for an empty slice
pub fn population_sd(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let avg = mean(values);
    let n = values.len() as f64;
    values
        .iter()
        .map(|v| (v - avg) * (v - avg) / n)
        .sum::<f64>()
        .sqrt()
}

/// Results of an analyte at one level, skipping runs where it failed or was not measured
pub fn qualifying_results(records: &[RawRecord], analyte: &str, level: Level) -> Vec<f64> {
    records
        .iter()
        .filter(|r| r.level == level)
        .filter(|r| !r.is_failed(analyte))
        .filter_map(|r| r.result(analyte))
        .collect()
}

/// Baseline entry for one analyte+level pair.
///
/// Fails with [`QcError::NoQualifyingData`] when no run of that level has a
/// non-failed result for the analyte.
pub fn baseline_for(
    records: &[RawRecord],
    analyte: &str,
    level: Level,
) -> Result<SeriesEntry, QcError> {
    let values = qualifying_results(records, analyte, level);
    if values.is_empty() {
        return Err(QcError::NoQualifyingData {
            analyte: analyte.trim().to_string(),
            level,
        });
    }

    // The entry is dated by the first run of its level
    let date = records
        .iter()
        .find(|r| r.level == level)
        .map(|r| r.date.clone())
        .unwrap_or_default();

    Ok(SeriesEntry::baseline(
        analyte.trim(),
        level,
        mean(&values),
        population_sd(&values),
        date,
    ))
}

/// Distinct analyte names (trimmed) across the batch in first-seen order
pub fn analyte_names(records: &[RawRecord]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in records.iter().flat_map(|r| r.analytes()).map(str::trim) {
        if name.is_empty() {
            continue;
        }
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Baseline entries for every analyte+level pair with qualifying data.
///
/// Pairs without data are omitted. Returns an empty set when no run carries
/// a recognized level.
pub fn baseline_batch(records: &[RawRecord]) -> Vec<SeriesEntry> {
    let leveled: Vec<RawRecord> = records
        .iter()
        .filter(|r| r.level.is_tracked())
        .cloned()
        .collect();
    if leveled.is_empty() {
        log::info!("no QC run carries a recognized level");
        return Vec::new();
    }

    let mut entries = Vec::new();
    for analyte in analyte_names(&leveled) {
        for level in Level::TRACKED {
            match baseline_for(&leveled, &analyte, level) {
                Ok(entry) => entries.push(entry),
                Err(e) => log::debug!("{}", e),
            }
        }
    }
    entries
}
