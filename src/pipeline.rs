//! Ingestion pipeline - records to baselines to tracked history

use crate::series::{merge_with_outcomes, MergeOutcome};
use crate::stats::baseline_batch;
use crate::{QcError, RawRecord, SeriesEntry};
use anyhow::Result;

/// Which history the pipeline produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// The batch establishes the baselines; the result replaces the history
    Baseline,
    /// Each batch adds one point to every tracked series it measured
    Append,
}

/// Source of raw QC runs (spreadsheet exports, fixtures, ...)
pub trait RecordSource {
    /// Materialize every record of the source
    fn read_records(&self) -> Result<Vec<RawRecord>>;
}

impl RecordSource for Vec<RawRecord> {
    fn read_records(&self) -> Result<Vec<RawRecord>> {
        Ok(self.clone())
    }
}

/// Result of a pipeline run
#[derive(Debug, Clone)]
pub struct Ingestion {
    /// History after the run
    pub series: Vec<SeriesEntry>,
    /// Per incoming entry outcome (append mode only)
    pub outcomes: Vec<MergeOutcome>,
}

/// Run the core over already materialized records.
///
/// Fails with [`QcError::EmptyInput`] when there are no records and with
/// [`QcError::NoStatistics`] when no analyte+level pair could be computed.
/// There are no partial results.
pub fn run(
    records: &[RawRecord],
    history: Vec<SeriesEntry>,
    mode: Mode,
) -> Result<Ingestion, QcError> {
    if records.is_empty() {
        return Err(QcError::EmptyInput);
    }

    let fresh = baseline_batch(records);
    if fresh.is_empty() {
        return Err(QcError::NoStatistics);
    }
    log::info!(
        "computed {} analyte/level statistics from {} runs",
        fresh.len(),
        records.len()
    );

    match mode {
        Mode::Baseline => Ok(Ingestion {
            series: fresh,
            outcomes: Vec::new(),
        }),
        Mode::Append => {
            let (series, outcomes) = merge_with_outcomes(history, fresh);
            Ok(Ingestion { series, outcomes })
        }
    }
}

/// Read every record from `source`, then [`run`] the core
pub fn ingest(
    source: &dyn RecordSource,
    history: Vec<SeriesEntry>,
    mode: Mode,
) -> Result<Ingestion> {
    let records = source.read_records()?;
    Ok(run(&records, history, mode)?)
}
