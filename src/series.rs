//! Series manager - appends single-run averages to tracked series

use crate::{SeriesEntry, SeriesKey, Violation};
use std::collections::HashMap;

/// Outcome of merging one incoming entry
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    /// Point appended to the tracked series
    Appended { key: SeriesKey, warning: Violation },
    /// No tracked series with that identity; the entry was dropped
    Untracked(SeriesKey),
}

/// Merge single-point entries into a history.
///
/// The history is taken by value and returned: it is the only owner of the
/// entries being extended. Each incoming entry contributes its first
/// average and date to the tracked series with the same analyte and level;
/// entries for untracked identities are dropped.
pub fn merge(history: Vec<SeriesEntry>, incoming: Vec<SeriesEntry>) -> Vec<SeriesEntry> {
    merge_with_outcomes(history, incoming).0
}

/// Like [`merge`], also reporting what happened to each incoming entry
pub fn merge_with_outcomes(
    mut history: Vec<SeriesEntry>,
    incoming: Vec<SeriesEntry>,
) -> (Vec<SeriesEntry>, Vec<MergeOutcome>) {
    let index: HashMap<SeriesKey, usize> = history
        .iter()
        .enumerate()
        .map(|(i, entry)| (entry.key(), i))
        .collect();

    let mut outcomes = Vec::with_capacity(incoming.len());
    for entry in incoming {
        let key = entry.key();
        let (Some(&slot), Some(point)) = (index.get(&key), entry.points.into_iter().next()) else {
            log::warn!(
                "dropping {} {}: no tracked series (establish a baseline first)",
                key.analyte,
                key.level
            );
            outcomes.push(MergeOutcome::Untracked(key));
            continue;
        };

        let warning = history[slot].append(point.average, point.date);
        log::debug!("{} {} appended: {}", key.analyte, key.level, warning);
        outcomes.push(MergeOutcome::Appended { key, warning });
    }

    (history, outcomes)
}
