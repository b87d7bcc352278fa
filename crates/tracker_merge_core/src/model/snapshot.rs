//! Snapshot container: one dated export of the full dataset.

use crate::model::metric::Metric;
use crate::model::symptom::Symptom;
use crate::model::timestamp::Timestamp;

/// Records captured by a single export at `date`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Where the snapshot came from (file path or caller label). Diagnostics only.
    pub source: String,
    /// Instant the export was produced.
    pub date: Timestamp,
    pub symptoms: Vec<Symptom>,
    pub metrics: Vec<Metric>,
}

impl Snapshot {
    /// Creates an empty snapshot for `source` taken at `date`.
    pub fn new(source: impl Into<String>, date: Timestamp) -> Self {
        Self {
            source: source.into(),
            date,
            symptoms: Vec::new(),
            metrics: Vec::new(),
        }
    }
}

/// Sorts snapshots by declared date, ascending.
///
/// The sort is stable: snapshots sharing a date keep their relative order.
pub fn sort_chronologically(snapshots: &mut [Snapshot]) {
    snapshots.sort_by_key(|snapshot| snapshot.date);
}
