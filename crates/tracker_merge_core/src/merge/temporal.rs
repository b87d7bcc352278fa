//! Temporal validation of a single snapshot.
//!
//! # Invariants
//! - A snapshot with no metrics is vacuously valid.
//! - The latest metric date may exceed the snapshot date by at most
//!   `FUTURE_TOLERANCE_MS`.

use crate::merge::{MergeError, MergeResult};
use crate::model::snapshot::Snapshot;
use crate::model::timestamp::Timestamp;
use chrono::Duration;

/// Allowed skew between a snapshot date and its latest metric.
pub const FUTURE_TOLERANCE_MS: i64 = 1_000;

/// Earliest and latest metric `date` inside one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricDateRange {
    pub earliest: Timestamp,
    pub latest: Timestamp,
}

/// Computes the metric date range, or `None` when the snapshot has no metrics.
pub fn metric_date_range(snapshot: &Snapshot) -> Option<MetricDateRange> {
    let mut dates = snapshot.metrics.iter().map(|metric| metric.date);
    let first = dates.next()?;
    Some(dates.fold(
        MetricDateRange {
            earliest: first,
            latest: first,
        },
        |range, date| MetricDateRange {
            earliest: range.earliest.min(date),
            latest: range.latest.max(date),
        },
    ))
}

/// Rejects snapshots that contain observations recorded after they were produced.
///
/// Returns the metric date range on success so callers can log it.
pub fn validate_snapshot(snapshot: &Snapshot) -> MergeResult<Option<MetricDateRange>> {
    let Some(range) = metric_date_range(snapshot) else {
        return Ok(None);
    };

    if range.latest > snapshot.date + Duration::milliseconds(FUTURE_TOLERANCE_MS) {
        return Err(MergeError::FutureData {
            source: snapshot.source.clone(),
            snapshot_date: snapshot.date,
            latest_metric_date: range.latest,
        });
    }

    Ok(Some(range))
}
