//! Cross-snapshot merge engine.
//!
//! # Responsibility
//! - Validate each snapshot against its own declared date.
//! - Fold an ordered snapshot sequence into one canonical record set using
//!   most-recent-wins per record id.
//!
//! # Invariants
//! - Every validation failure is fatal; nothing is clamped or auto-resolved.
//! - Snapshots are folded strictly in non-decreasing date order.
//! - A metric id reports one single `date` across all snapshots.

use crate::model::metric::MetricId;
use crate::model::timestamp::{format_timestamp, Timestamp};
use crate::model::RecordKind;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod reconcile;
pub mod resolve;
pub mod temporal;

pub use reconcile::{reconcile, CanonicalStore, Provenance, Reconciliation};
pub use resolve::{resolve_most_recent, LostModification, Resolution, Versioned};
pub use temporal::{metric_date_range, validate_snapshot, MetricDateRange, FUTURE_TOLERANCE_MS};

pub type MergeResult<T> = Result<T, MergeError>;

/// One `date` observed for a metric, with the snapshot that reported it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDateOccurrence {
    pub source: String,
    pub date: Timestamp,
}

/// Fatal merge faults. None of them is recoverable within a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeError {
    /// A snapshot is dated earlier than the one folded before it.
    OutOfOrder {
        previous_source: String,
        previous_date: Timestamp,
        source: String,
        date: Timestamp,
    },
    /// A snapshot contains metrics dated after the snapshot itself.
    FutureData {
        source: String,
        snapshot_date: Timestamp,
        latest_metric_date: Timestamp,
    },
    /// The same metric id reports different dates across snapshots.
    MetricDateConflict {
        metric_id: MetricId,
        occurrences: Vec<MetricDateOccurrence>,
    },
    /// A later snapshot carries less modification knowledge for a record:
    /// its `updated_at` is missing or older than the accumulated one.
    ModificationRegression {
        kind: RecordKind,
        id: String,
        existing_updated_at: Timestamp,
        new_updated_at: Option<Timestamp>,
        source: String,
    },
}

impl Display for MergeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfOrder {
                previous_source,
                previous_date,
                source,
                date,
            } => write!(
                f,
                "snapshots must be folded in chronological order: `{source}` ({}) comes after `{previous_source}` ({})",
                format_timestamp(*date),
                format_timestamp(*previous_date)
            ),
            Self::FutureData {
                source,
                snapshot_date,
                latest_metric_date,
            } => write!(
                f,
                "snapshot `{source}` has metrics in the future:\nlatest metric: {}\nsnapshot date: {}",
                format_timestamp(*latest_metric_date),
                format_timestamp(*snapshot_date)
            ),
            Self::MetricDateConflict {
                metric_id,
                occurrences,
            } => {
                write!(
                    f,
                    "the metric `{metric_id}` has these different dates across snapshots:"
                )?;
                for occurrence in occurrences {
                    write!(
                        f,
                        "\n  - {} ({})",
                        format_timestamp(occurrence.date),
                        occurrence.source
                    )?;
                }
                Ok(())
            }
            Self::ModificationRegression {
                kind,
                id,
                existing_updated_at,
                new_updated_at: None,
                source,
            } => write!(
                f,
                "{kind} `{id}` was modified at {} but has no modification timestamp in `{source}`",
                format_timestamp(*existing_updated_at)
            ),
            Self::ModificationRegression {
                kind,
                id,
                existing_updated_at,
                new_updated_at: Some(new_updated_at),
                source,
            } => write!(
                f,
                "{kind} `{id}` was modified at {} but `{source}` reports an older modification at {}",
                format_timestamp(*existing_updated_at),
                format_timestamp(*new_updated_at)
            ),
        }
    }
}

impl Error for MergeError {}

impl MergeError {
    /// Stable machine-readable code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::OutOfOrder { .. } => "snapshot_out_of_order",
            Self::FutureData { .. } => "snapshot_future_data",
            Self::MetricDateConflict { .. } => "metric_date_conflict",
            Self::ModificationRegression { .. } => "modification_regression",
        }
    }
}
