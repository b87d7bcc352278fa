//! Reconciliation engine: folds dated snapshots into one canonical record set.
//!
//! # Responsibility
//! - Check global ordering and metric date consistency before folding.
//! - Validate every snapshot temporally, then apply most-recent-wins per id.
//! - Record which snapshots contained which ids for human diagnostics.
//!
//! # Invariants
//! - The fold only ever compares the accumulated record with one candidate.
//! - Provenance never influences the merge outcome.

use crate::merge::resolve::{resolve_most_recent, Resolution, Versioned};
use crate::merge::temporal::validate_snapshot;
use crate::merge::{MergeError, MergeResult, MetricDateOccurrence};
use crate::model::metric::{Metric, MetricId};
use crate::model::snapshot::Snapshot;
use crate::model::symptom::{Symptom, SymptomId};
use crate::model::timestamp::format_timestamp;
use log::{debug, error, info};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::time::Instant;

/// The reconciled dataset, keyed by record id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalStore {
    pub symptoms: BTreeMap<SymptomId, Symptom>,
    pub metrics: BTreeMap<MetricId, Metric>,
}

impl CanonicalStore {
    pub fn is_empty(&self) -> bool {
        self.symptoms.is_empty() && self.metrics.is_empty()
    }
}

/// Snapshot sources in which each id appeared, in fold order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Provenance {
    pub symptoms: BTreeMap<SymptomId, Vec<String>>,
    pub metrics: BTreeMap<MetricId, Vec<String>>,
}

impl Provenance {
    fn collect(snapshots: &[Snapshot]) -> Self {
        let mut provenance = Self::default();
        for snapshot in snapshots {
            for symptom in &snapshot.symptoms {
                provenance
                    .symptoms
                    .entry(symptom.id.clone())
                    .or_default()
                    .push(snapshot.source.clone());
            }
            for metric in &snapshot.metrics {
                provenance
                    .metrics
                    .entry(metric.id.clone())
                    .or_default()
                    .push(snapshot.source.clone());
            }
        }
        provenance
    }

    pub fn symptom_sources(&self, id: &str) -> &[String] {
        self.symptoms.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn metric_sources(&self, id: &str) -> &[String] {
        self.metrics.get(id).map(Vec::as_slice).unwrap_or_default()
    }
}

/// Output of a successful reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub store: CanonicalStore,
    pub provenance: Provenance,
}

/// Folds `snapshots` (expected in ascending date order) into a canonical store.
///
/// # Errors
/// - `OutOfOrder` when a snapshot is dated before its predecessor.
/// - `MetricDateConflict` when a metric id reports several dates.
/// - `FutureData` when a snapshot contains metrics dated after itself.
/// - `ModificationRegression` when most-recent-wins detects lost knowledge.
///
/// # Side effects
/// - Emits `reconcile` logging events with duration and status.
pub fn reconcile(snapshots: &[Snapshot]) -> MergeResult<Reconciliation> {
    let started_at = Instant::now();
    info!(
        "event=reconcile module=merge status=start snapshots={}",
        snapshots.len()
    );

    let result = fold_snapshots(snapshots);
    match &result {
        Ok(reconciliation) => info!(
            "event=reconcile module=merge status=ok duration_ms={} symptoms={} metrics={}",
            started_at.elapsed().as_millis(),
            reconciliation.store.symptoms.len(),
            reconciliation.store.metrics.len()
        ),
        Err(err) => error!(
            "event=reconcile module=merge status=error duration_ms={} error_code={}",
            started_at.elapsed().as_millis(),
            err.code()
        ),
    }
    result
}

fn fold_snapshots(snapshots: &[Snapshot]) -> MergeResult<Reconciliation> {
    ensure_chronological(snapshots)?;
    ensure_consistent_metric_dates(snapshots)?;
    let provenance = Provenance::collect(snapshots);

    let mut store = CanonicalStore::default();
    for snapshot in snapshots {
        if let Some(range) = validate_snapshot(snapshot)? {
            debug!(
                "event=snapshot_fold module=merge source={} earliest_metric={} latest_metric={}",
                snapshot.source,
                format_timestamp(range.earliest),
                format_timestamp(range.latest)
            );
        }

        for symptom in &snapshot.symptoms {
            fold_record(&mut store.symptoms, symptom, &snapshot.source)?;
        }
        for metric in &snapshot.metrics {
            fold_record(&mut store.metrics, metric, &snapshot.source)?;
        }
    }

    Ok(Reconciliation { store, provenance })
}

fn ensure_chronological(snapshots: &[Snapshot]) -> MergeResult<()> {
    for pair in snapshots.windows(2) {
        let (previous, current) = (&pair[0], &pair[1]);
        if current.date < previous.date {
            return Err(MergeError::OutOfOrder {
                previous_source: previous.source.clone(),
                previous_date: previous.date,
                source: current.source.clone(),
                date: current.date,
            });
        }
    }
    Ok(())
}

fn ensure_consistent_metric_dates(snapshots: &[Snapshot]) -> MergeResult<()> {
    let mut occurrences: BTreeMap<&str, Vec<MetricDateOccurrence>> = BTreeMap::new();
    for snapshot in snapshots {
        for metric in &snapshot.metrics {
            occurrences
                .entry(metric.id.as_str())
                .or_default()
                .push(MetricDateOccurrence {
                    source: snapshot.source.clone(),
                    date: metric.date,
                });
        }
    }

    for (metric_id, dates) in occurrences {
        let first = dates[0].date;
        if dates.iter().any(|occurrence| occurrence.date != first) {
            return Err(MergeError::MetricDateConflict {
                metric_id: metric_id.to_string(),
                occurrences: dates,
            });
        }
    }
    Ok(())
}

fn fold_record<T>(
    accumulated: &mut BTreeMap<String, T>,
    candidate: &T,
    source: &str,
) -> MergeResult<()>
where
    T: Versioned + Clone,
{
    match accumulated.entry(candidate.record_id().to_string()) {
        Entry::Vacant(slot) => {
            slot.insert(candidate.clone());
        }
        Entry::Occupied(mut slot) => match resolve_most_recent(slot.get(), candidate) {
            Ok(Resolution::TakeNew) => {
                slot.insert(candidate.clone());
            }
            Ok(Resolution::KeepExisting) => {}
            Err(lost) => {
                return Err(MergeError::ModificationRegression {
                    kind: T::KIND,
                    id: candidate.record_id().to_string(),
                    existing_updated_at: lost.existing_updated_at,
                    new_updated_at: lost.new_updated_at,
                    source: source.to_string(),
                });
            }
        },
    }
    Ok(())
}
