//! Duplicate symptom collapsing.
//!
//! # Responsibility
//! - Group stored symptoms by exact display name.
//! - Keep one survivor per group, re-point dependent metrics to it and delete
//!   the other symptoms.
//!
//! # Invariants
//! - Names are compared case-sensitively, without normalization.
//! - Each group is merged in its own transaction: re-point and delete commit
//!   together or not at all. Groups committed before a failure stay merged.
//! - Survivor choice is deterministic for a given set of ids (see
//!   `choose_survivor`).

use crate::model::symptom::{is_current_format_id, Symptom, SymptomId, SymptomName};
use crate::repo::record_repo::{RecordStore, RepoError};
use log::{debug, error, info};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Symptoms sharing one display name. `ids` is sorted ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub name: SymptomName,
    pub ids: Vec<SymptomId>,
}

/// Outcome of merging one duplicate group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedGroup {
    pub name: SymptomName,
    pub survivor: SymptomId,
    pub removed: Vec<SymptomId>,
    pub metrics_repointed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollapseReport {
    pub groups: Vec<MergedGroup>,
}

impl CollapseReport {
    pub fn symptoms_removed(&self) -> usize {
        self.groups.iter().map(|group| group.removed.len()).sum()
    }

    pub fn metrics_repointed(&self) -> usize {
        self.groups.iter().map(|group| group.metrics_repointed).sum()
    }
}

#[derive(Debug)]
pub enum CollapseError {
    /// Reading the current symptoms failed before any group was touched.
    Scan(RepoError),
    /// The transaction for `name` was rolled back.
    Group { name: SymptomName, source: RepoError },
}

impl Display for CollapseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scan(err) => write!(f, "failed to read symptoms: {err}"),
            Self::Group { name, source } => {
                write!(f, "failed to merge symptoms named `{name}`: {source}")
            }
        }
    }
}

impl Error for CollapseError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Scan(err) => Some(err),
            Self::Group { source, .. } => Some(source),
        }
    }
}

/// Groups symptoms by exact name, keeping only names used more than once.
///
/// Groups are ordered by name; ids inside a group are sorted ascending.
pub fn find_duplicate_groups(symptoms: &[Symptom]) -> Vec<DuplicateGroup> {
    let mut by_name: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for symptom in symptoms {
        by_name
            .entry(symptom.name.as_str())
            .or_default()
            .insert(symptom.id.as_str());
    }

    by_name
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|(name, ids)| DuplicateGroup {
            name: name.to_string(),
            ids: ids.into_iter().map(str::to_string).collect(),
        })
        .collect()
}

/// Picks the id that survives a merge.
///
/// The first current-format id in ascending id order wins. When no id in the
/// group follows the current format, the smallest id wins.
pub fn choose_survivor(ids: &[SymptomId]) -> Option<&SymptomId> {
    let mut sorted: Vec<&SymptomId> = ids.iter().collect();
    sorted.sort();
    sorted
        .iter()
        .copied()
        .find(|id| is_current_format_id(id))
        .or_else(|| sorted.first().copied())
}

/// Collapses identically named symptoms directly in the record store.
pub struct CollapseService<S: RecordStore> {
    store: S,
}

impl<S: RecordStore> CollapseService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Reads current symptoms back from storage and merges every duplicate group.
    ///
    /// Re-running after a successful collapse is a no-op.
    ///
    /// # Errors
    /// - `Scan` when symptoms cannot be read.
    /// - `Group` for the first group whose transaction fails; later groups
    ///   are not attempted.
    pub fn collapse(&mut self) -> Result<CollapseReport, CollapseError> {
        let started_at = Instant::now();
        let symptoms = self
            .store
            .read(|repo| repo.list_symptoms())
            .map_err(CollapseError::Scan)?;
        let groups = find_duplicate_groups(&symptoms);
        info!(
            "event=collapse module=service status=start symptoms={} duplicate_groups={}",
            symptoms.len(),
            groups.len()
        );

        let mut report = CollapseReport::default();
        for group in groups {
            let merged = self.merge_group(&group).map_err(|source| {
                error!(
                    "event=collapse_group module=service status=error name={:?} error={}",
                    group.name, source
                );
                CollapseError::Group {
                    name: group.name.clone(),
                    source,
                }
            })?;
            info!(
                "event=collapse_group module=service status=ok name={:?} survivor={} removed={} metrics_repointed={}",
                merged.name,
                merged.survivor,
                merged.removed.len(),
                merged.metrics_repointed
            );
            report.groups.push(merged);
        }

        info!(
            "event=collapse module=service status=ok duration_ms={} groups={} symptoms_removed={} metrics_repointed={}",
            started_at.elapsed().as_millis(),
            report.groups.len(),
            report.symptoms_removed(),
            report.metrics_repointed()
        );
        Ok(report)
    }

    fn merge_group(&mut self, group: &DuplicateGroup) -> Result<MergedGroup, RepoError> {
        let survivor = choose_survivor(&group.ids).cloned().ok_or_else(|| {
            RepoError::InvalidData(format!("duplicate group `{}` has no ids", group.name))
        })?;
        let removed: Vec<SymptomId> = group
            .ids
            .iter()
            .filter(|id| **id != survivor)
            .cloned()
            .collect();

        let metrics_repointed = self.store.transaction(|repo| {
            let mut repointed = 0;
            for id in &removed {
                let referencing = repo.count_metrics_for_symptom(id)?;
                debug!(
                    "event=collapse_repoint module=service from={id} to={survivor} metrics={referencing}"
                );
                if referencing > 0 {
                    repointed += repo.repoint_metrics(id, &survivor)?;
                }
                repo.delete_symptom(id)?;
            }
            Ok(repointed)
        })?;

        Ok(MergedGroup {
            name: group.name.clone(),
            survivor,
            removed,
            metrics_repointed,
        })
    }
}
