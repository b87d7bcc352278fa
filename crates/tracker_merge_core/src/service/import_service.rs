//! Bulk import of a reconciled dataset into the record store.
//!
//! # Invariants
//! - The whole import is one transaction: all records land or none do.
//! - Imports only target an empty store; the canonical store is never merged
//!   into existing rows.

use crate::merge::CanonicalStore;
use crate::repo::record_repo::{RecordStore, RepoError};
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Per-record progress notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportProgress<'a> {
    Symptom {
        position: usize,
        total: usize,
        id: &'a str,
    },
    Metric {
        position: usize,
        total: usize,
        id: &'a str,
    },
}

/// Counts of imported records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub symptoms: usize,
    pub metrics: usize,
}

#[derive(Debug)]
pub enum ImportError {
    /// The target store already holds records.
    StoreNotEmpty { symptoms: u64, metrics: u64 },
    Repo(RepoError),
}

impl Display for ImportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StoreNotEmpty { symptoms, metrics } => write!(
                f,
                "refusing to import into a non-empty store ({symptoms} symptoms, {metrics} metrics)"
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ImportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StoreNotEmpty { .. } => None,
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<RepoError> for ImportError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Loads a canonical store into persistence.
pub struct ImportService<S: RecordStore> {
    store: S,
}

impl<S: RecordStore> ImportService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Inserts every symptom, then every metric, inside one transaction.
    ///
    /// `progress` is called once per record after it has been written.
    ///
    /// # Errors
    /// - `StoreNotEmpty` when the target already has rows.
    /// - `Repo` on any store failure; nothing is committed in that case.
    pub fn import<P>(
        &mut self,
        canonical: &CanonicalStore,
        mut progress: P,
    ) -> Result<ImportSummary, ImportError>
    where
        P: FnMut(ImportProgress<'_>),
    {
        let started_at = Instant::now();
        info!(
            "event=import module=service status=start symptoms={} metrics={}",
            canonical.symptoms.len(),
            canonical.metrics.len()
        );

        let (symptoms, metrics) = self
            .store
            .read(|repo| Ok((repo.count_symptoms()?, repo.count_metrics()?)))?;
        if symptoms > 0 || metrics > 0 {
            error!(
                "event=import module=service status=error error_code=store_not_empty symptoms={symptoms} metrics={metrics}"
            );
            return Err(ImportError::StoreNotEmpty { symptoms, metrics });
        }

        let outcome = self.store.transaction(|repo| {
            let total = canonical.symptoms.len();
            for (index, symptom) in canonical.symptoms.values().enumerate() {
                repo.insert_symptom(symptom)?;
                progress(ImportProgress::Symptom {
                    position: index + 1,
                    total,
                    id: &symptom.id,
                });
            }

            let total = canonical.metrics.len();
            for (index, metric) in canonical.metrics.values().enumerate() {
                repo.insert_metric(metric)?;
                progress(ImportProgress::Metric {
                    position: index + 1,
                    total,
                    id: &metric.id,
                });
            }

            Ok(ImportSummary {
                symptoms: canonical.symptoms.len(),
                metrics: canonical.metrics.len(),
            })
        });

        match outcome {
            Ok(summary) => {
                info!(
                    "event=import module=service status=ok duration_ms={} symptoms={} metrics={}",
                    started_at.elapsed().as_millis(),
                    summary.symptoms,
                    summary.metrics
                );
                Ok(summary)
            }
            Err(err) => {
                error!(
                    "event=import module=service status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err.into())
            }
        }
    }
}
