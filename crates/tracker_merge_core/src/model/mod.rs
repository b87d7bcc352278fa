//! Domain model for tracker snapshots and their reconciled records.
//!
//! # Responsibility
//! - Define the two entity kinds (symptoms and metrics) shared by the
//!   loader, the merge engine and the persistence layer.
//! - Define the dated snapshot container that groups them.
//!
//! # Invariants
//! - Record ids are opaque strings and stable across snapshots.
//! - `updated_at == None` means the record was never explicitly modified.

use std::fmt::{Display, Formatter};

pub mod metric;
pub mod snapshot;
pub mod symptom;
pub mod timestamp;

/// Entity kind tag used in diagnostics and error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKind {
    Symptom,
    Metric,
}

impl Display for RecordKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Symptom => write!(f, "symptom"),
            Self::Metric => write!(f, "metric"),
        }
    }
}
