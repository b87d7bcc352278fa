//! Metric domain model.
//!
//! # Invariants
//! - `id` is unique across the whole dataset.
//! - `date` is the event time and must not change between snapshots.
//! - `intensity` and `notes` are carried verbatim and never interpreted.

use crate::model::symptom::SymptomId;
use crate::model::timestamp::Timestamp;
use serde::{Deserialize, Serialize};

pub type MetricId = String;

/// One timestamped observation tied to a symptom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
    pub id: MetricId,
    pub date: Timestamp,
    /// Logical reference to `Symptom::id`.
    pub symptom_id: SymptomId,
    pub intensity: String,
    pub notes: String,
    pub updated_at: Option<Timestamp>,
    pub published_at: Timestamp,
}
