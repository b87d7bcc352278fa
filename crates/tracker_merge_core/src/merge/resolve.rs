//! Most-recent-wins resolution shared by symptoms and metrics.
//!
//! | existing      | new           | outcome                         |
//! |---------------|---------------|---------------------------------|
//! | none          | none          | take new                        |
//! | set           | none          | fatal: modification lost        |
//! | none          | set           | take new                        |
//! | set (t1)      | set (t2 > t1) | take new                        |
//! | set (t1)      | set (t2 = t1) | keep existing                   |
//! | set (t1)      | set (t2 < t1) | fatal: modification went back   |

use crate::model::metric::Metric;
use crate::model::symptom::Symptom;
use crate::model::timestamp::Timestamp;
use crate::model::RecordKind;

/// A record that carries a stable id and an optional modification instant.
pub trait Versioned {
    const KIND: RecordKind;

    fn record_id(&self) -> &str;
    fn updated_at(&self) -> Option<Timestamp>;
}

impl Versioned for Symptom {
    const KIND: RecordKind = RecordKind::Symptom;

    fn record_id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> Option<Timestamp> {
        self.updated_at
    }
}

impl Versioned for Metric {
    const KIND: RecordKind = RecordKind::Metric;

    fn record_id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> Option<Timestamp> {
        self.updated_at
    }
}

/// Which of the two candidates survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    KeepExisting,
    TakeNew,
}

/// The candidate from a later snapshot knows less about modifications than
/// the accumulated record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LostModification {
    pub existing_updated_at: Timestamp,
    /// `None` when the candidate dropped the timestamp altogether.
    pub new_updated_at: Option<Timestamp>,
}

/// Picks between the accumulated record and a candidate from a later snapshot.
///
/// Equal timestamps keep `existing`.
pub fn resolve_most_recent<T: Versioned>(
    existing: &T,
    new: &T,
) -> Result<Resolution, LostModification> {
    match (existing.updated_at(), new.updated_at()) {
        (None, None) | (None, Some(_)) => Ok(Resolution::TakeNew),
        (Some(existing_updated_at), None) => Err(LostModification {
            existing_updated_at,
            new_updated_at: None,
        }),
        (Some(existing_at), Some(new_at)) if new_at > existing_at => Ok(Resolution::TakeNew),
        (Some(existing_at), Some(new_at)) if new_at == existing_at => {
            Ok(Resolution::KeepExisting)
        }
        (Some(existing_updated_at), Some(new_at)) => Err(LostModification {
            existing_updated_at,
            new_updated_at: Some(new_at),
        }),
    }
}
