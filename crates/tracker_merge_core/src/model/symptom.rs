//! Symptom domain model.
//!
//! # Invariants
//! - `id` identifies the same tracked condition across every snapshot.
//! - `name` is a display label and is not unique until duplicates are collapsed.

use crate::model::timestamp::Timestamp;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub type SymptomId = String;
pub type SymptomName = String;

static CURRENT_FORMAT_SYMPTOM_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^sym_.+$").expect("valid symptom id regex"));

/// A tracked condition that metrics point at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symptom {
    pub id: SymptomId,
    pub name: SymptomName,
    /// Alias names, order preserved from the source.
    pub other_names: Vec<SymptomName>,
    /// Last client-side modification. `None` when never modified.
    pub updated_at: Option<Timestamp>,
    pub published_at: Timestamp,
}

/// Returns whether `id` follows the naming convention of present-day records.
///
/// Legacy records carry bare numeric ids (`"42"`); records created by the
/// current system are prefixed (`"sym_9f2c..."`).
pub fn is_current_format_id(id: &str) -> bool {
    CURRENT_FORMAT_SYMPTOM_ID_RE.is_match(id)
}

#[cfg(test)]
mod tests {
    use super::is_current_format_id;

    #[test]
    fn prefixed_ids_are_current_format() {
        assert!(is_current_format_id("sym_aaaaaaaaaa"));
        assert!(is_current_format_id("sym_a"));
    }

    #[test]
    fn legacy_and_malformed_ids_are_not_current_format() {
        assert!(!is_current_format_id("42"));
        assert!(!is_current_format_id("sym_"));
        assert!(!is_current_format_id("SYM_abc"));
        assert!(!is_current_format_id("met_abc"));
        assert!(!is_current_format_id(""));
    }
}
