//! Core logic for consolidating tracker snapshots.
//!
//! Snapshots are loaded, validated and folded into one canonical dataset,
//! imported into SQLite, and identically named symptoms are then collapsed
//! in place. This crate is the single source of truth for merge invariants.

pub mod config;
pub mod db;
pub mod loader;
pub mod logging;
pub mod merge;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{load_config, ConfigError, MergeConfig};
pub use db::{open_db, open_db_in_memory, open_existing_db, prepare_output_db, DbError};
pub use loader::{load_snapshot, load_snapshot_dir, parse_snapshot, LoadError};
pub use logging::{default_log_level, flush_logging, init_logging, logging_status, LoggingError};
pub use merge::{reconcile, CanonicalStore, MergeError, Provenance, Reconciliation};
pub use model::metric::{Metric, MetricId};
pub use model::snapshot::{sort_chronologically, Snapshot};
pub use model::symptom::{is_current_format_id, Symptom, SymptomId};
pub use model::timestamp::{administrative_marker, parse_timestamp, Timestamp};
pub use model::RecordKind;
pub use repo::record_repo::{
    RecordRepository, RecordStore, RepoError, RepoResult, SqliteRecordRepository,
    SqliteRecordStore,
};
pub use service::collapse_service::{CollapseError, CollapseReport, CollapseService, MergedGroup};
pub use service::import_service::{ImportError, ImportProgress, ImportService, ImportSummary};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
