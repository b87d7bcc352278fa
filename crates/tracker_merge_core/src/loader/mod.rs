//! Snapshot loading from JSON backup exports.
//!
//! # Responsibility
//! - Parse one backup export into a `Snapshot`.
//! - Scan a directory of exports and return them in chronological order.
//!
//! # Invariants
//! - Every loaded record is stamped with the administrative marker as
//!   `published_at`.
//! - A missing `lastModified` maps to `updated_at == None`; it is never
//!   defaulted at load time.

use crate::model::timestamp::TimestampParseError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

mod backup;

pub use backup::{load_snapshot, load_snapshot_dir, parse_snapshot};

pub type LoadResult<T> = Result<T, LoadError>;

/// Errors from reading or decoding snapshot exports.
#[derive(Debug)]
pub enum LoadError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Content is not the expected `{date, symptoms, history}` structure.
    Json {
        source_name: String,
        source: serde_json::Error,
    },
    Timestamp {
        source_name: String,
        field: &'static str,
        record_id: Option<String>,
        source: TimestampParseError,
    },
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read `{}`: {source}", path.display())
            }
            Self::Json {
                source_name,
                source,
            } => write!(f, "snapshot `{source_name}` is malformed: {source}"),
            Self::Timestamp {
                source_name,
                field,
                record_id: Some(record_id),
                source,
            } => write!(
                f,
                "snapshot `{source_name}` record `{record_id}` has invalid `{field}`: {source}"
            ),
            Self::Timestamp {
                source_name,
                field,
                record_id: None,
                source,
            } => write!(f, "snapshot `{source_name}` has invalid `{field}`: {source}"),
        }
    }
}

impl Error for LoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::Timestamp { source, .. } => Some(source),
        }
    }
}
