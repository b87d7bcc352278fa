//! JSON backup export format.
//!
//! Exports look like `{"date": ..., "symptoms": [...], "history": [...]}`.
//! Older exports used integer ids; they are read back as decimal strings.

use crate::loader::{LoadError, LoadResult};
use crate::model::metric::Metric;
use crate::model::snapshot::{sort_chronologically, Snapshot};
use crate::model::symptom::Symptom;
use crate::model::timestamp::{administrative_marker, parse_timestamp, Timestamp};
use log::{error, info};
use serde::Deserialize;
use std::path::Path;
use std::time::Instant;

#[derive(Debug, Deserialize)]
struct BackupDocument {
    date: String,
    symptoms: Vec<BackupSymptom>,
    history: Vec<BackupMetric>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BackupId {
    Text(String),
    Number(i64),
}

impl BackupId {
    fn into_string(self) -> String {
        match self {
            Self::Text(value) => value,
            Self::Number(value) => value.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BackupSymptom {
    id: BackupId,
    name: String,
    other_names: Vec<String>,
    #[serde(default)]
    last_modified: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BackupMetric {
    id: BackupId,
    date: String,
    symptom_id: BackupId,
    intensity: String,
    notes: String,
    #[serde(default)]
    last_modified: Option<String>,
}

/// Parses one export. `source_name` is kept on the snapshot for diagnostics.
///
/// # Errors
/// - `LoadError::Json` when the content does not match the export structure.
/// - `LoadError::Timestamp` when any date field cannot be parsed.
pub fn parse_snapshot(source_name: &str, content: &str) -> LoadResult<Snapshot> {
    let document: BackupDocument =
        serde_json::from_str(content.trim()).map_err(|source| LoadError::Json {
            source_name: source_name.to_string(),
            source,
        })?;

    let date = timestamp_field(source_name, "date", None, &document.date)?;
    let published_at = administrative_marker();
    let mut snapshot = Snapshot::new(source_name, date);

    for raw in document.symptoms {
        let id = raw.id.into_string();
        let updated_at =
            optional_timestamp_field(source_name, "lastModified", &id, raw.last_modified)?;
        snapshot.symptoms.push(Symptom {
            id,
            name: raw.name,
            other_names: raw.other_names,
            updated_at,
            published_at,
        });
    }

    for raw in document.history {
        let id = raw.id.into_string();
        let date = timestamp_field(source_name, "date", Some(&id), &raw.date)?;
        let updated_at =
            optional_timestamp_field(source_name, "lastModified", &id, raw.last_modified)?;
        snapshot.metrics.push(Metric {
            id,
            date,
            symptom_id: raw.symptom_id.into_string(),
            intensity: raw.intensity,
            notes: raw.notes,
            updated_at,
            published_at,
        });
    }

    Ok(snapshot)
}

/// Reads and parses one export file.
pub fn load_snapshot(path: impl AsRef<Path>) -> LoadResult<Snapshot> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_snapshot(&path.display().to_string(), &content)
}

/// Loads every non-hidden regular file in `dir`, sorted by snapshot date.
///
/// Files are read in file-name order; snapshots sharing a date keep that order.
///
/// # Side effects
/// - Emits `snapshot_load` logging events with duration and status.
pub fn load_snapshot_dir(dir: impl AsRef<Path>) -> LoadResult<Vec<Snapshot>> {
    let dir = dir.as_ref();
    let started_at = Instant::now();
    info!(
        "event=snapshot_load module=loader status=start dir={}",
        dir.display()
    );

    match read_snapshot_dir(dir) {
        Ok(snapshots) => {
            info!(
                "event=snapshot_load module=loader status=ok duration_ms={} snapshots={}",
                started_at.elapsed().as_millis(),
                snapshots.len()
            );
            Ok(snapshots)
        }
        Err(err) => {
            error!(
                "event=snapshot_load module=loader status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn read_snapshot_dir(dir: &Path) -> LoadResult<Vec<Snapshot>> {
    let io_error = |source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_error)? {
        let entry = entry.map_err(io_error)?;
        let is_hidden = entry.file_name().to_string_lossy().starts_with('.');
        if !is_hidden && entry.file_type().map_err(io_error)?.is_file() {
            paths.push(entry.path());
        }
    }
    paths.sort();

    let mut snapshots = paths
        .iter()
        .map(load_snapshot)
        .collect::<LoadResult<Vec<_>>>()?;
    sort_chronologically(&mut snapshots);
    Ok(snapshots)
}

fn timestamp_field(
    source_name: &str,
    field: &'static str,
    record_id: Option<&str>,
    value: &str,
) -> LoadResult<Timestamp> {
    parse_timestamp(value).map_err(|source| LoadError::Timestamp {
        source_name: source_name.to_string(),
        field,
        record_id: record_id.map(str::to_string),
        source,
    })
}

fn optional_timestamp_field(
    source_name: &str,
    field: &'static str,
    record_id: &str,
    value: Option<String>,
) -> LoadResult<Option<Timestamp>> {
    value
        .map(|raw| timestamp_field(source_name, field, Some(record_id), &raw))
        .transpose()
}
