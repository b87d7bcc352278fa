//! Symptom/metric repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide insert, scan, re-point and delete APIs over `symptoms`/`metrics`.
//! - Provide transactional units of work with commit-or-rollback semantics.
//!
//! # Invariants
//! - Timestamps are stored as RFC 3339 UTC strings.
//! - A record without `updated_at` is stored with the administrative marker.
//! - `other_names` is stored comma-joined.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::metric::{Metric, MetricId};
use crate::model::symptom::{Symptom, SymptomId};
use crate::model::timestamp::{administrative_marker, format_timestamp, parse_timestamp, Timestamp};
use log::warn;
use rusqlite::{params, Connection, Row, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

const SYMPTOM_SELECT_SQL: &str = "SELECT
    id,
    published_at,
    name,
    other_names,
    updated_at
FROM symptoms";

const METRIC_SELECT_SQL: &str = "SELECT
    id,
    published_at,
    symptom_id,
    date,
    updated_at,
    intensity,
    notes
FROM metrics";

const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    (
        "symptoms",
        &["id", "published_at", "name", "other_names", "updated_at"],
    ),
    (
        "metrics",
        &[
            "id",
            "published_at",
            "symptom_id",
            "date",
            "updated_at",
            "intensity",
            "notes",
        ],
    ),
];

const OTHER_NAMES_SEPARATOR: &str = ",";

pub type RepoResult<T> = Result<T, RepoError>;

/// Persistence gateway error.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    SymptomNotFound(SymptomId),
    /// Persisted data cannot be converted to a valid domain record.
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::SymptomNotFound(id) => write!(f, "symptom not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted record: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "record store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "record store requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "record store requires column `{column}` in table `{table}`"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Record-level operations available inside a unit of work.
pub trait RecordRepository {
    fn insert_symptom(&self, symptom: &Symptom) -> RepoResult<()>;
    fn insert_metric(&self, metric: &Metric) -> RepoResult<()>;
    /// Full table scan, ordered by id.
    fn list_symptoms(&self) -> RepoResult<Vec<Symptom>>;
    /// Full table scan, ordered by id.
    fn list_metrics(&self) -> RepoResult<Vec<Metric>>;
    fn count_symptoms(&self) -> RepoResult<u64>;
    fn count_metrics(&self) -> RepoResult<u64>;
    fn count_metrics_for_symptom(&self, symptom_id: &str) -> RepoResult<u64>;
    /// Rewrites `metrics.symptom_id` from `from` to `to`; returns rows changed.
    fn repoint_metrics(&self, from: &str, to: &str) -> RepoResult<usize>;
    /// Deletes one symptom; `SymptomNotFound` when no row matched.
    fn delete_symptom(&self, id: &str) -> RepoResult<()>;
}

/// Scoped access to a record repository.
///
/// `transaction` commits when `work` returns `Ok` and rolls back otherwise,
/// so a unit of work is never half-applied.
pub trait RecordStore {
    fn read<T, F>(&self, work: F) -> RepoResult<T>
    where
        F: FnOnce(&dyn RecordRepository) -> RepoResult<T>;

    fn transaction<T, F>(&mut self, work: F) -> RepoResult<T>
    where
        F: FnOnce(&dyn RecordRepository) -> RepoResult<T>;
}

/// SQLite-backed record repository over a connection or open transaction.
pub struct SqliteRecordRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRecordRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl RecordRepository for SqliteRecordRepository<'_> {
    fn insert_symptom(&self, symptom: &Symptom) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO symptoms (
                id,
                published_at,
                name,
                other_names,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                symptom.id.as_str(),
                format_timestamp(symptom.published_at),
                symptom.name.as_str(),
                join_other_names(&symptom.other_names),
                stored_updated_at(symptom.updated_at),
            ],
        )?;
        Ok(())
    }

    fn insert_metric(&self, metric: &Metric) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO metrics (
                id,
                published_at,
                symptom_id,
                date,
                updated_at,
                intensity,
                notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                metric.id.as_str(),
                format_timestamp(metric.published_at),
                metric.symptom_id.as_str(),
                format_timestamp(metric.date),
                stored_updated_at(metric.updated_at),
                metric.intensity.as_str(),
                metric.notes.as_str(),
            ],
        )?;
        Ok(())
    }

    fn list_symptoms(&self) -> RepoResult<Vec<Symptom>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SYMPTOM_SELECT_SQL} ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut symptoms = Vec::new();
        while let Some(row) = rows.next()? {
            symptoms.push(parse_symptom_row(row)?);
        }
        Ok(symptoms)
    }

    fn list_metrics(&self) -> RepoResult<Vec<Metric>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{METRIC_SELECT_SQL} ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut metrics = Vec::new();
        while let Some(row) = rows.next()? {
            metrics.push(parse_metric_row(row)?);
        }
        Ok(metrics)
    }

    fn count_symptoms(&self) -> RepoResult<u64> {
        count(self.conn, "SELECT COUNT(*) FROM symptoms;", [])
    }

    fn count_metrics(&self) -> RepoResult<u64> {
        count(self.conn, "SELECT COUNT(*) FROM metrics;", [])
    }

    fn count_metrics_for_symptom(&self, symptom_id: &str) -> RepoResult<u64> {
        count(
            self.conn,
            "SELECT COUNT(*) FROM metrics WHERE symptom_id = ?1;",
            [symptom_id],
        )
    }

    fn repoint_metrics(&self, from: &str, to: &str) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "UPDATE metrics
             SET symptom_id = ?1
             WHERE symptom_id = ?2;",
            params![to, from],
        )?;
        Ok(changed)
    }

    fn delete_symptom(&self, id: &str) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM symptoms WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::SymptomNotFound(id.to_string()));
        }
        Ok(())
    }
}

/// SQLite record store owning the run's connection handle.
pub struct SqliteRecordStore<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteRecordStore<'conn> {
    /// Creates a store from a migrated connection.
    ///
    /// # Errors
    /// - Rejects connections whose schema version or columns do not match.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_store_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl RecordStore for SqliteRecordStore<'_> {
    fn read<T, F>(&self, work: F) -> RepoResult<T>
    where
        F: FnOnce(&dyn RecordRepository) -> RepoResult<T>,
    {
        work(&SqliteRecordRepository::new(&*self.conn))
    }

    fn transaction<T, F>(&mut self, work: F) -> RepoResult<T>
    where
        F: FnOnce(&dyn RecordRepository) -> RepoResult<T>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let outcome = work(&SqliteRecordRepository::new(&tx));

        match outcome {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    warn!(
                        "event=store_rollback module=repo status=error error={}",
                        rollback_err
                    );
                }
                Err(err)
            }
        }
    }
}

fn count<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> RepoResult<u64> {
    let value: i64 = conn.query_row(sql, params, |row| row.get(0))?;
    u64::try_from(value).map_err(|_| RepoError::InvalidData(format!("negative row count {value}")))
}

fn parse_symptom_row(row: &Row<'_>) -> RepoResult<Symptom> {
    let id: String = row.get("id")?;
    let other_names: String = row.get("other_names")?;
    Ok(Symptom {
        published_at: parse_stored_timestamp(row, "symptoms", "published_at", &id)?,
        updated_at: Some(parse_stored_timestamp(row, "symptoms", "updated_at", &id)?),
        name: row.get("name")?,
        other_names: split_other_names(&other_names),
        id,
    })
}

fn parse_metric_row(row: &Row<'_>) -> RepoResult<Metric> {
    let id: MetricId = row.get("id")?;
    Ok(Metric {
        published_at: parse_stored_timestamp(row, "metrics", "published_at", &id)?,
        date: parse_stored_timestamp(row, "metrics", "date", &id)?,
        updated_at: Some(parse_stored_timestamp(row, "metrics", "updated_at", &id)?),
        symptom_id: row.get("symptom_id")?,
        intensity: row.get("intensity")?,
        notes: row.get("notes")?,
        id,
    })
}

fn parse_stored_timestamp(
    row: &Row<'_>,
    table: &str,
    column: &str,
    id: &str,
) -> RepoResult<Timestamp> {
    let value: String = row.get(column)?;
    parse_timestamp(&value).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid timestamp `{value}` in {table}.{column} for id `{id}`"
        ))
    })
}

fn stored_updated_at(updated_at: Option<Timestamp>) -> String {
    format_timestamp(updated_at.unwrap_or_else(administrative_marker))
}

fn join_other_names(names: &[String]) -> String {
    names.join(OTHER_NAMES_SEPARATOR)
}

fn split_other_names(value: &str) -> Vec<String> {
    value
        .split(OTHER_NAMES_SEPARATOR)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn ensure_store_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &(table, columns) in REQUIRED_COLUMNS {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(RepoError::MissingRequiredColumn { table, column });
            }
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
