//! Run configuration.
//!
//! # Responsibility
//! - Locate snapshot inputs, the output database and the log directory.
//! - Merge the optional user config file with environment overrides.
//!
//! # Invariants
//! - Environment variables take precedence over the config file.
//! - Every path in a resolved `MergeConfig` is absolute.

use crate::logging::default_log_level;
use log::{debug, info};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Config file location, relative to `$HOME`.
pub const CONFIG_FILE_PATH: &str = ".config/health-tracker/consolidation.json";

pub const ENV_SNAPSHOT_DIR: &str = "TRACKER_MERGE_SNAPSHOT_DIR";
pub const ENV_OUTPUT_DB: &str = "TRACKER_MERGE_OUTPUT_DB";
pub const ENV_SCHEMA_TEMPLATE: &str = "TRACKER_MERGE_SCHEMA_TEMPLATE";
pub const ENV_LOG_DIR: &str = "TRACKER_MERGE_LOG_DIR";
pub const ENV_LOG_LEVEL: &str = "TRACKER_MERGE_LOG_LEVEL";

const DEFAULT_LOG_SUBDIR: &str = "logs";

/// Fully resolved configuration for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeConfig {
    /// Directory holding one JSON export per snapshot.
    pub snapshot_dir: PathBuf,
    /// Consolidated database written by the import and mutated by the collapse.
    pub output_db: PathBuf,
    /// Empty database cloned into `output_db` before import, when set.
    pub schema_template: Option<PathBuf>,
    pub log_dir: PathBuf,
    pub log_level: String,
}

/// On-disk shape of the optional config file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub snapshot_dir: Option<PathBuf>,
    pub output_db: Option<PathBuf>,
    pub schema_template: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

#[derive(Debug)]
pub enum ConfigError {
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
    MissingValue {
        field: &'static str,
        env_var: &'static str,
    },
    EmptyValue {
        env_var: &'static str,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unreadable { path, source } => {
                write!(f, "failed to read config file `{}`: {source}", path.display())
            }
            Self::Malformed { path, source } => {
                write!(f, "config file `{}` is malformed: {source}", path.display())
            }
            Self::MissingValue { field, env_var } => write!(
                f,
                "`{field}` is not set, please add it to ~/{CONFIG_FILE_PATH} or set {env_var}"
            ),
            Self::EmptyValue { env_var } => write!(f, "{env_var} is set but empty"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Unreadable { source, .. } => Some(source),
            Self::Malformed { source, .. } => Some(source),
            Self::MissingValue { .. } | Self::EmptyValue { .. } => None,
        }
    }
}

impl MergeConfig {
    /// Resolves a config from an optional file, an environment lookup and the
    /// directory relative paths are anchored to.
    ///
    /// # Errors
    /// - `MissingValue` when `snapshot_dir` or `output_db` is set nowhere.
    /// - `EmptyValue` when an override variable is present but blank.
    pub fn resolve<E>(
        file: Option<ConfigFile>,
        env: E,
        base_dir: &Path,
    ) -> Result<Self, ConfigError>
    where
        E: Fn(&str) -> Option<String>,
    {
        let file = file.unwrap_or_default();
        let lookup = |env_var: &'static str| -> Result<Option<String>, ConfigError> {
            match env(env_var) {
                Some(value) if value.trim().is_empty() => Err(ConfigError::EmptyValue { env_var }),
                Some(value) => Ok(Some(value.trim().to_string())),
                None => Ok(None),
            }
        };
        let path_override = |env_var: &'static str, fallback: Option<PathBuf>| {
            lookup(env_var).map(|value| value.map(PathBuf::from).or(fallback))
        };

        let snapshot_dir = path_override(ENV_SNAPSHOT_DIR, file.snapshot_dir)?.ok_or(
            ConfigError::MissingValue {
                field: "snapshot_dir",
                env_var: ENV_SNAPSHOT_DIR,
            },
        )?;
        let output_db = path_override(ENV_OUTPUT_DB, file.output_db)?.ok_or(
            ConfigError::MissingValue {
                field: "output_db",
                env_var: ENV_OUTPUT_DB,
            },
        )?;
        let schema_template = path_override(ENV_SCHEMA_TEMPLATE, file.schema_template)?;

        let output_db = anchor(base_dir, output_db);
        let log_dir = match path_override(ENV_LOG_DIR, file.log_dir)? {
            Some(log_dir) => anchor(base_dir, log_dir),
            None => output_db
                .parent()
                .unwrap_or(base_dir)
                .join(DEFAULT_LOG_SUBDIR),
        };
        let log_level = lookup(ENV_LOG_LEVEL)?
            .or(file.log_level)
            .unwrap_or_else(|| default_log_level().to_string());

        Ok(Self {
            snapshot_dir: anchor(base_dir, snapshot_dir),
            output_db,
            schema_template: schema_template.map(|path| anchor(base_dir, path)),
            log_dir,
            log_level,
        })
    }
}

/// Loads the config file (if present) and applies process environment overrides.
///
/// Relative paths are anchored to the current working directory.
pub fn load_config() -> Result<MergeConfig, ConfigError> {
    let file = match std::env::var_os("HOME") {
        Some(home) => read_config_file(&Path::new(&home).join(CONFIG_FILE_PATH))?,
        None => {
            info!("event=config_load module=config status=skip reason=home_not_set");
            None
        }
    };
    let base_dir = std::env::current_dir().map_err(|source| ConfigError::Unreadable {
        path: PathBuf::from("."),
        source,
    })?;
    MergeConfig::resolve(file, |key| std::env::var(key).ok(), &base_dir)
}

/// Reads a config file, returning `None` when it does not exist.
pub fn read_config_file(path: &Path) -> Result<Option<ConfigFile>, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!(
                "event=config_load module=config status=skip reason=file_not_found path={}",
                path.display()
            );
            return Ok(None);
        }
        Err(source) => {
            return Err(ConfigError::Unreadable {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| ConfigError::Malformed {
            path: path.to_path_buf(),
            source,
        })
}

fn anchor(base_dir: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base_dir.join(path)
    }
}
