//! Output artifact preparation.
//!
//! The consolidated database is rebuilt from scratch on every run: either by
//! cloning an empty schema template or by starting from a missing file that
//! migrations then initialize.

use super::{DbError, DbResult};
use log::info;
use std::path::{Path, PathBuf};

/// Companion files SQLite keeps next to a database file.
const SIDECAR_SUFFIXES: &[&str] = &["-journal", "-wal", "-shm"];

/// Resets `output` so the next `open_db(output)` starts from an empty schema.
///
/// # Side effects
/// - Overwrites `output` with `template` when a template is given.
/// - Otherwise removes any previous `output` file.
/// - Removes leftover `-journal`/`-wal`/`-shm` files of `output` in both cases.
pub fn prepare_output_db(output: &Path, template: Option<&Path>) -> DbResult<()> {
    let output_error = |source| DbError::OutputFile {
        path: output.to_path_buf(),
        source,
    };

    if let Some(parent) = output.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(output_error)?;
    }

    for suffix in SIDECAR_SUFFIXES {
        remove_if_present(&sidecar_path(output, suffix)).map_err(output_error)?;
    }

    match template {
        Some(template) => {
            std::fs::copy(template, output).map_err(|source| DbError::OutputFile {
                path: template.to_path_buf(),
                source,
            })?;
            info!(
                "event=output_prepare module=db status=ok mode=template template={} output={}",
                template.display(),
                output.display()
            );
        }
        None => {
            remove_if_present(output).map_err(output_error)?;
            info!(
                "event=output_prepare module=db status=ok mode=fresh output={}",
                output.display()
            );
        }
    }

    Ok(())
}

fn sidecar_path(output: &Path, suffix: &str) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn remove_if_present(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
