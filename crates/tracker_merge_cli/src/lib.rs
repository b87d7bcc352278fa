//! Shared bootstrap for the consolidation command-line tools.
//!
//! # Responsibility
//! - Resolve configuration and start logging before any work runs.
//! - Turn a fatal error into a stderr message and a non-zero exit status.

use log::error;
use std::error::Error;
use std::process::ExitCode;
use tracker_merge_core::{flush_logging, init_logging, load_config, MergeConfig};

pub type CliResult<T> = Result<T, Box<dyn Error>>;

/// Loads the fixed run configuration and initializes logging from it.
pub fn bootstrap() -> CliResult<MergeConfig> {
    let config = load_config()?;
    init_logging(&config.log_level, &config.log_dir)?;
    Ok(config)
}

/// Runs `tool` and maps its outcome to the process exit status.
pub fn run_tool(name: &str, tool: impl FnOnce() -> CliResult<()>) -> ExitCode {
    let outcome = tool();
    let status = match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=tool_exit module=cli status=error tool={name} error={err}");
            eprintln!("ERROR: {err}");
            ExitCode::FAILURE
        }
    };
    flush_logging();
    status
}
