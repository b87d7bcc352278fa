//! Rebuilds the consolidated database from every snapshot export.
//!
//! Snapshots are reconciled fully in memory first; the output database is
//! only reset once reconciliation has succeeded.

use std::process::ExitCode;
use tracker_merge_cli::{bootstrap, run_tool, CliResult};
use tracker_merge_core::{
    load_snapshot_dir, open_db, prepare_output_db, reconcile, ImportProgress, ImportService,
    SqliteRecordStore,
};

fn main() -> ExitCode {
    run_tool("consolidate-records", consolidate)
}

fn consolidate() -> CliResult<()> {
    let config = bootstrap()?;

    let snapshots = load_snapshot_dir(&config.snapshot_dir)?;
    println!(
        "Loaded {} snapshots from {}",
        snapshots.len(),
        config.snapshot_dir.display()
    );
    let reconciliation = reconcile(&snapshots)?;

    prepare_output_db(&config.output_db, config.schema_template.as_deref())?;
    let mut conn = open_db(&config.output_db)?;
    let store = SqliteRecordStore::try_new(&mut conn)?;
    let summary = ImportService::new(store).import(&reconciliation.store, |progress| {
        match progress {
            ImportProgress::Symptom {
                position, total, ..
            } => println!("Saving symptom {position}/{total}"),
            ImportProgress::Metric {
                position, total, ..
            } => println!("Saving metric {position}/{total}"),
        }
    })?;

    println!(
        "Saved {} symptoms and {} metrics into {}",
        summary.symptoms,
        summary.metrics,
        config.output_db.display()
    );
    Ok(())
}
