//! Merges identically named symptoms in the consolidated database.

use std::process::ExitCode;
use tracker_merge_cli::{bootstrap, run_tool, CliResult};
use tracker_merge_core::{open_existing_db, CollapseService, SqliteRecordStore};

fn main() -> ExitCode {
    run_tool("collapse-duplicates", collapse)
}

fn collapse() -> CliResult<()> {
    let config = bootstrap()?;

    let mut conn = open_existing_db(&config.output_db)?;
    let store = SqliteRecordStore::try_new(&mut conn)?;
    let report = CollapseService::new(store).collapse()?;

    for group in &report.groups {
        for removed in &group.removed {
            println!("symptom {removed:?} ({:?}) merged into {:?}", group.name, group.survivor);
        }
    }
    println!(
        "Merged {} duplicate groups: {} symptoms removed, {} metrics re-pointed",
        report.groups.len(),
        report.symptoms_removed(),
        report.metrics_repointed()
    );
    Ok(())
}
