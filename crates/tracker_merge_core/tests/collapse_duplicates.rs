use rusqlite::Connection;
use tracker_merge_core::{
    administrative_marker, open_db, open_db_in_memory, open_existing_db, parse_timestamp,
    CollapseError, CollapseService, Metric, RecordRepository, RecordStore, RepoError,
    SqliteRecordStore, Symptom,
};

fn symptom(id: &str, name: &str) -> Symptom {
    Symptom {
        id: id.to_string(),
        name: name.to_string(),
        other_names: Vec::new(),
        updated_at: None,
        published_at: administrative_marker(),
    }
}

fn metric(id: &str, symptom_id: &str) -> Metric {
    Metric {
        id: id.to_string(),
        date: parse_timestamp("2024-01-05T09:00:00Z").unwrap(),
        symptom_id: symptom_id.to_string(),
        intensity: "medium".to_string(),
        notes: String::new(),
        updated_at: None,
        published_at: administrative_marker(),
    }
}

fn seeded_conn(symptoms: &[Symptom], metrics: &[Metric]) -> Connection {
    let mut conn = open_db_in_memory().unwrap();
    {
        let mut store = SqliteRecordStore::try_new(&mut conn).unwrap();
        store
            .transaction(|repo| {
                for symptom in symptoms {
                    repo.insert_symptom(symptom)?;
                }
                for metric in metrics {
                    repo.insert_metric(metric)?;
                }
                Ok(())
            })
            .unwrap();
    }
    conn
}

fn symptom_ids(conn: &mut Connection) -> Vec<String> {
    let store = SqliteRecordStore::try_new(conn).unwrap();
    store
        .read(|repo| repo.list_symptoms())
        .unwrap()
        .into_iter()
        .map(|symptom| symptom.id)
        .collect()
}

fn metric_owner(conn: &Connection, metric_id: &str) -> String {
    conn.query_row(
        "SELECT symptom_id FROM metrics WHERE id = ?1;",
        [metric_id],
        |row| row.get(0),
    )
    .unwrap()
}

#[test]
fn legacy_duplicate_collapses_into_current_format_symptom() {
    let mut conn = seeded_conn(
        &[symptom("sym_a", "Headache"), symptom("42", "Headache")],
        &[metric("met_1", "42")],
    );

    let report = {
        let store = SqliteRecordStore::try_new(&mut conn).unwrap();
        CollapseService::new(store).collapse().unwrap()
    };

    assert_eq!(report.groups.len(), 1);
    let group = &report.groups[0];
    assert_eq!(group.name, "Headache");
    assert_eq!(group.survivor, "sym_a");
    assert_eq!(group.removed, vec!["42".to_string()]);
    assert_eq!(group.metrics_repointed, 1);

    assert_eq!(symptom_ids(&mut conn), vec!["sym_a".to_string()]);
    assert_eq!(metric_owner(&conn, "met_1"), "sym_a");
}

#[test]
fn every_loser_in_a_group_is_merged() {
    let mut conn = seeded_conn(
        &[
            symptom("sym_b", "Nausea"),
            symptom("sym_a", "Nausea"),
            symptom("7", "Nausea"),
        ],
        &[metric("met_1", "7"), metric("met_2", "sym_b"), metric("met_3", "sym_a")],
    );

    let report = {
        let store = SqliteRecordStore::try_new(&mut conn).unwrap();
        CollapseService::new(store).collapse().unwrap()
    };

    assert_eq!(report.symptoms_removed(), 2);
    assert_eq!(report.metrics_repointed(), 2);
    assert_eq!(symptom_ids(&mut conn), vec!["sym_a".to_string()]);
    for metric_id in ["met_1", "met_2", "met_3"] {
        assert_eq!(metric_owner(&conn, metric_id), "sym_a");
    }
}

#[test]
fn names_differing_only_in_case_are_not_merged() {
    let mut conn = seeded_conn(
        &[symptom("sym_a", "Headache"), symptom("42", "headache")],
        &[],
    );

    let report = {
        let store = SqliteRecordStore::try_new(&mut conn).unwrap();
        CollapseService::new(store).collapse().unwrap()
    };

    assert!(report.groups.is_empty());
    assert_eq!(symptom_ids(&mut conn).len(), 2);
}

#[test]
fn collapsing_twice_is_a_no_op() {
    let mut conn = seeded_conn(
        &[symptom("sym_a", "Headache"), symptom("42", "Headache")],
        &[metric("met_1", "42")],
    );

    for _ in 0..2 {
        let store = SqliteRecordStore::try_new(&mut conn).unwrap();
        CollapseService::new(store).collapse().unwrap();
    }

    let store = SqliteRecordStore::try_new(&mut conn).unwrap();
    let report = CollapseService::new(store).collapse().unwrap();
    assert!(report.groups.is_empty());
    assert_eq!(report.metrics_repointed(), 0);
}

#[test]
fn failed_delete_rolls_back_repoint_of_same_group() {
    let mut conn = seeded_conn(
        &[
            symptom("sym_a", "Back pain"),
            symptom("12", "Back pain"),
            symptom("sym_h", "Headache"),
            symptom("42", "Headache"),
        ],
        &[metric("met_1", "12"), metric("met_2", "42")],
    );
    conn.execute_batch(
        "CREATE TRIGGER protect_42
         BEFORE DELETE ON symptoms
         WHEN OLD.id = '42'
         BEGIN
             SELECT RAISE(ABORT, 'injected failure');
         END;",
    )
    .unwrap();

    let error = {
        let store = SqliteRecordStore::try_new(&mut conn).unwrap();
        CollapseService::new(store).collapse().unwrap_err()
    };
    match error {
        CollapseError::Group { name, source } => {
            assert_eq!(name, "Headache");
            assert!(matches!(source, RepoError::Db(_)));
        }
        other => panic!("unexpected error: {other}"),
    }

    // "Back pain" sorts first and was committed before the failure.
    assert_eq!(metric_owner(&conn, "met_1"), "sym_a");
    // The failed group kept both symptoms and its original metric owner.
    assert_eq!(metric_owner(&conn, "met_2"), "42");
    assert_eq!(
        symptom_ids(&mut conn),
        vec!["42".to_string(), "sym_a".to_string(), "sym_h".to_string()]
    );
}

#[test]
fn group_without_current_format_id_keeps_smallest_id() {
    let mut conn = seeded_conn(
        &[symptom("9", "Fatigue"), symptom("17", "Fatigue")],
        &[metric("met_1", "9")],
    );

    let report = {
        let store = SqliteRecordStore::try_new(&mut conn).unwrap();
        CollapseService::new(store).collapse().unwrap()
    };

    assert_eq!(report.groups[0].survivor, "17");
    assert_eq!(metric_owner(&conn, "met_1"), "17");
}

#[test]
fn collapse_against_missing_database_fails_and_creates_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("never-consolidated.sqlite");

    assert!(open_existing_db(&path).is_err());
    assert!(!path.exists());
}

#[test]
fn collapse_runs_against_existing_database_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("consolidation.sqlite");
    {
        let mut conn = open_db(&path).unwrap();
        let mut store = SqliteRecordStore::try_new(&mut conn).unwrap();
        store
            .transaction(|repo| {
                repo.insert_symptom(&symptom("sym_a", "Headache"))?;
                repo.insert_symptom(&symptom("42", "Headache"))?;
                repo.insert_metric(&metric("met_1", "42"))
            })
            .unwrap();
    }

    let mut conn = open_existing_db(&path).unwrap();
    let report = {
        let store = SqliteRecordStore::try_new(&mut conn).unwrap();
        CollapseService::new(store).collapse().unwrap()
    };
    assert_eq!(report.symptoms_removed(), 1);
    assert_eq!(metric_owner(&conn, "met_1"), "sym_a");
}
