use tracker_merge_core::merge::MetricDateOccurrence;
use tracker_merge_core::{
    administrative_marker, parse_timestamp, reconcile, MergeError, Metric, RecordKind, Snapshot,
    Symptom, Timestamp,
};

fn at(value: &str) -> Timestamp {
    parse_timestamp(value).unwrap()
}

fn symptom(id: &str, name: &str, updated_at: Option<&str>) -> Symptom {
    Symptom {
        id: id.to_string(),
        name: name.to_string(),
        other_names: vec!["alias".to_string()],
        updated_at: updated_at.map(at),
        published_at: administrative_marker(),
    }
}

fn metric(id: &str, date: &str, symptom_id: &str, updated_at: Option<&str>) -> Metric {
    Metric {
        id: id.to_string(),
        date: at(date),
        symptom_id: symptom_id.to_string(),
        intensity: "medium".to_string(),
        notes: String::new(),
        updated_at: updated_at.map(at),
        published_at: administrative_marker(),
    }
}

fn snapshot(source: &str, date: &str, symptoms: Vec<Symptom>, metrics: Vec<Metric>) -> Snapshot {
    Snapshot {
        source: source.to_string(),
        date: at(date),
        symptoms,
        metrics,
    }
}

fn first_snapshot() -> Snapshot {
    snapshot(
        "backup-1.json",
        "2024-01-10T00:00:00Z",
        vec![
            symptom("sym_a", "Headache", None),
            symptom("42", "Back pain", Some("2024-01-02T08:00:00Z")),
        ],
        vec![
            metric("met_1", "2024-01-05T09:00:00Z", "sym_a", None),
            metric("met_2", "2024-01-06T09:00:00Z", "42", Some("2024-01-06T09:05:00Z")),
        ],
    )
}

#[test]
fn single_snapshot_reconciles_to_its_own_records() {
    let only = first_snapshot();
    let reconciliation = reconcile(std::slice::from_ref(&only)).unwrap();

    let symptoms: Vec<&Symptom> = reconciliation.store.symptoms.values().collect();
    let mut expected_symptoms: Vec<&Symptom> = only.symptoms.iter().collect();
    expected_symptoms.sort_by(|a, b| a.id.cmp(&b.id));
    assert_eq!(symptoms, expected_symptoms);

    let metrics: Vec<&Metric> = reconciliation.store.metrics.values().collect();
    assert_eq!(metrics, only.metrics.iter().collect::<Vec<_>>());
}

#[test]
fn repeating_unchanged_records_is_idempotent() {
    let first = first_snapshot();
    let mut repeated = first_snapshot();
    repeated.source = "backup-2.json".to_string();
    repeated.date = at("2024-01-11T00:00:00Z");

    let alone = reconcile(&[first.clone()]).unwrap();
    let twice = reconcile(&[first, repeated]).unwrap();
    assert_eq!(alone.store, twice.store);
}

#[test]
fn first_modification_in_later_snapshot_wins() {
    let first = snapshot(
        "s1",
        "2024-01-10T00:00:00Z",
        vec![symptom("sym_a", "Headache", None)],
        Vec::new(),
    );
    let second = snapshot(
        "s2",
        "2024-01-11T00:00:00Z",
        vec![symptom("sym_a", "Migraine", Some("2024-01-10T12:00:00Z"))],
        Vec::new(),
    );

    let reconciliation = reconcile(&[first, second.clone()]).unwrap();
    assert_eq!(reconciliation.store.symptoms["sym_a"], second.symptoms[0]);
}

#[test]
fn never_modified_records_take_the_later_copy() {
    let first = snapshot(
        "s1",
        "2024-01-10T00:00:00Z",
        Vec::new(),
        vec![metric("met_1", "2024-01-05T09:00:00Z", "sym_a", None)],
    );
    let mut later = metric("met_1", "2024-01-05T09:00:00Z", "sym_a", None);
    later.notes = "after the walk".to_string();
    let second = snapshot("s2", "2024-01-11T00:00:00Z", Vec::new(), vec![later.clone()]);

    let reconciliation = reconcile(&[first, second]).unwrap();
    assert_eq!(reconciliation.store.metrics["met_1"], later);
}

#[test]
fn equal_modification_keeps_first_seen_copy() {
    let original = symptom("sym_a", "Headache", Some("2024-01-09T00:00:00Z"));
    let mut renamed = original.clone();
    renamed.name = "Renamed without new timestamp".to_string();

    let reconciliation = reconcile(&[
        snapshot("s1", "2024-01-10T00:00:00Z", vec![original.clone()], Vec::new()),
        snapshot("s2", "2024-01-11T00:00:00Z", vec![renamed], Vec::new()),
    ])
    .unwrap();
    assert_eq!(reconciliation.store.symptoms["sym_a"], original);
}

#[test]
fn older_modification_in_later_snapshot_fails() {
    let error = reconcile(&[
        snapshot(
            "s1",
            "2024-01-10T00:00:00Z",
            vec![symptom("sym_a", "Headache", Some("2024-01-09T00:00:00Z"))],
            Vec::new(),
        ),
        snapshot(
            "s2",
            "2024-01-11T00:00:00Z",
            vec![symptom("sym_a", "Headache", Some("2024-01-08T00:00:00Z"))],
            Vec::new(),
        ),
    ])
    .unwrap_err();

    assert_eq!(
        error,
        MergeError::ModificationRegression {
            kind: RecordKind::Symptom,
            id: "sym_a".to_string(),
            existing_updated_at: at("2024-01-09T00:00:00Z"),
            new_updated_at: Some(at("2024-01-08T00:00:00Z")),
            source: "s2".to_string(),
        }
    );
}

#[test]
fn dropped_modification_timestamp_fails() {
    let error = reconcile(&[
        snapshot(
            "s1",
            "2024-01-10T00:00:00Z",
            Vec::new(),
            vec![metric("met_1", "2024-01-05T09:00:00Z", "sym_a", Some("2024-01-06T00:00:00Z"))],
        ),
        snapshot(
            "s2",
            "2024-01-11T00:00:00Z",
            Vec::new(),
            vec![metric("met_1", "2024-01-05T09:00:00Z", "sym_a", None)],
        ),
    ])
    .unwrap_err();

    assert!(matches!(
        error,
        MergeError::ModificationRegression {
            kind: RecordKind::Metric,
            new_updated_at: None,
            ..
        }
    ));
    assert_eq!(error.code(), "modification_regression");
}

#[test]
fn metric_date_conflict_names_the_metric_and_dates() {
    let error = reconcile(&[
        snapshot(
            "s1",
            "2024-01-10T00:00:00Z",
            Vec::new(),
            vec![metric("met_9", "2024-01-05T09:00:00Z", "sym_a", None)],
        ),
        snapshot(
            "s2",
            "2024-01-11T00:00:00Z",
            Vec::new(),
            vec![metric("met_9", "2024-01-05T10:00:00Z", "sym_a", None)],
        ),
    ])
    .unwrap_err();

    assert_eq!(
        error,
        MergeError::MetricDateConflict {
            metric_id: "met_9".to_string(),
            occurrences: vec![
                MetricDateOccurrence {
                    source: "s1".to_string(),
                    date: at("2024-01-05T09:00:00Z"),
                },
                MetricDateOccurrence {
                    source: "s2".to_string(),
                    date: at("2024-01-05T10:00:00Z"),
                },
            ],
        }
    );
    let message = error.to_string();
    assert!(message.contains("met_9"));
    assert!(message.contains("2024-01-05T09:00:00Z"));
    assert!(message.contains("2024-01-05T10:00:00Z"));
}

#[test]
fn same_instant_in_different_offsets_is_not_a_conflict() {
    let reconciliation = reconcile(&[
        snapshot(
            "s1",
            "2024-01-10T00:00:00Z",
            Vec::new(),
            vec![metric("met_1", "2024-01-05T10:00:00+01:00", "sym_a", None)],
        ),
        snapshot(
            "s2",
            "2024-01-11T00:00:00Z",
            Vec::new(),
            vec![metric("met_1", "2024-01-05T09:00:00Z", "sym_a", None)],
        ),
    ])
    .unwrap();
    assert_eq!(reconciliation.store.metrics.len(), 1);
}

#[test]
fn out_of_order_snapshots_are_rejected() {
    let error = reconcile(&[
        snapshot("later", "2024-02-01T00:00:00Z", Vec::new(), Vec::new()),
        snapshot("earlier", "2024-01-01T00:00:00Z", Vec::new(), Vec::new()),
    ])
    .unwrap_err();

    assert!(matches!(
        error,
        MergeError::OutOfOrder { ref previous_source, ref source, .. }
            if previous_source == "later" && source == "earlier"
    ));
}

#[test]
fn equal_snapshot_dates_are_accepted() {
    let result = reconcile(&[
        snapshot("a", "2024-01-01T00:00:00Z", Vec::new(), Vec::new()),
        snapshot("b", "2024-01-01T00:00:00Z", Vec::new(), Vec::new()),
    ]);
    assert!(result.is_ok());
}

#[test]
fn future_metric_in_any_snapshot_aborts_reconciliation() {
    let error = reconcile(&[
        first_snapshot(),
        snapshot(
            "skewed",
            "2024-01-12T00:00:00Z",
            Vec::new(),
            vec![metric("met_3", "2024-01-15T00:00:00Z", "sym_a", None)],
        ),
    ])
    .unwrap_err();
    assert!(matches!(error, MergeError::FutureData { ref source, .. } if source == "skewed"));
}

#[test]
fn provenance_lists_every_source_per_id() {
    let first = first_snapshot();
    let mut second = first_snapshot();
    second.source = "backup-2.json".to_string();
    second.date = at("2024-01-11T00:00:00Z");
    second.metrics.truncate(1);

    let reconciliation = reconcile(&[first, second]).unwrap();
    assert_eq!(
        reconciliation.provenance.metric_sources("met_1"),
        ["backup-1.json".to_string(), "backup-2.json".to_string()]
    );
    assert_eq!(
        reconciliation.provenance.metric_sources("met_2"),
        ["backup-1.json".to_string()]
    );
    assert_eq!(reconciliation.provenance.symptom_sources("sym_a").len(), 2);
    assert!(reconciliation.provenance.symptom_sources("unknown").is_empty());
}

#[test]
fn empty_input_yields_empty_store() {
    let reconciliation = reconcile(&[]).unwrap();
    assert!(reconciliation.store.is_empty());
}
