mod common;

use common::harness;
use mutu_core::form::{
    Comparison, Direction, FieldDef, FieldType, FormConfig, MigrationPolicy, NewDataRow,
    MAX_MAPPED_FIELDS,
};
use mutu_core::models::{CriterionMetadata, SubmissionContent, SubmissionStatus};
use mutu_core::{DynamicFormValidator, ErrorKind};
use serde_json::{json, Map, Value};

fn values(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

fn lecturer_fields() -> Vec<FieldDef> {
    vec![
        FieldDef::new("nama_dosen", FieldType::Text).required(),
        FieldDef::new("nidn", FieldType::Text),
        FieldDef::new("jabatan", FieldType::Text),
    ]
}

#[tokio::test]
async fn test_circular_reparent_rejected() {
    let h = harness().await;
    let root = h.criterion("1", None).await;
    let child = h.criterion("1.1", Some(root.id)).await;
    let grandchild = h.criterion("1.1.1", Some(child.id)).await;

    let err = h
        .services
        .criteria
        .move_to(root.id, Some(grandchild.id))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StructuralConstraint);
    assert!(h.services.criteria.get(root.id).await.unwrap().parent_id.is_none());

    let err = h.services.criteria.move_to(root.id, Some(root.id)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StructuralConstraint);

    let moved = h.services.criteria.move_to(grandchild.id, None).await.unwrap();
    assert!(moved.parent_id.is_none());

    let tree = h.services.criteria.tree(None).await.unwrap();
    assert_eq!(tree.len(), 2);

    let err = h.services.criteria.delete(root.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StructuralConstraint);
}

#[tokio::test]
async fn test_capacity_exceeded_binds_nothing() {
    let h = harness().await;
    let criterion = h.criterion("3.1", None).await;
    let fields: Vec<FieldDef> = (1..=MAX_MAPPED_FIELDS + 1)
        .map(|i| FieldDef::new(format!("field_{i}"), FieldType::Text))
        .collect();

    let err = h
        .services
        .mappings
        .setup_mappings(criterion.id, &fields)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CapacityExceeded);

    let schema = h.services.mappings.schema(criterion.id).await.unwrap();
    assert!(schema.is_empty());

    let mappings = h
        .services
        .mappings
        .setup_mappings(criterion.id, &fields[..MAX_MAPPED_FIELDS])
        .await
        .unwrap();
    assert_eq!(mappings.len(), MAX_MAPPED_FIELDS);
    assert_eq!(mappings[29].column.column_name(), "c30");

    let err = h
        .services
        .mappings
        .setup_mappings(criterion.id, &fields[..1])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StructuralConstraint);
}

#[tokio::test]
async fn test_data_rows_round_trip_by_field_name() {
    let h = harness().await;
    let period = h.period().await;
    let criterion = h.criterion("4.1", None).await;
    h.services
        .mappings
        .setup_mappings(criterion.id, &lecturer_fields())
        .await
        .unwrap();
    let submission = h.submission(&period, &criterion, Some("Tabel dosen")).await;

    let dictionary = h
        .services
        .mappings
        .mappings_dictionary(criterion.id)
        .await
        .unwrap();
    assert_eq!(dictionary.get("nama_dosen").map(String::as_str), Some("c1"));
    assert_eq!(dictionary.get("jabatan").map(String::as_str), Some("c3"));

    let rows = h
        .services
        .data
        .bulk_create(
            submission.id,
            vec![
                NewDataRow::new(values(&[
                    ("nama_dosen", json!("Siti")),
                    ("jabatan", json!("Lektor")),
                ])),
                NewDataRow::new(values(&[
                    ("nama_dosen", json!("Budi")),
                    ("jabatan", json!("Asisten Ahli")),
                ])),
            ],
        )
        .await
        .unwrap();
    assert_eq!(rows[0].row_number, 1);
    assert_eq!(rows[1].row_number, 2);

    let stored = h.services.data.rows(submission.id).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].get("nama_dosen"), Some(&json!("Siti")));
    assert_eq!(stored[1].get("jabatan"), Some(&json!("Asisten Ahli")));

    let lektor = h
        .services
        .data
        .query(criterion.id)
        .await
        .unwrap()
        .where_field("jabatan", Comparison::Equal, "Lektor")
        .unwrap()
        .order_by_field("nama_dosen", Direction::Asc)
        .unwrap()
        .get()
        .await
        .unwrap();
    assert_eq!(lektor.len(), 1);
    assert_eq!(lektor[0].get("nama_dosen"), Some(&json!("Siti")));

    let err = h
        .services
        .data
        .query(criterion.id)
        .await
        .unwrap()
        .where_field("gaji", Comparison::Equal, 1)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FieldNotMapped);

    let err = h
        .services
        .data
        .create(
            submission.id,
            NewDataRow::new(values(&[("gaji", json!(1))])),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FieldNotMapped);

    let updated = h
        .services
        .data
        .update(rows[1].id, &values(&[("nidn", json!("0011223344"))]))
        .await
        .unwrap();
    assert_eq!(updated.get("nidn"), Some(&json!("0011223344")));
    assert_eq!(updated.get("nama_dosen"), Some(&json!("Budi")));

    let synced = h
        .services
        .data
        .sync_data(
            submission.id,
            vec![NewDataRow::new(values(&[("nama_dosen", json!("Rina"))]))],
        )
        .await
        .unwrap();
    assert_eq!(synced.len(), 1);
    assert_eq!(h.services.data.rows(submission.id).await.unwrap().len(), 1);

    let err = h.services.criteria.delete(criterion.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StructuralConstraint);
}

#[tokio::test]
async fn test_data_frozen_after_submit() {
    let h = harness().await;
    let period = h.period().await;
    let criterion = h.criterion("4.2", None).await;
    h.services
        .mappings
        .setup_mappings(criterion.id, &lecturer_fields())
        .await
        .unwrap();
    let submission = h.submission(&period, &criterion, Some("Tabel dosen")).await;
    h.services.submissions.submit(submission.id, h.actor).await.unwrap();

    let err = h
        .services
        .data
        .create(
            submission.id,
            NewDataRow::new(values(&[("nama_dosen", json!("Siti"))])),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

async fn rebound(policy: MigrationPolicy) -> Result<Map<String, Value>, ErrorKind> {
    let h = harness().await;
    let period = h.period().await;
    let criterion = h.criterion("5.1", None).await;
    let original = vec![
        FieldDef::new("a", FieldType::Text),
        FieldDef::new("b", FieldType::Text),
    ];
    h.services
        .mappings
        .setup_mappings(criterion.id, &original)
        .await
        .unwrap();
    let submission = h.submission(&period, &criterion, Some("x")).await;
    h.services
        .data
        .create(
            submission.id,
            NewDataRow::new(values(&[("a", json!("one")), ("b", json!("two"))])),
        )
        .await
        .unwrap();

    let swapped = vec![
        FieldDef::new("b", FieldType::Text),
        FieldDef::new("a", FieldType::Text),
    ];
    match h
        .services
        .mappings
        .update_mappings(criterion.id, &swapped, policy)
        .await
    {
        Ok(_) => {
            let rows = h.services.data.rows(submission.id).await.unwrap();
            Ok(rows[0].values.clone())
        }
        Err(e) => {
            let schema = h.services.mappings.schema(criterion.id).await.unwrap();
            assert_eq!(schema.version, 1);
            assert_eq!(schema.column_for("a").unwrap().column_name(), "c1");
            Err(e.kind())
        }
    }
}

#[tokio::test]
async fn test_migration_policies() {
    let remapped = rebound(MigrationPolicy::RemapByName).await.unwrap();
    assert_eq!(remapped.get("a"), Some(&json!("one")));
    assert_eq!(remapped.get("b"), Some(&json!("two")));

    let reinterpreted = rebound(MigrationPolicy::Reinterpret).await.unwrap();
    assert_eq!(reinterpreted.get("b"), Some(&json!("one")));
    assert_eq!(reinterpreted.get("a"), Some(&json!("two")));

    let rejected = rebound(MigrationPolicy::Reject).await.unwrap_err();
    assert_eq!(rejected, ErrorKind::StructuralConstraint);
}

#[tokio::test]
async fn test_form_completion_and_submit_validation() {
    let h = harness().await;
    let period = h.period().await;
    let config: FormConfig = serde_json::from_value(json!({
        "type": "narrative",
        "fields": [
            {"name": "visi", "type": "textarea", "required": true},
            {"name": "website", "type": "url", "required": true}
        ]
    }))
    .unwrap();
    let criterion = h
        .criterion_with(
            "6.1",
            None,
            CriterionMetadata {
                form_config: Some(config),
                ..CriterionMetadata::default()
            },
        )
        .await;
    let submission = h.submission(&period, &criterion, Some("Narasi")).await;
    assert!(submission.completion_percentage.abs() < f64::EPSILON);

    let half = h
        .services
        .submissions
        .save_content(
            submission.id,
            SubmissionContent {
                form_data: Some(json!({"visi": "Unggul"})),
                ..SubmissionContent::default()
            },
            h.actor,
        )
        .await
        .unwrap();
    assert!((half.completion_percentage - 50.0).abs() < 1e-9);
    assert!(!half.is_complete);

    h.services
        .submissions
        .save_content(
            submission.id,
            SubmissionContent {
                form_data: Some(json!({"visi": "Unggul", "website": "not a url"})),
                ..SubmissionContent::default()
            },
            h.actor,
        )
        .await
        .unwrap();
    let err = h
        .services
        .submissions
        .submit(submission.id, h.actor)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    h.services
        .submissions
        .save_content(
            submission.id,
            SubmissionContent {
                form_data: Some(json!({"visi": "Unggul", "website": "https://if.example.ac.id"})),
                ..SubmissionContent::default()
            },
            h.actor,
        )
        .await
        .unwrap();
    let submitted = h
        .services
        .submissions
        .submit(submission.id, h.actor)
        .await
        .unwrap();
    assert_eq!(submitted.status, SubmissionStatus::Submitted);
}

#[tokio::test]
async fn test_checklist_completion_matches_validation() {
    let h = harness().await;
    let period = h.period().await;
    let config: FormConfig = serde_json::from_value(json!({
        "type": "checklist",
        "items": [
            {"name": "renstra", "label": "Renstra"},
            {"name": "sk_rektor", "label": "SK Rektor", "file_required": true}
        ]
    }))
    .unwrap();
    let rules = DynamicFormValidator::rules(&config);
    let criterion = h
        .criterion_with(
            "2.3",
            None,
            CriterionMetadata {
                form_config: Some(config),
                ..CriterionMetadata::default()
            },
        )
        .await;
    let submission = h.submission(&period, &criterion, Some("Dokumen")).await;

    let bare = json!({"renstra": true, "sk_rektor": true});
    assert!(rules.check(&bare).is_err());
    let saved = h
        .services
        .submissions
        .save_content(
            submission.id,
            SubmissionContent {
                form_data: Some(bare),
                ..SubmissionContent::default()
            },
            h.actor,
        )
        .await
        .unwrap();
    assert!((saved.completion_percentage - 50.0).abs() < 1e-9);
    assert!(!saved.is_complete);

    let full = json!({"renstra": true, "sk_rektor": {"checked": true, "file": "docs/sk.pdf"}});
    assert!(rules.check(&full).is_ok());
    let saved = h
        .services
        .submissions
        .save_content(
            submission.id,
            SubmissionContent {
                form_data: Some(full),
                ..SubmissionContent::default()
            },
            h.actor,
        )
        .await
        .unwrap();
    assert!((saved.completion_percentage - 100.0).abs() < 1e-9);
    assert!(saved.is_complete);

    let submitted = h
        .services
        .submissions
        .submit(submission.id, h.actor)
        .await
        .unwrap();
    assert_eq!(submitted.status, SubmissionStatus::Submitted);
}
