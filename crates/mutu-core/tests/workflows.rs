mod common;

use chrono::{Datelike, Days, Utc};
use common::{date, harness};
use mutu_core::models::{
    ActionStatus, FindingCategory, FindingStatus, NewActionItem, NewAuditFinding, NewIndicator,
    NewMonitoring, NewQuestion, NewRtl, NewRtm, NewStandard, NewSurvey, PeriodStatus,
    QuestionType, RtlStatus, RtmStatus, StandardStatus, SubmissionContent, SubmissionStatus,
    SurveyStatus, VerificationOutcome, VerificationStatus,
};
use mutu_core::progress::AttentionStatus;
use mutu_core::{DomainEvent, ErrorKind, RtmOutcome};
use serde_json::{json, Map, Value};

fn finding(category: FindingCategory) -> NewAuditFinding {
    NewAuditFinding {
        audit_plan_id: None,
        unit: Some("Fakultas Teknik".to_string()),
        category,
        description: "Dokumen kurikulum belum diperbarui".to_string(),
        due_date: None,
    }
}

#[tokio::test]
async fn test_period_same_status_is_noop() {
    let h = harness().await;
    let period = h.period().await;
    let mut rx = h.events.subscribe();

    let same = h
        .services
        .periods
        .change_status(period.id, PeriodStatus::Persiapan, h.actor)
        .await
        .unwrap();
    assert_eq!(same.status, PeriodStatus::Persiapan);
    assert_eq!(same.updated_at, period.updated_at);
    assert!(rx.try_recv().is_err());

    let moved = h
        .services
        .periods
        .change_status(period.id, PeriodStatus::Pengisian, h.actor)
        .await
        .unwrap();
    assert_eq!(moved.status, PeriodStatus::Pengisian);

    let err = h
        .services
        .periods
        .change_status(period.id, PeriodStatus::Selesai, h.actor)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
}

#[tokio::test]
async fn test_period_delete_blocked_by_submissions() {
    let h = harness().await;
    let period = h.period().await;
    let criterion = h.criterion("1.1", None).await;
    h.submission(&period, &criterion, None).await;

    let err = h.services.periods.delete(period.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StructuralConstraint);

    let summary = h.services.periods.summary(period.id).await.unwrap();
    assert_eq!(summary.submissions, 1);
}

#[tokio::test]
async fn test_submission_review_cycle() {
    let h = harness().await;
    let period = h.period().await;
    let criterion = h.criterion("2.1", None).await;
    let mut rx = h.events.subscribe();

    let draft = h.submission(&period, &criterion, None).await;
    assert_eq!(draft.status, SubmissionStatus::Draft);
    assert!(!draft.is_complete);

    let err = h.services.submissions.submit(draft.id, h.actor).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);

    let filled = h
        .services
        .submissions
        .save_content(
            draft.id,
            SubmissionContent {
                content: Some("Visi dan misi program studi".to_string()),
                ..SubmissionContent::default()
            },
            h.actor,
        )
        .await
        .unwrap();
    assert!(filled.is_complete);
    assert!((filled.completion_percentage - 100.0).abs() < f64::EPSILON);

    let submitted = h.services.submissions.submit(draft.id, h.actor).await.unwrap();
    assert_eq!(submitted.status, SubmissionStatus::Submitted);
    assert_eq!(submitted.submitted_by, Some(h.actor));

    let changed = rx.recv().await.unwrap();
    assert!(matches!(changed, DomainEvent::StatusChanged { ref to, .. } if to == "submitted"));
    let approval = rx.recv().await.unwrap();
    assert!(matches!(approval, DomainEvent::ApprovalRequested { .. }));

    let err = h
        .services
        .submissions
        .save_content(draft.id, SubmissionContent::default(), h.actor)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    h.services.submissions.start_review(draft.id, h.actor).await.unwrap();
    let err = h
        .services
        .submissions
        .reject(draft.id, None, h.actor)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let revised = h
        .services
        .submissions
        .reject(draft.id, Some("Lengkapi data dosen".to_string()), h.actor)
        .await
        .unwrap();
    assert_eq!(revised.status, SubmissionStatus::Revision);
    assert_eq!(revised.notes.as_deref(), Some("Lengkapi data dosen"));

    h.services.submissions.submit(draft.id, h.actor).await.unwrap();
    let approved = h.services.submissions.approve(draft.id, h.actor).await.unwrap();
    assert_eq!(approved.status, SubmissionStatus::Approved);
    assert_eq!(approved.approved_by, Some(h.actor));

    let stats = h.services.submissions.statistics().await.unwrap();
    assert_eq!(stats.get("approved"), 1);
}

#[tokio::test]
async fn test_finding_due_dates_follow_category() {
    let h = harness().await;
    let today = Utc::now().date_naive();

    for (category, days) in [
        (FindingCategory::Major, 30),
        (FindingCategory::Minor, 60),
        (FindingCategory::Ofi, 90),
    ] {
        let created = h
            .services
            .audits
            .create_finding(finding(category), h.actor)
            .await
            .unwrap();
        assert_eq!(created.due_date, today + chrono::Duration::days(days));
    }

    let explicit = h
        .services
        .audits
        .create_finding(
            NewAuditFinding {
                due_date: Some(date(2030, 1, 15)),
                ..finding(FindingCategory::Major)
            },
            h.actor,
        )
        .await
        .unwrap();
    assert_eq!(explicit.due_date, date(2030, 1, 15));
}

#[tokio::test]
async fn test_codes_are_sequential_per_year() {
    let h = harness().await;
    let year = Utc::now().year();

    let first = h
        .services
        .audits
        .create_finding(finding(FindingCategory::Minor), h.actor)
        .await
        .unwrap();
    let second = h
        .services
        .audits
        .create_finding(finding(FindingCategory::Minor), h.actor)
        .await
        .unwrap();
    assert_eq!(first.finding_code, format!("AUD-{year}-001"));
    assert_eq!(second.finding_code, format!("AUD-{year}-002"));

    let rtl = h
        .services
        .rtls
        .create(
            NewRtl {
                finding_id: first.id,
                rtl_code: None,
                action_plan: "Revisi kurikulum".to_string(),
                pic_id: None,
                target_date: None,
            },
            h.actor,
        )
        .await
        .unwrap();
    assert_eq!(rtl.rtl_code, format!("RTL-{year}-001"));
}

#[tokio::test]
async fn test_custom_rtl_code_keeps_sequence_intact() {
    let h = harness().await;
    let year = Utc::now().year();
    let mut codes = Vec::new();
    for custom in [None, Some(format!("RTL-{year}-X01")), None] {
        let created = h
            .services
            .audits
            .create_finding(finding(FindingCategory::Minor), h.actor)
            .await
            .unwrap();
        let rtl = h
            .services
            .rtls
            .create(
                NewRtl {
                    finding_id: created.id,
                    rtl_code: custom,
                    action_plan: "Perbaiki dokumen".to_string(),
                    pic_id: None,
                    target_date: None,
                },
                h.actor,
            )
            .await
            .unwrap();
        codes.push(rtl.rtl_code);
    }
    assert_eq!(
        codes,
        [
            format!("RTL-{year}-001"),
            format!("RTL-{year}-X01"),
            format!("RTL-{year}-002"),
        ]
    );
}

#[tokio::test]
async fn test_indicator_codes_for_non_ascii_category() {
    let h = harness().await;
    let standard = h
        .services
        .spmi
        .create_standard(
            NewStandard {
                name: "Standar Pembiayaan".to_string(),
                category: "ékonomi".to_string(),
                statement: None,
            },
            h.actor,
        )
        .await
        .unwrap();
    let mut codes = Vec::new();
    for name in ["Biaya per mahasiswa", "Dana penelitian"] {
        let indicator = h
            .services
            .spmi
            .add_indicator(
                standard.id,
                NewIndicator {
                    name: name.to_string(),
                    category: "ékonomi".to_string(),
                    target_value: 100.0,
                    unit: None,
                },
            )
            .await
            .unwrap();
        codes.push(indicator.code);
    }
    assert_eq!(codes, ["IND-_KONOMI-001", "IND-_KONOMI-002"]);
}

#[tokio::test]
async fn test_rtl_completion_needs_full_progress() {
    let h = harness().await;
    let created = h
        .services
        .audits
        .create_finding(finding(FindingCategory::Major), h.actor)
        .await
        .unwrap();
    let rtl = h
        .services
        .rtls
        .create(
            NewRtl {
                finding_id: created.id,
                rtl_code: Some("RTL-CUSTOM-1".to_string()),
                action_plan: "Susun ulang RPS".to_string(),
                pic_id: Some(h.actor),
                target_date: None,
            },
            h.actor,
        )
        .await
        .unwrap();
    assert_eq!(rtl.rtl_code, "RTL-CUSTOM-1");

    let err = h
        .services
        .rtls
        .create(
            NewRtl {
                finding_id: created.id,
                rtl_code: None,
                action_plan: "Second plan".to_string(),
                pic_id: None,
                target_date: None,
            },
            h.actor,
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateKey);

    let err = h
        .services
        .rtls
        .update_progress(rtl.id, 50.0, h.actor)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);

    h.services.rtls.start(rtl.id, h.actor).await.unwrap();
    h.services.rtls.update_progress(rtl.id, 80.0, h.actor).await.unwrap();

    let err = h.services.rtls.complete(rtl.id, h.actor).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    let unchanged = h.services.rtls.get(rtl.id).await.unwrap();
    assert_eq!(unchanged.status, RtlStatus::InProgress);

    let err = h
        .services
        .rtls
        .update_progress(rtl.id, 120.0, h.actor)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    h.services.rtls.update_progress(rtl.id, 100.0, h.actor).await.unwrap();
    let completed = h.services.rtls.complete(rtl.id, h.actor).await.unwrap();
    assert_eq!(completed.status, RtlStatus::Completed);
    assert_eq!(completed.verification_status, VerificationStatus::Pending);
    assert!(completed.completed_at.is_some());
}

#[tokio::test]
async fn test_rejected_verification_reopens_rtl() {
    let h = harness().await;
    let created = h
        .services
        .audits
        .create_finding(finding(FindingCategory::Minor), h.actor)
        .await
        .unwrap();
    let rtl = h
        .services
        .rtls
        .create(
            NewRtl {
                finding_id: created.id,
                rtl_code: None,
                action_plan: "Pelatihan dosen".to_string(),
                pic_id: None,
                target_date: None,
            },
            h.actor,
        )
        .await
        .unwrap();

    let err = h
        .services
        .rtls
        .verify(rtl.id, VerificationOutcome::Approved, None, h.actor)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);

    h.services.rtls.start(rtl.id, h.actor).await.unwrap();
    h.services.rtls.update_progress(rtl.id, 100.0, h.actor).await.unwrap();
    h.services.rtls.complete(rtl.id, h.actor).await.unwrap();

    let reopened = h
        .services
        .rtls
        .verify(
            rtl.id,
            VerificationOutcome::Revision,
            Some("Bukti kurang".to_string()),
            h.actor,
        )
        .await
        .unwrap();
    assert_eq!(reopened.status, RtlStatus::InProgress);
    assert_eq!(reopened.verification_status, VerificationStatus::Revision);
    assert!(reopened.completed_at.is_none());

    h.services.rtls.complete(rtl.id, h.actor).await.unwrap();
    let approved = h
        .services
        .rtls
        .verify(rtl.id, VerificationOutcome::Approved, None, h.actor)
        .await
        .unwrap();
    assert_eq!(approved.status, RtlStatus::Completed);
    assert_eq!(approved.verification_status, VerificationStatus::Approved);
    assert_eq!(approved.verified_by, Some(h.actor));
}

#[tokio::test]
async fn test_finding_close_waits_for_rtl() {
    let h = harness().await;
    let created = h
        .services
        .audits
        .create_finding(finding(FindingCategory::Major), h.actor)
        .await
        .unwrap();
    let rtl = h
        .services
        .rtls
        .create(
            NewRtl {
                finding_id: created.id,
                rtl_code: None,
                action_plan: "Perbaiki SOP".to_string(),
                pic_id: None,
                target_date: None,
            },
            h.actor,
        )
        .await
        .unwrap();

    let err = h
        .services
        .audits
        .resolve_finding(created.id, Some("  ".to_string()), h.actor)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    h.services
        .audits
        .resolve_finding(created.id, Some("SOP direvisi".to_string()), h.actor)
        .await
        .unwrap();
    h.services.audits.verify_finding(created.id, h.actor).await.unwrap();

    let err = h
        .services
        .audits
        .close_finding(created.id, h.actor)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    assert_eq!(
        h.services.audits.get_finding(created.id).await.unwrap().status,
        FindingStatus::Verified
    );

    h.services.rtls.start(rtl.id, h.actor).await.unwrap();
    h.services.rtls.update_progress(rtl.id, 100.0, h.actor).await.unwrap();
    h.services.rtls.complete(rtl.id, h.actor).await.unwrap();

    let closed = h.services.audits.close_finding(created.id, h.actor).await.unwrap();
    assert_eq!(closed.status, FindingStatus::Closed);
    assert_eq!(closed.closed_by, Some(h.actor));

    let err = h.services.audits.delete_finding(created.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StructuralConstraint);
}

#[tokio::test]
async fn test_rtm_meeting_and_action_items() {
    let h = harness().await;
    let rtm = h
        .services
        .rtms
        .create(
            NewRtm {
                title: "RTM Semester Ganjil".to_string(),
                meeting_date: date(2025, 9, 1),
                agenda: None,
                chair_id: Some(h.actor),
            },
            h.actor,
        )
        .await
        .unwrap();
    assert_eq!(rtm.status, RtmStatus::Planned);

    let first = h
        .services
        .rtms
        .add_action(
            rtm.id,
            NewActionItem {
                description: "Evaluasi beban dosen".to_string(),
                pic_id: None,
                due_date: None,
            },
        )
        .await
        .unwrap();
    let second = h
        .services
        .rtms
        .add_action(
            rtm.id,
            NewActionItem {
                description: "Perbarui laboratorium".to_string(),
                pic_id: None,
                due_date: None,
            },
        )
        .await
        .unwrap();

    let err = h
        .services
        .rtms
        .complete_action(first.id, h.actor)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);

    h.services.rtms.start_action(first.id, h.actor).await.unwrap();
    h.services
        .rtms
        .update_action_progress(first.id, 100.0, h.actor)
        .await
        .unwrap();
    let done = h.services.rtms.complete_action(first.id, h.actor).await.unwrap();
    assert_eq!(done.status, ActionStatus::Completed);
    h.services
        .rtms
        .update_action_progress(second.id, 50.0, h.actor)
        .await
        .unwrap();

    let progress = h.services.rtms.progress(rtm.id).await.unwrap();
    assert!((progress - 75.0).abs() < 1e-9);

    let err = h.services.rtms.delete(rtm.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StructuralConstraint);

    h.services.rtms.start(rtm.id, h.actor).await.unwrap();
    let err = h
        .services
        .rtms
        .complete(
            rtm.id,
            RtmOutcome {
                decisions: Some("Tambah dosen tetap".to_string()),
                minutes: None,
            },
            h.actor,
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let completed = h
        .services
        .rtms
        .complete(
            rtm.id,
            RtmOutcome {
                decisions: Some("Tambah dosen tetap".to_string()),
                minutes: Some("Rapat dihadiri 12 orang".to_string()),
            },
            h.actor,
        )
        .await
        .unwrap();
    assert_eq!(completed.status, RtmStatus::Completed);

    let err = h
        .services
        .rtms
        .add_action(
            rtm.id,
            NewActionItem {
                description: "Too late".to_string(),
                pic_id: None,
                due_date: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StructuralConstraint);
}

#[tokio::test]
async fn test_survey_lifecycle() {
    let h = harness().await;
    let survey = h
        .services
        .surveys
        .create(
            NewSurvey {
                title: "Kepuasan mahasiswa".to_string(),
                description: None,
            },
            h.actor,
        )
        .await
        .unwrap();

    let err = h.services.surveys.publish(survey.id, h.actor).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);

    let rating = h
        .services
        .surveys
        .add_question(
            survey.id,
            NewQuestion {
                question: "Seberapa puas Anda?".to_string(),
                question_type: QuestionType::Rating,
                options: vec![],
                required: true,
                display_order: None,
            },
        )
        .await
        .unwrap();
    let comment = h
        .services
        .surveys
        .add_question(
            survey.id,
            NewQuestion {
                question: "Saran".to_string(),
                question_type: QuestionType::Textarea,
                options: vec![],
                required: false,
                display_order: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(rating.display_order, 1);
    assert_eq!(comment.display_order, 2);

    let err = h
        .services
        .surveys
        .respond(survey.id, Map::new(), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StructuralConstraint);

    let published = h.services.surveys.publish(survey.id, h.actor).await.unwrap();
    assert_eq!(published.status, SurveyStatus::Published);

    let err = h
        .services
        .surveys
        .remove_question(comment.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StructuralConstraint);

    let mut bad = Map::new();
    bad.insert(rating.id.to_string(), json!(9));
    let err = h
        .services
        .surveys
        .respond(survey.id, bad, Some(h.actor))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let mut answers = Map::new();
    answers.insert(rating.id.to_string(), json!(4));
    answers.insert(comment.id.to_string(), Value::String("Perpustakaan".to_string()));
    h.services
        .surveys
        .respond(survey.id, answers, Some(h.actor))
        .await
        .unwrap();

    let summary = h.services.surveys.summary(survey.id).await.unwrap();
    assert_eq!(summary.responses, 1);
    assert_eq!(summary.questions.len(), 2);

    h.services.surveys.close(survey.id, h.actor).await.unwrap();
}

#[tokio::test]
async fn test_standard_versions_and_monitoring() {
    let h = harness().await;
    let standard = h
        .services
        .spmi
        .create_standard(
            NewStandard {
                name: "Standar Kompetensi Lulusan".to_string(),
                category: "akademik".to_string(),
                statement: None,
            },
            h.actor,
        )
        .await
        .unwrap();
    assert_eq!(standard.version, 1);

    let err = h.services.spmi.revise(standard.id, h.actor).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);

    let active = h.services.spmi.approve(standard.id, h.actor).await.unwrap();
    assert_eq!(active.status, StandardStatus::Active);
    assert_eq!(active.approved_by, Some(h.actor));

    let revised = h.services.spmi.revise(standard.id, h.actor).await.unwrap();
    assert_eq!(revised.version, 2);
    assert!(revised.approved_by.is_none());

    let indicator = h
        .services
        .spmi
        .add_indicator(
            standard.id,
            NewIndicator {
                name: "Lulusan tepat waktu".to_string(),
                category: "akademik".to_string(),
                target_value: 80.0,
                unit: Some("%".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(indicator.code, "IND-AKADEMIK-001");

    let low = h
        .services
        .spmi
        .record_monitoring(
            indicator.id,
            NewMonitoring {
                period_label: "2024/2025".to_string(),
                actual_value: 20.0,
                target_value: None,
                notes: None,
            },
            h.actor,
        )
        .await
        .unwrap();
    assert_eq!(low.attention, AttentionStatus::Critical);

    let attention = h.services.spmi.needing_attention().await.unwrap();
    assert_eq!(attention.len(), 1);
    assert_eq!(attention[0].indicator_id, indicator.id);

    let err = h.services.spmi.delete_standard(standard.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StructuralConstraint);

    h.services.spmi.deactivate(standard.id, h.actor).await.unwrap();
    let err = h
        .services
        .spmi
        .add_indicator(
            standard.id,
            NewIndicator {
                name: "Rasio dosen".to_string(),
                category: "sdm".to_string(),
                target_value: 1.0,
                unit: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StructuralConstraint);
}

#[tokio::test]
async fn test_deadline_scan_reports_due_work() {
    let h = harness().await;
    let today = date(2025, 6, 1);

    let soon = h
        .services
        .audits
        .create_finding(
            NewAuditFinding {
                due_date: Some(date(2025, 6, 5)),
                ..finding(FindingCategory::Major)
            },
            h.actor,
        )
        .await
        .unwrap();
    h.services
        .audits
        .create_finding(
            NewAuditFinding {
                due_date: Some(date(2025, 12, 1)),
                ..finding(FindingCategory::Minor)
            },
            h.actor,
        )
        .await
        .unwrap();
    let rtl = h
        .services
        .rtls
        .create(
            NewRtl {
                finding_id: soon.id,
                rtl_code: None,
                action_plan: "Audit ulang".to_string(),
                pic_id: None,
                target_date: today.checked_add_days(Days::new(3)),
            },
            h.actor,
        )
        .await
        .unwrap();

    let mut rx = h.events.subscribe();
    let events = h.services.deadlines.scan(today, 7).await.unwrap();
    assert_eq!(events.len(), 2);
    assert!(events.iter().any(|e| e.id() == soon.id && e.entity() == "AuditFinding"));
    assert!(events.iter().any(|e| e.id() == rtl.id && e.entity() == "RTL"));

    for _ in 0..2 {
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, DomainEvent::DeadlineApproaching { .. }));
    }
}
