use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use super::{non_empty, ServiceContext};
use crate::form::DynamicFormValidator;
use crate::models::{
    Criterion, CriterionSubmission, NewSubmission, StatusCounts, SubmissionContent,
    SubmissionStatus,
};
use crate::progress::required_field_completion;
use crate::storage;
use crate::workflow::{ensure_transition, require};
use crate::{ActorId, Error, Result};

const ENTITY: &str = "CriterionSubmission";

/// Completion of a submission against its criterion.
///
/// With a form, the form's own formula decides. Without one, the share of
/// required keys filled, where an explicit `is_complete = true` counts as
/// done.
pub fn completion_for(
    criterion: &Criterion,
    submission: &CriterionSubmission,
    is_complete: Option<bool>,
) -> f64 {
    match criterion.form_config() {
        Some(config) => DynamicFormValidator::calculate_completion(&submission.form_data, config),
        None => required_field_completion(
            &submission.completion_values(),
            &criterion.required_fields(),
            is_complete,
        ),
    }
}

#[derive(Clone)]
pub struct SubmissionService {
    ctx: ServiceContext,
}

impl SubmissionService {
    pub const fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn create(&self, new: NewSubmission, actor: ActorId) -> Result<CriterionSubmission> {
        let mut tx = self.ctx.storage.begin().await?;
        storage::period::get(&mut tx, new.period_id).await?;
        let criterion = storage::criterion::get(&mut tx, new.criterion_id).await?;

        let now = Utc::now();
        let mut submission = CriterionSubmission {
            id: Uuid::new_v4(),
            period_id: new.period_id,
            criterion_id: new.criterion_id,
            content: new.content,
            form_data: new.form_data.unwrap_or_else(|| Value::Object(serde_json::Map::new())),
            status: SubmissionStatus::Draft,
            is_complete: false,
            completion_percentage: 0.0,
            notes: None,
            submitted_by: None,
            submitted_at: None,
            reviewed_by: None,
            reviewed_at: None,
            approved_by: None,
            approved_at: None,
            created_by: Some(actor),
            created_at: now,
            updated_at: now,
        };
        refresh_completion(&criterion, &mut submission, new.is_complete);

        storage::submission::insert(&mut tx, &submission).await?;
        tx.commit().await?;

        info!(
            id = %submission.id,
            period_id = %submission.period_id,
            criterion_id = %submission.criterion_id,
            completion = submission.completion_percentage,
            "Submission created"
        );
        Ok(submission)
    }

    pub async fn get(&self, id: Uuid) -> Result<CriterionSubmission> {
        let mut conn = self.ctx.storage.acquire().await?;
        storage::submission::get(&mut conn, id).await
    }

    pub async fn list_for_period(
        &self,
        period_id: Uuid,
        status: Option<SubmissionStatus>,
    ) -> Result<Vec<CriterionSubmission>> {
        let mut conn = self.ctx.storage.acquire().await?;
        storage::submission::list_for_period(&mut conn, period_id, status).await
    }

    /// Replaces the given parts of the content and recomputes completion.
    pub async fn save_content(
        &self,
        id: Uuid,
        update: SubmissionContent,
        actor: ActorId,
    ) -> Result<CriterionSubmission> {
        let mut tx = self.ctx.storage.begin().await?;
        let mut submission = storage::submission::get(&mut tx, id).await?;
        if !submission.status.is_editable() {
            return Err(Error::validation(
                "status",
                format!("a '{}' submission cannot be edited", submission.status),
            ));
        }
        let criterion = storage::criterion::get(&mut tx, submission.criterion_id).await?;

        if let Some(content) = update.content {
            submission.content = Some(content);
        }
        if let Some(form_data) = update.form_data {
            submission.form_data = form_data;
        }
        refresh_completion(&criterion, &mut submission, update.is_complete);
        submission.updated_at = Utc::now();

        storage::submission::update(&mut tx, &submission).await?;
        tx.commit().await?;

        info!(
            %id,
            actor = %actor,
            completion = submission.completion_percentage,
            "Submission content saved"
        );
        Ok(submission)
    }

    /// Hands a complete draft over for review. Form data must satisfy the
    /// criterion's form rules.
    pub async fn submit(&self, id: Uuid, actor: ActorId) -> Result<CriterionSubmission> {
        let mut tx = self.ctx.storage.begin().await?;
        let mut submission = storage::submission::get(&mut tx, id).await?;
        let from = submission.status;
        let to = SubmissionStatus::Submitted;

        ensure_transition(from, to)?;
        require(from, to, submission.is_complete, "submission is not complete")?;
        require(from, to, submission.has_content(), "content is empty")?;

        let criterion = storage::criterion::get(&mut tx, submission.criterion_id).await?;
        DynamicFormValidator::validate(&submission.form_data, &criterion)?;

        let now = Utc::now();
        submission.status = to;
        submission.submitted_by = Some(actor);
        submission.submitted_at = Some(now);
        submission.updated_at = now;
        storage::submission::update(&mut tx, &submission).await?;
        tx.commit().await?;

        self.ctx.status_changed(id, from, to, Some(actor)).await;
        self.ctx.approval_requested(ENTITY, id).await;
        Ok(submission)
    }

    pub async fn start_review(&self, id: Uuid, actor: ActorId) -> Result<CriterionSubmission> {
        self.transition(id, SubmissionStatus::Review, actor, |s, now| {
            s.reviewed_by = Some(actor);
            s.reviewed_at = Some(now);
        })
        .await
    }

    pub async fn approve(&self, id: Uuid, actor: ActorId) -> Result<CriterionSubmission> {
        self.transition(id, SubmissionStatus::Approved, actor, |s, now| {
            s.approved_by = Some(actor);
            s.approved_at = Some(now);
        })
        .await
    }

    /// Sends the submission back to its author with `notes`.
    pub async fn reject(
        &self,
        id: Uuid,
        notes: Option<String>,
        actor: ActorId,
    ) -> Result<CriterionSubmission> {
        let mut tx = self.ctx.storage.begin().await?;
        let mut submission = storage::submission::get(&mut tx, id).await?;
        let from = submission.status;
        let to = SubmissionStatus::Revision;
        ensure_transition(from, to)?;
        let notes = non_empty("notes", notes)?;

        let now = Utc::now();
        submission.status = to;
        submission.notes = Some(notes);
        submission.reviewed_by = Some(actor);
        submission.reviewed_at = Some(now);
        submission.updated_at = now;
        storage::submission::update(&mut tx, &submission).await?;
        tx.commit().await?;

        self.ctx.status_changed(id, from, to, Some(actor)).await;
        Ok(submission)
    }

    pub async fn statistics(&self) -> Result<StatusCounts> {
        let mut conn = self.ctx.storage.acquire().await?;
        storage::submission::count_by_status(&mut conn).await
    }

    async fn transition(
        &self,
        id: Uuid,
        to: SubmissionStatus,
        actor: ActorId,
        stamp: impl FnOnce(&mut CriterionSubmission, DateTime<Utc>) + Send,
    ) -> Result<CriterionSubmission> {
        let mut tx = self.ctx.storage.begin().await?;
        let mut submission = storage::submission::get(&mut tx, id).await?;
        let from = submission.status;
        ensure_transition(from, to)?;

        let now = Utc::now();
        submission.status = to;
        stamp(&mut submission, now);
        submission.updated_at = now;
        storage::submission::update(&mut tx, &submission).await?;
        tx.commit().await?;

        self.ctx.status_changed(id, from, to, Some(actor)).await;
        Ok(submission)
    }
}

fn refresh_completion(
    criterion: &Criterion,
    submission: &mut CriterionSubmission,
    is_complete: Option<bool>,
) {
    submission.completion_percentage = completion_for(criterion, submission, is_complete);
    submission.is_complete =
        is_complete.unwrap_or(submission.completion_percentage >= 100.0);
}
