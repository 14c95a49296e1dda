use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;
use uuid::Uuid;

use super::{current_year, ServiceContext};
use crate::code::{next_yearly_code, CodeFamily};
use crate::models::survey::check_answers;
use crate::models::{
    NewQuestion, NewSurvey, Survey, SurveyQuestion, SurveyResponse, SurveyStatus,
};
use crate::storage;
use crate::workflow::{ensure_transition, require};
use crate::{ActorId, Error, Result};

#[derive(Debug, Clone, Serialize)]
pub struct SurveySummary {
    pub survey: Survey,
    pub questions: Vec<SurveyQuestion>,
    pub responses: i64,
}

#[derive(Clone)]
pub struct SurveyService {
    ctx: ServiceContext,
}

impl SurveyService {
    pub const fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn create(&self, new: NewSurvey, actor: ActorId) -> Result<Survey> {
        let mut tx = self.ctx.storage.begin().await?;
        let code = next_yearly_code(&mut tx, CodeFamily::Survey, current_year()).await?;
        let survey = new.into_survey(code, actor)?;
        storage::survey::insert(&mut tx, &survey).await?;
        tx.commit().await?;

        info!(id = %survey.id, code = %survey.code, "Survey drafted");
        Ok(survey)
    }

    pub async fn get(&self, id: Uuid) -> Result<Survey> {
        let mut conn = self.ctx.storage.acquire().await?;
        storage::survey::get(&mut conn, id).await
    }

    pub async fn list(&self, status: Option<SurveyStatus>) -> Result<Vec<Survey>> {
        let mut conn = self.ctx.storage.acquire().await?;
        storage::survey::list(&mut conn, status).await
    }

    /// Adds a question to a draft survey, after the last one unless an
    /// explicit order is given.
    pub async fn add_question(&self, survey_id: Uuid, new: NewQuestion) -> Result<SurveyQuestion> {
        let mut tx = self.ctx.storage.begin().await?;
        let survey = storage::survey::get(&mut tx, survey_id).await?;
        ensure_draft(&survey)?;
        let next_order = storage::survey::max_display_order(&mut tx, survey_id).await? + 1;
        let question = new.into_question(survey_id, next_order)?;
        storage::survey::insert_question(&mut tx, &question).await?;
        tx.commit().await?;

        info!(id = %question.id, survey = %survey.code, order = question.display_order, "Survey question added");
        Ok(question)
    }

    pub async fn remove_question(&self, question_id: Uuid) -> Result<()> {
        let mut tx = self.ctx.storage.begin().await?;
        let question = storage::survey::get_question(&mut tx, question_id).await?;
        let survey = storage::survey::get(&mut tx, question.survey_id).await?;
        ensure_draft(&survey)?;
        storage::survey::delete_question(&mut tx, question_id).await?;
        tx.commit().await?;

        info!(id = %question_id, survey = %survey.code, "Survey question removed");
        Ok(())
    }

    pub async fn questions(&self, survey_id: Uuid) -> Result<Vec<SurveyQuestion>> {
        let mut conn = self.ctx.storage.acquire().await?;
        storage::survey::get(&mut conn, survey_id).await?;
        storage::survey::list_questions(&mut conn, survey_id).await
    }

    /// Opens a survey for responses. It needs at least one question.
    pub async fn publish(&self, id: Uuid, actor: ActorId) -> Result<Survey> {
        let mut tx = self.ctx.storage.begin().await?;
        let mut survey = storage::survey::get(&mut tx, id).await?;
        let from = survey.status;
        let to = SurveyStatus::Published;
        ensure_transition(from, to)?;
        let questions = storage::survey::question_count(&mut tx, id).await?;
        require(from, to, questions > 0, "survey has no questions")?;

        let now = Utc::now();
        survey.status = to;
        survey.published_at = Some(now);
        survey.updated_at = now;
        storage::survey::update(&mut tx, &survey).await?;
        tx.commit().await?;

        self.ctx.status_changed(id, from, to, Some(actor)).await;
        Ok(survey)
    }

    pub async fn close(&self, id: Uuid, actor: ActorId) -> Result<Survey> {
        let mut tx = self.ctx.storage.begin().await?;
        let mut survey = storage::survey::get(&mut tx, id).await?;
        let from = survey.status;
        let to = SurveyStatus::Closed;
        ensure_transition(from, to)?;

        let now = Utc::now();
        survey.status = to;
        survey.closed_at = Some(now);
        survey.updated_at = now;
        storage::survey::update(&mut tx, &survey).await?;
        tx.commit().await?;

        self.ctx.status_changed(id, from, to, Some(actor)).await;
        Ok(survey)
    }

    /// Drafts only; a survey that has been published keeps its history.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let mut tx = self.ctx.storage.begin().await?;
        let survey = storage::survey::get(&mut tx, id).await?;
        ensure_draft(&survey)?;
        storage::survey::delete(&mut tx, id).await?;
        tx.commit().await?;

        info!(%id, code = %survey.code, "Survey deleted");
        Ok(())
    }

    /// Records one response. Answers are keyed by question id.
    pub async fn respond(
        &self,
        survey_id: Uuid,
        answers: Map<String, Value>,
        respondent: Option<ActorId>,
    ) -> Result<SurveyResponse> {
        let mut tx = self.ctx.storage.begin().await?;
        let survey = storage::survey::get(&mut tx, survey_id).await?;
        if survey.status != SurveyStatus::Published {
            return Err(Error::structural(format!(
                "survey {} is '{}' and does not accept responses",
                survey.code, survey.status
            )));
        }
        let questions = storage::survey::list_questions(&mut tx, survey_id).await?;
        check_answers(&questions, &answers)?;

        let code = next_yearly_code(&mut tx, CodeFamily::SurveyResponse, current_year()).await?;
        let response = SurveyResponse {
            id: Uuid::new_v4(),
            code,
            survey_id,
            respondent_id: respondent,
            answers,
            submitted_at: Utc::now(),
        };
        storage::survey::insert_response(&mut tx, &response).await?;
        tx.commit().await?;

        info!(id = %response.id, code = %response.code, survey = %survey.code, "Survey response recorded");
        Ok(response)
    }

    pub async fn responses(&self, survey_id: Uuid) -> Result<Vec<SurveyResponse>> {
        let mut conn = self.ctx.storage.acquire().await?;
        storage::survey::get(&mut conn, survey_id).await?;
        storage::survey::list_responses(&mut conn, survey_id).await
    }

    pub async fn summary(&self, id: Uuid) -> Result<SurveySummary> {
        let mut conn = self.ctx.storage.acquire().await?;
        let survey = storage::survey::get(&mut conn, id).await?;
        let questions = storage::survey::list_questions(&mut conn, id).await?;
        let responses = storage::survey::response_count(&mut conn, id).await?;
        Ok(SurveySummary {
            survey,
            questions,
            responses,
        })
    }
}

fn ensure_draft(survey: &Survey) -> Result<()> {
    if survey.status == SurveyStatus::Draft {
        Ok(())
    } else {
        Err(Error::structural(format!(
            "survey {} is '{}', no longer a draft",
            survey.code, survey.status
        )))
    }
}
