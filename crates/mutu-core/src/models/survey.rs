use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::ValidationErrors;
use crate::progress::is_filled;
use crate::workflow::Status;
use crate::{ActorId, Error, Result};

string_enum! {
    pub enum SurveyStatus {
        Draft => "draft",
        Published => "published",
        Closed => "closed",
    }
}

impl Status for SurveyStatus {
    const ENTITY: &'static str = "Survey";

    fn allowed_next(self) -> &'static [Self] {
        match self {
            Self::Draft => &[Self::Published],
            Self::Published => &[Self::Closed],
            Self::Closed => &[],
        }
    }
}

string_enum! {
    pub enum QuestionType {
        Text => "text",
        Textarea => "textarea",
        SingleChoice => "single_choice",
        MultipleChoice => "multiple_choice",
        /// 1 to 5 scale
        Rating => "rating",
        Number => "number",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Survey {
    pub id: Uuid,
    pub code: String,
    pub title: String,
    pub description: Option<String>,
    pub status: SurveyStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub created_by: Option<ActorId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSurvey {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewSurvey {
    pub fn into_survey(self, code: String, actor: ActorId) -> Result<Survey> {
        if self.title.trim().is_empty() {
            return Err(Error::validation("title", "title is required"));
        }
        let now = Utc::now();
        Ok(Survey {
            id: Uuid::new_v4(),
            code,
            title: self.title.trim().to_string(),
            description: self.description,
            status: SurveyStatus::Draft,
            published_at: None,
            closed_at: None,
            created_by: Some(actor),
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyQuestion {
    pub id: Uuid,
    pub survey_id: Uuid,
    pub question: String,
    pub question_type: QuestionType,
    pub options: Vec<String>,
    pub required: bool,
    pub display_order: i64,
}

impl SurveyQuestion {
    fn check_answer(&self, answer: Option<&Value>, errors: &mut ValidationErrors) {
        let key = self.id.to_string();
        if !is_filled(answer) {
            if self.required {
                errors.add(key, "an answer is required");
            }
            return;
        }
        let Some(answer) = answer else { return };
        let valid = match self.question_type {
            QuestionType::Text | QuestionType::Textarea => answer.is_string(),
            QuestionType::SingleChoice => answer
                .as_str()
                .is_some_and(|choice| self.options.iter().any(|o| o == choice)),
            QuestionType::MultipleChoice => answer.as_array().is_some_and(|choices| {
                choices.iter().all(|c| {
                    c.as_str()
                        .is_some_and(|choice| self.options.iter().any(|o| o == choice))
                })
            }),
            QuestionType::Rating => answer
                .as_i64()
                .is_some_and(|score| (1..=5).contains(&score)),
            QuestionType::Number => answer.is_number(),
        };
        if !valid {
            errors.add(key, format!("not a valid {} answer", self.question_type));
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewQuestion {
    pub question: String,
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub display_order: Option<i64>,
}

impl NewQuestion {
    pub fn into_question(self, survey_id: Uuid, fallback_order: i64) -> Result<SurveyQuestion> {
        if self.question.trim().is_empty() {
            return Err(Error::validation("question", "question text is required"));
        }
        let needs_options = matches!(
            self.question_type,
            QuestionType::SingleChoice | QuestionType::MultipleChoice
        );
        if needs_options && self.options.is_empty() {
            return Err(Error::validation(
                "options",
                "choice questions need at least one option",
            ));
        }
        Ok(SurveyQuestion {
            id: Uuid::new_v4(),
            survey_id,
            question: self.question.trim().to_string(),
            question_type: self.question_type,
            options: self.options,
            required: self.required,
            display_order: self.display_order.unwrap_or(fallback_order),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyResponse {
    pub id: Uuid,
    pub code: String,
    pub survey_id: Uuid,
    pub respondent_id: Option<ActorId>,
    /// Question id to answer
    pub answers: Map<String, Value>,
    pub submitted_at: DateTime<Utc>,
}

/// Checks answers (keyed by question id) against the survey's questions.
pub fn check_answers(questions: &[SurveyQuestion], answers: &Map<String, Value>) -> Result<()> {
    let mut errors = ValidationErrors::new();
    for question in questions {
        question.check_answer(answers.get(&question.id.to_string()), &mut errors);
    }
    for key in answers.keys() {
        if !questions.iter().any(|q| q.id.to_string() == *key) {
            errors.add(key.clone(), "unknown question");
        }
    }
    errors.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn question(kind: QuestionType, options: &[&str], required: bool) -> SurveyQuestion {
        NewQuestion {
            question: "Q".to_string(),
            question_type: kind,
            options: options.iter().map(ToString::to_string).collect(),
            required,
            display_order: None,
        }
        .into_question(Uuid::new_v4(), 1)
        .unwrap()
    }

    #[test]
    fn missing_required_answer_rejected() {
        let q = question(QuestionType::Text, &[], true);
        let err = check_answers(&[q.clone()], &Map::new()).unwrap_err();
        match err {
            Error::Validation(errors) => assert!(errors.contains(&q.id.to_string())),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn choices_must_be_declared_options() {
        let q = question(QuestionType::SingleChoice, &["ya", "tidak"], true);
        let mut answers = Map::new();
        answers.insert(q.id.to_string(), json!("mungkin"));
        assert!(check_answers(&[q.clone()], &answers).is_err());
        answers.insert(q.id.to_string(), json!("ya"));
        assert!(check_answers(&[q], &answers).is_ok());
    }

    #[test]
    fn rating_range() {
        let q = question(QuestionType::Rating, &[], false);
        let mut answers = Map::new();
        answers.insert(q.id.to_string(), json!(6));
        assert!(check_answers(&[q.clone()], &answers).is_err());
        answers.insert(q.id.to_string(), json!(5));
        assert!(check_answers(&[q], &answers).is_ok());
    }

    #[test]
    fn choice_question_needs_options() {
        let result = NewQuestion {
            question: "Pilih".to_string(),
            question_type: QuestionType::MultipleChoice,
            options: vec![],
            required: false,
            display_order: None,
        }
        .into_question(Uuid::new_v4(), 1);
        assert!(result.is_err());
    }
}
