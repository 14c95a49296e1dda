use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use super::{actor_col, actor_text, enum_col, expect_one, json_col, uuid_col};
use crate::models::{Survey, SurveyQuestion, SurveyResponse, SurveyStatus};
use crate::{Error, Result};

const SURVEY: &str = "Survey";
const QUESTION: &str = "SurveyQuestion";

const SURVEY_COLUMNS: &str =
    "id, code, title, description, status, published_at, closed_at, created_by, created_at, updated_at";

pub async fn insert(conn: &mut SqliteConnection, survey: &Survey) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO surveys
            (id, code, title, description, status, published_at, closed_at, created_by, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(survey.id.to_string())
    .bind(&survey.code)
    .bind(&survey.title)
    .bind(&survey.description)
    .bind(survey.status.as_str())
    .bind(survey.published_at)
    .bind(survey.closed_at)
    .bind(actor_text(survey.created_by))
    .bind(survey.created_at)
    .bind(survey.updated_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| Error::from_insert(e, "code", &survey.code))?;

    Ok(())
}

pub async fn update(conn: &mut SqliteConnection, survey: &Survey) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE surveys
        SET title = ?, description = ?, status = ?, published_at = ?, closed_at = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&survey.title)
    .bind(&survey.description)
    .bind(survey.status.as_str())
    .bind(survey.published_at)
    .bind(survey.closed_at)
    .bind(survey.updated_at)
    .bind(survey.id.to_string())
    .execute(&mut *conn)
    .await?;

    expect_one(&result, SURVEY, survey.id)
}

pub async fn get(conn: &mut SqliteConnection, id: Uuid) -> Result<Survey> {
    let sql = format!("SELECT {SURVEY_COLUMNS} FROM surveys WHERE id = ?");
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(Error::not_found(SURVEY, id))?;
    parse_survey(&row)
}

pub async fn list(conn: &mut SqliteConnection, status: Option<SurveyStatus>) -> Result<Vec<Survey>> {
    let rows = match status {
        Some(status) => {
            let sql = format!("SELECT {SURVEY_COLUMNS} FROM surveys WHERE status = ? ORDER BY code");
            sqlx::query(&sql)
                .bind(status.as_str())
                .fetch_all(&mut *conn)
                .await?
        }
        None => {
            let sql = format!("SELECT {SURVEY_COLUMNS} FROM surveys ORDER BY code");
            sqlx::query(&sql).fetch_all(&mut *conn).await?
        }
    };
    rows.iter().map(parse_survey).collect()
}

pub async fn delete(conn: &mut SqliteConnection, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM surveys WHERE id = ?")
        .bind(id.to_string())
        .execute(&mut *conn)
        .await?;
    expect_one(&result, SURVEY, id)
}

fn parse_survey(row: &SqliteRow) -> Result<Survey> {
    Ok(Survey {
        id: uuid_col(row, "id")?,
        code: row.try_get("code")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        status: enum_col(row, "status")?,
        published_at: row.try_get("published_at")?,
        closed_at: row.try_get("closed_at")?,
        created_by: actor_col(row, "created_by")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

// Questions

pub async fn insert_question(conn: &mut SqliteConnection, question: &SurveyQuestion) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO survey_questions
            (id, survey_id, question, question_type, options, required, display_order)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(question.id.to_string())
    .bind(question.survey_id.to_string())
    .bind(&question.question)
    .bind(question.question_type.as_str())
    .bind(serde_json::to_string(&question.options)?)
    .bind(question.required)
    .bind(question.display_order)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn delete_question(conn: &mut SqliteConnection, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM survey_questions WHERE id = ?")
        .bind(id.to_string())
        .execute(&mut *conn)
        .await?;
    expect_one(&result, QUESTION, id)
}

pub async fn get_question(conn: &mut SqliteConnection, id: Uuid) -> Result<SurveyQuestion> {
    let row = sqlx::query(
        "SELECT id, survey_id, question, question_type, options, required, display_order \
         FROM survey_questions WHERE id = ?",
    )
    .bind(id.to_string())
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(Error::not_found(QUESTION, id))?;
    parse_question(&row)
}

pub async fn list_questions(
    conn: &mut SqliteConnection,
    survey_id: Uuid,
) -> Result<Vec<SurveyQuestion>> {
    let rows = sqlx::query(
        "SELECT id, survey_id, question, question_type, options, required, display_order \
         FROM survey_questions WHERE survey_id = ? ORDER BY display_order",
    )
    .bind(survey_id.to_string())
    .fetch_all(&mut *conn)
    .await?;
    rows.iter().map(parse_question).collect()
}

pub async fn question_count(conn: &mut SqliteConnection, survey_id: Uuid) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM survey_questions WHERE survey_id = ?")
        .bind(survey_id.to_string())
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

pub async fn max_display_order(conn: &mut SqliteConnection, survey_id: Uuid) -> Result<i64> {
    let max: Option<i64> =
        sqlx::query_scalar("SELECT MAX(display_order) FROM survey_questions WHERE survey_id = ?")
            .bind(survey_id.to_string())
            .fetch_one(&mut *conn)
            .await?;
    Ok(max.unwrap_or(0))
}

fn parse_question(row: &SqliteRow) -> Result<SurveyQuestion> {
    Ok(SurveyQuestion {
        id: uuid_col(row, "id")?,
        survey_id: uuid_col(row, "survey_id")?,
        question: row.try_get("question")?,
        question_type: enum_col(row, "question_type")?,
        options: json_col(row, "options")?,
        required: row.try_get("required")?,
        display_order: row.try_get("display_order")?,
    })
}

// Responses

pub async fn insert_response(conn: &mut SqliteConnection, response: &SurveyResponse) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO survey_responses (id, code, survey_id, respondent_id, answers, submitted_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(response.id.to_string())
    .bind(&response.code)
    .bind(response.survey_id.to_string())
    .bind(actor_text(response.respondent_id))
    .bind(serde_json::to_string(&response.answers)?)
    .bind(response.submitted_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| Error::from_insert(e, "code", &response.code))?;

    Ok(())
}

pub async fn list_responses(
    conn: &mut SqliteConnection,
    survey_id: Uuid,
) -> Result<Vec<SurveyResponse>> {
    let rows = sqlx::query(
        "SELECT id, code, survey_id, respondent_id, answers, submitted_at \
         FROM survey_responses WHERE survey_id = ? ORDER BY submitted_at",
    )
    .bind(survey_id.to_string())
    .fetch_all(&mut *conn)
    .await?;
    rows.iter().map(parse_response).collect()
}

pub async fn response_count(conn: &mut SqliteConnection, survey_id: Uuid) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM survey_responses WHERE survey_id = ?")
        .bind(survey_id.to_string())
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

fn parse_response(row: &SqliteRow) -> Result<SurveyResponse> {
    Ok(SurveyResponse {
        id: uuid_col(row, "id")?,
        code: row.try_get("code")?,
        survey_id: uuid_col(row, "survey_id")?,
        respondent_id: actor_col(row, "respondent_id")?,
        answers: json_col(row, "answers")?,
        submitted_at: row.try_get("submitted_at")?,
    })
}
