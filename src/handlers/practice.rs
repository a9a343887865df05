// src/handlers/practice.rs

use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::session::StartTestRequest,
    selector::{self, SelectionCriteria, SelectionMode},
};

/// Generates an untimed practice set.
///
/// Practice draws from all difficulties, costs no tokens and holds no
/// session: questions are returned with their answers and explanations
/// so the client can give feedback immediately.
pub async fn start_practice(
    State(pool): State<PgPool>,
    Json(req): Json<StartTestRequest>,
) -> Result<impl IntoResponse, AppError> {
    let exam_type = req
        .exam_type
        .filter(|e| !e.is_empty())
        .ok_or_else(invalid_selection)?;
    let subject = req
        .subject
        .filter(|s| !s.is_empty())
        .ok_or_else(invalid_selection)?;

    let criteria = SelectionCriteria {
        exam_type,
        subject,
        mode: SelectionMode::Practice,
        question_type: req.question_type,
        question_pattern: req.question_pattern,
        specific_topic: req.specific_topic,
    };

    let questions = selector::select_questions(&pool, &criteria).await?;

    Ok(Json(json!({
        "total": questions.len(),
        "questions": questions,
    })))
}

fn invalid_selection() -> AppError {
    AppError::InvalidSelection("Please select an exam and subject to continue.".to_string())
}
