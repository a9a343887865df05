// src/handlers/exams.rs

use axum::{Json, extract::State, response::IntoResponse};
use sqlx::PgPool;

use crate::{error::AppError, models::exam_config::ExamConfig};

/// Lists the configured exams and their subjects for the selection screen.
pub async fn list_exam_configs(
    State(pool): State<PgPool>,
) -> Result<impl IntoResponse, AppError> {
    let configs = sqlx::query_as::<_, ExamConfig>(
        r#"
        SELECT id, exam_type, subjects, question_types, question_patterns,
               created_at, updated_at
        FROM exam_configs
        ORDER BY created_at ASC
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch exam configs: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(configs))
}
