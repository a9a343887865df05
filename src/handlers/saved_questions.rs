// src/handlers/saved_questions.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;

use crate::{error::AppError, models::saved_question::SavedQuestion, utils::jwt::Claims};

/// Lists the current user's saved questions, newest first.
pub async fn list_saved(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let saved = sqlx::query_as::<_, SavedQuestion>(
        r#"
        SELECT id, user_id, question_id, exam_type, subject, question_text,
               question_type, options, correct_answer, explanation,
               difficulty, created_at
        FROM saved_questions
        WHERE user_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(claims.user_id())
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list saved questions: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(saved))
}

/// Removes one saved question belonging to the current user.
pub async fn delete_saved(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM saved_questions WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(claims.user_id())
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete saved question: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Saved question not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
