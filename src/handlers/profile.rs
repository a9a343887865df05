// src/handlers/profile.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::profile::{MeResponse, UpdateProfileRequest},
    utils::jwt::Claims,
};

/// Get current user's account, profile and token balance.
pub async fn get_profile(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let me = sqlx::query_as::<_, MeResponse>(
        r#"
        SELECT u.id, u.username, u.role,
               p.full_name, p.phone, p.education, p.target_exam,
               p.tokens, p.account_type
        FROM users u
        JOIN profiles p ON p.user_id = u.id
        WHERE u.id = $1
        "#,
    )
    .bind(claims.user_id())
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Profile not found".to_string()))?;

    Ok(Json(me))
}

/// Updates the editable profile fields of the current user.
pub async fn update_profile(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let result = sqlx::query(
        r#"
        UPDATE profiles
        SET full_name = COALESCE($2, full_name),
            phone = COALESCE($3, phone),
            education = COALESCE($4, education),
            target_exam = COALESCE($5, target_exam),
            updated_at = now()
        WHERE user_id = $1
        "#,
    )
    .bind(claims.user_id())
    .bind(&payload.full_name)
    .bind(&payload.phone)
    .bind(&payload.education)
    .bind(&payload.target_exam)
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to update profile: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Profile not found".to_string()));
    }

    Ok(StatusCode::OK)
}
