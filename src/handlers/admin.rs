// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::{PgPool, Postgres, QueryBuilder, types::Json as SqlJson};
use validator::Validate;

use crate::{
    error::AppError,
    ingest::{self, BulkUploadPayload},
    models::{
        exam_config::{CreateExamConfigRequest, UpdateExamConfigRequest},
        profile::{GrantTokensRequest, SetAccountTypeRequest},
        question::{
            CreateQuestionRequest, Question, QuestionListParams, UpdateQuestionRequest,
            check_question_shape,
        },
        user::UserWithProfile,
    },
    utils::jwt::Claims,
};

/// Lists all users with their token balance and account tier.
/// Admin only.
pub async fn list_users(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let users = sqlx::query_as::<_, UserWithProfile>(
        r#"
        SELECT u.id, u.username, u.role, p.tokens, p.account_type, u.created_at
        FROM users u
        JOIN profiles p ON p.user_id = u.id
        ORDER BY u.id DESC
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list users: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(users))
}

/// Grants extra tokens to a user.
/// Admin only.
pub async fn grant_tokens(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<GrantTokensRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.amount <= 0 {
        return Err(AppError::BadRequest(
            "Token amount must be positive".to_string(),
        ));
    }

    let tokens = sqlx::query_scalar::<_, i64>(
        "UPDATE profiles SET tokens = tokens + $2, updated_at = now()
         WHERE user_id = $1
         RETURNING tokens",
    )
    .bind(id)
    .bind(payload.amount)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to grant tokens: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(Json(json!({ "tokens": tokens })))
}

/// Switches a user between the free and premium tiers.
/// Admin only.
pub async fn set_account_type(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<SetAccountTypeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query(
        "UPDATE profiles SET account_type = $2, updated_at = now() WHERE user_id = $1",
    )
    .bind(id)
    .bind(payload.account_type)
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to update account type: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    Ok(StatusCode::OK)
}

/// Deletes a user by ID.
/// Admin only. Prevents deleting self.
pub async fn delete_user(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    // Prevent self-deletion
    if id == claims.user_id() {
        return Err(AppError::BadRequest("Cannot delete yourself".to_string()));
    }

    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete user: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Pushes the shared WHERE clauses of the question listing onto a builder.
fn push_question_filters(builder: &mut QueryBuilder<'_, Postgres>, params: &QuestionListParams) {
    builder.push(" WHERE 1=1");
    if let Some(exam_type) = &params.exam_type {
        builder.push(" AND exam_type = ").push_bind(exam_type.clone());
    }
    if let Some(subject) = &params.subject {
        builder.push(" AND subject = ").push_bind(subject.clone());
    }
    if let Some(difficulty) = params.difficulty {
        builder.push(" AND difficulty = ").push_bind(difficulty);
    }
    if let Some(search) = &params.search {
        let pattern = format!("%{}%", search);
        builder
            .push(" AND (question_text ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR subject ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// Lists bank questions with filters, search and pagination.
/// Admin only.
pub async fn list_questions(
    State(pool): State<PgPool>,
    Query(params): Query<QuestionListParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = params.page.unwrap_or(1).max(1);
    let page_size = params.page_size.unwrap_or(20).clamp(1, 100);

    let mut count_builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM master_questions");
    push_question_filters(&mut count_builder, &params);
    let total: i64 = count_builder
        .build_query_scalar()
        .fetch_one(&pool)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    let mut builder = QueryBuilder::<Postgres>::new(
        "SELECT id, exam_type, subject, topic, question_text, question_type, \
         question_pattern, difficulty, options, correct_answer, explanation, \
         usage_count, created_at FROM master_questions",
    );
    push_question_filters(&mut builder, &params);
    builder
        .push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(page_size as i64)
        .push(" OFFSET ")
        .push_bind(((page - 1) * page_size) as i64);

    let questions: Vec<Question> = builder
        .build_query_as()
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list questions: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(json!({
        "questions": questions,
        "total": total,
        "page": page,
        "page_size": page_size,
        "total_pages": (total as u64).div_ceil(page_size as u64),
    })))
}

/// Creates a single bank question.
/// Admin only.
pub async fn create_question(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    check_question_shape(
        payload.question_type,
        &payload.options,
        &payload.correct_answer,
    )?;

    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO master_questions
        (exam_type, subject, topic, question_text, question_type,
         question_pattern, difficulty, options, correct_answer, explanation)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING id
        "#,
    )
    .bind(&payload.exam_type)
    .bind(&payload.subject)
    .bind(payload.topic.as_deref().unwrap_or_default())
    .bind(&payload.question_text)
    .bind(payload.question_type)
    .bind(payload.question_pattern)
    .bind(payload.difficulty)
    .bind(payload.options.clone().map(SqlJson))
    .bind(&payload.correct_answer)
    .bind(&payload.explanation)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create question: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(json!({"id": id}))))
}

/// Updates a question by ID. The MCQ shape invariant is re-checked against
/// the merged row before anything is written.
/// Admin only.
pub async fn update_question(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.topic.is_none()
        && payload.question_text.is_none()
        && payload.difficulty.is_none()
        && payload.correct_answer.is_none()
        && payload.explanation.is_none()
    {
        return Ok(StatusCode::OK);
    }

    let existing = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, exam_type, subject, topic, question_text, question_type,
               question_pattern, difficulty, options, correct_answer,
               explanation, usage_count, created_at
        FROM master_questions
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Question not found".to_string()))?;

    if let Some(correct_answer) = &payload.correct_answer {
        let options = existing.options.as_ref().map(|o| o.0.clone());
        check_question_shape(existing.question_type, &options, correct_answer)?;
    }

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE master_questions SET ");
    let mut separated = builder.separated(", ");

    if let Some(topic) = payload.topic {
        separated.push("topic = ");
        separated.push_bind_unseparated(topic);
    }

    if let Some(question_text) = payload.question_text {
        separated.push("question_text = ");
        separated.push_bind_unseparated(question_text);
    }

    if let Some(difficulty) = payload.difficulty {
        separated.push("difficulty = ");
        separated.push_bind_unseparated(difficulty);
    }

    if let Some(correct_answer) = payload.correct_answer {
        separated.push("correct_answer = ");
        separated.push_bind_unseparated(correct_answer);
    }

    if let Some(explanation) = payload.explanation {
        separated.push("explanation = ");
        separated.push_bind_unseparated(explanation);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update question: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(StatusCode::OK)
}

/// Deletes a bank question by ID.
/// Admin only.
pub async fn delete_question(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM master_questions WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete question: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Bulk-ingests a JSON question document into the bank.
/// Admin only.
pub async fn bulk_upload(
    State(pool): State<PgPool>,
    Json(payload): Json<BulkUploadPayload>,
) -> Result<impl IntoResponse, AppError> {
    let inserted = ingest::ingest(&pool, &payload).await?;
    Ok((StatusCode::CREATED, Json(json!({ "inserted": inserted }))))
}

/// Creates an exam configuration.
/// Admin only.
pub async fn create_exam_config(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateExamConfigRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let question_types = payload
        .question_types
        .unwrap_or_else(|| vec!["MCQ".to_string(), "NUMERICAL".to_string()]);
    let question_patterns = payload
        .question_patterns
        .unwrap_or_else(|| vec!["THEORETICAL".to_string(), "NUMERICAL".to_string()]);

    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO exam_configs (exam_type, subjects, question_types, question_patterns)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(&payload.exam_type)
    .bind(SqlJson(payload.subjects))
    .bind(SqlJson(question_types))
    .bind(SqlJson(question_patterns))
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if e.to_string().contains("unique constraint") || e.to_string().contains("23505") {
            AppError::Conflict(format!("Exam '{}' already exists", payload.exam_type))
        } else {
            tracing::error!("Failed to create exam config: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    Ok((StatusCode::CREATED, Json(json!({"id": id}))))
}

/// Updates an exam configuration by ID. Fields are optional.
/// Admin only.
pub async fn update_exam_config(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateExamConfigRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.exam_type.is_none()
        && payload.subjects.is_none()
        && payload.question_types.is_none()
        && payload.question_patterns.is_none()
    {
        return Ok(StatusCode::OK);
    }

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE exam_configs SET ");
    let mut separated = builder.separated(", ");

    if let Some(exam_type) = payload.exam_type {
        separated.push("exam_type = ");
        separated.push_bind_unseparated(exam_type);
    }

    if let Some(subjects) = payload.subjects {
        separated.push("subjects = ");
        separated.push_bind_unseparated(SqlJson(subjects));
    }

    if let Some(question_types) = payload.question_types {
        separated.push("question_types = ");
        separated.push_bind_unseparated(SqlJson(question_types));
    }

    if let Some(question_patterns) = payload.question_patterns {
        separated.push("question_patterns = ");
        separated.push_bind_unseparated(SqlJson(question_patterns));
    }

    separated.push("updated_at = now()");

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    let result = builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update exam config: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Exam config not found".to_string()));
    }

    Ok(StatusCode::OK)
}

/// Deletes an exam configuration by ID.
/// Admin only.
pub async fn delete_exam_config(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM exam_configs WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete exam config: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Exam config not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
