// src/handlers/test_session.rs

use std::time::Duration;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        profile::AccountType,
        question::Question,
        session::{
            AnswerRequest, ReviewRequest, SessionStore, SessionView, StartTestRequest, TestSession,
        },
    },
    selector::{self, SelectionCriteria, SelectionMode},
    state::AppState,
    utils::jwt::Claims,
};

#[derive(sqlx::FromRow)]
struct TokenBalance {
    tokens: i64,
    account_type: AccountType,
}

/// Starts (or restarts) a timed test for the current user.
///
/// The token balance is checked before any questions are fetched, and for
/// free accounts one token is deducted only after generation succeeds, so
/// a failed attempt never costs anything. A new attempt replaces whatever
/// session the user had before.
pub async fn start_test(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
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

    let user_id = claims.user_id();

    let balance = sqlx::query_as::<_, TokenBalance>(
        "SELECT tokens, account_type FROM profiles WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::NotFound("Profile not found".to_string()))?;

    // Token gate precedes generation: an empty balance never reaches the
    // selector.
    if balance.account_type == AccountType::Free && balance.tokens <= 0 {
        return Err(AppError::UpgradeRequired(
            "You are out of tokens. Upgrade to premium to keep generating tests.".to_string(),
        ));
    }

    let criteria = SelectionCriteria {
        exam_type: exam_type.clone(),
        subject: subject.clone(),
        mode: SelectionMode::Test,
        question_type: req.question_type,
        question_pattern: req.question_pattern.clone(),
        specific_topic: req.specific_topic.clone(),
    };

    let questions = selector::select_questions(&state.pool, &criteria).await?;

    // Deduct only after successful generation, and only while a token is
    // still there; a concurrent spend surfaces as TokenUpdate and no
    // session is created.
    if balance.account_type == AccountType::Free {
        let result = sqlx::query(
            "UPDATE profiles SET tokens = tokens - 1, updated_at = now()
             WHERE user_id = $1 AND tokens > 0",
        )
        .bind(user_id)
        .execute(&state.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update tokens: {:?}", e);
            AppError::TokenUpdate("Failed to update tokens".to_string())
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::TokenUpdate("Failed to update tokens".to_string()));
        }
    }

    let session = TestSession::new(
        user_id,
        exam_type,
        subject,
        req.specific_topic,
        req.question_pattern,
        questions,
    );
    let view = SessionView::of(&session);
    let session_id = session.id;

    state.sessions.insert(session).await;
    spawn_countdown(state.sessions.clone(), user_id, session_id);

    Ok(Json(view))
}

/// Drives the session clock at one tick per second until the attempt
/// completes or is replaced. Submission on timeout happens inside the
/// session itself.
fn spawn_countdown(sessions: SessionStore, user_id: i64, session_id: Uuid) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        // The first tick of a tokio interval completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            if !sessions.tick(user_id, session_id).await {
                break;
            }
        }
        tracing::debug!("Countdown finished for user {}", user_id);
    });
}

/// Returns the current session state, or a NOT_STARTED view if none exists.
pub async fn current_session(
    State(sessions): State<SessionStore>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(sessions.view(claims.user_id()).await))
}

/// Discards the current session without touching the token balance.
pub async fn discard_session(
    State(sessions): State<SessionStore>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    sessions.remove(claims.user_id()).await;
    Ok(StatusCode::NO_CONTENT)
}

/// Records an answer. Ignored once the session has completed.
pub async fn record_answer(
    State(sessions): State<SessionStore>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    sessions
        .with_session(claims.user_id(), |s| s.answer(req.question_id, req.answer))
        .await
        .ok_or(AppError::NotFound("No active test session".to_string()))?;
    Ok(StatusCode::OK)
}

/// Flags or unflags a question for review. Ignored once completed.
pub async fn toggle_review(
    State(sessions): State<SessionStore>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    sessions
        .with_session(claims.user_id(), |s| s.toggle_review(req.question_id))
        .await
        .ok_or(AppError::NotFound("No active test session".to_string()))?;
    Ok(StatusCode::OK)
}

/// Submits the test. Safe to call twice: the countdown may fire the same
/// transition and only the first one scores.
pub async fn submit_test(
    State(sessions): State<SessionStore>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let view = sessions
        .with_session(claims.user_id(), |s| {
            s.submit();
            SessionView::of(s)
        })
        .await
        .ok_or(AppError::NotFound("No active test session".to_string()))?;
    Ok(Json(view))
}

/// Bookmarks a bank question into the user's saved list as a denormalized
/// copy. Saving the same question again is absorbed by the uniqueness key
/// and reported as `saved: false`.
pub async fn save_question(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(question_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let question = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, exam_type, subject, topic, question_text, question_type,
               question_pattern, difficulty, options, correct_answer,
               explanation, usage_count, created_at
        FROM master_questions
        WHERE id = $1
        "#,
    )
    .bind(question_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Question not found".to_string()))?;

    let result = sqlx::query(
        r#"
        INSERT INTO saved_questions
        (user_id, question_id, exam_type, subject, question_text,
         question_type, options, correct_answer, explanation, difficulty)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (user_id, question_id) DO NOTHING
        "#,
    )
    .bind(claims.user_id())
    .bind(question.id)
    .bind(&question.exam_type)
    .bind(&question.subject)
    .bind(&question.question_text)
    .bind(question.question_type)
    .bind(&question.options)
    .bind(&question.correct_answer)
    .bind(&question.explanation)
    .bind(question.difficulty)
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to save question: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(json!({ "saved": result.rows_affected() > 0 })))
}

fn invalid_selection() -> AppError {
    AppError::InvalidSelection("Please select an exam and subject to continue.".to_string())
}
