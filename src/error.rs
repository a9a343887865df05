// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    AuthError(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict (e.g., duplicate username)
    Conflict(String),

    // 400 - test requested without exam/subject selected
    InvalidSelection(String),

    // 422 - fewer than the minimum qualifying questions exist
    InsufficientQuestions(String),

    // 402 - free account with no tokens left
    UpgradeRequired(String),

    // 409 - token decrement failed after generation; session aborted
    TokenUpdate(String),

    // 400 - bulk upload payload fails shape or per-question validation
    MalformedInput(String),

    // 409 - bulk upload contains questions already in the bank
    DuplicateQuestions(Vec<String>),

    // 500 - bulk insert failed; `committed` batches were durable before the failure
    Insertion { committed: usize, message: String },
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"error": "Internal Server Error"}),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({"error": msg})),
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, json!({"error": msg})),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({"error": msg})),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, json!({"error": msg})),
            AppError::InvalidSelection(msg) => (StatusCode::BAD_REQUEST, json!({"error": msg})),
            AppError::InsufficientQuestions(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, json!({"error": msg}))
            }
            AppError::UpgradeRequired(msg) => (StatusCode::PAYMENT_REQUIRED, json!({"error": msg})),
            AppError::TokenUpdate(msg) => (StatusCode::CONFLICT, json!({"error": msg})),
            AppError::MalformedInput(msg) => (StatusCode::BAD_REQUEST, json!({"error": msg})),
            AppError::DuplicateQuestions(duplicates) => (
                StatusCode::CONFLICT,
                json!({
                    "error": "Duplicate questions found",
                    "duplicates": duplicates,
                }),
            ),
            AppError::Insertion { committed, message } => {
                tracing::error!("Batch insertion failed: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "error": "Failed to insert questions",
                        "committed_batches": committed,
                    }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Converts `sqlx::Error` into `AppError::InternalServerError`.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(err.to_string())
    }
}
