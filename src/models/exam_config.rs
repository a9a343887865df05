// src/models/exam_config.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

/// A subject offered under an exam.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectEntry {
    pub id: String,
    pub name: String,
}

/// Represents the 'exam_configs' table: which exams exist and what
/// subjects/filters the selection screen offers for each.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ExamConfig {
    pub id: i64,
    pub exam_type: String,
    pub subjects: Json<Vec<SubjectEntry>>,
    pub question_types: Json<Vec<String>>,
    pub question_patterns: Json<Vec<String>>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for creating an exam configuration.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateExamConfigRequest {
    #[validate(length(min = 1, max = 100))]
    pub exam_type: String,
    #[validate(length(min = 1, message = "At least one subject is required."))]
    pub subjects: Vec<SubjectEntry>,
    pub question_types: Option<Vec<String>>,
    pub question_patterns: Option<Vec<String>>,
}

/// DTO for updating an exam configuration. Fields are optional.
#[derive(Debug, Deserialize)]
pub struct UpdateExamConfigRequest {
    pub exam_type: Option<String>,
    pub subjects: Option<Vec<SubjectEntry>>,
    pub question_types: Option<Vec<String>>,
    pub question_patterns: Option<Vec<String>>,
}
