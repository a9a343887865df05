// src/models/saved_question.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};

use crate::models::question::{Difficulty, QuestionType};

/// Represents the 'saved_questions' table: a denormalized copy of a bank
/// question bookmarked by a user. (user_id, question_id) is unique so
/// repeated saves of the same question collapse into one row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SavedQuestion {
    pub id: i64,
    pub user_id: i64,
    pub question_id: i64,
    pub exam_type: String,
    pub subject: String,
    pub question_text: String,
    pub question_type: QuestionType,
    pub options: Option<Json<Vec<String>>>,
    pub correct_answer: String,
    pub explanation: Option<String>,
    pub difficulty: Difficulty,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}
