// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

use crate::error::AppError;

/// Answer format of a question: multiple choice or free numeric entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "question_type", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum QuestionType {
    Mcq,
    Numerical,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Mcq => "MCQ",
            QuestionType::Numerical => "NUMERICAL",
        }
    }
}

/// Content style of a question, distinct from its answer format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "question_pattern", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum QuestionPattern {
    Theoretical,
    Numerical,
}

impl QuestionPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionPattern::Theoretical => "THEORETICAL",
            QuestionPattern::Numerical => "NUMERICAL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "difficulty", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// Represents the 'master_questions' table in the database.
///
/// MCQ rows carry exactly four labeled options ("A) ..." through "D) ...")
/// and `correct_answer` is one of them verbatim. NUMERICAL rows carry no
/// options and `correct_answer` holds the numeric value as text.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    pub exam_type: String,
    pub subject: String,

    /// Topic classification. May be empty.
    pub topic: String,

    pub question_text: String,
    pub question_type: QuestionType,
    pub question_pattern: QuestionPattern,
    pub difficulty: Difficulty,

    /// Stored as a JSON array in the database; NULL for numerical questions.
    pub options: Option<Json<Vec<String>>>,

    pub correct_answer: String,
    pub explanation: Option<String>,

    /// How many times the question has been served. Informational only.
    pub usage_count: i64,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for creating a single question from the admin panel.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 100))]
    pub exam_type: String,
    #[validate(length(min = 1, max = 100))]
    pub subject: String,
    #[validate(length(max = 200))]
    pub topic: Option<String>,
    #[validate(length(min = 1, max = 2000))]
    pub question_text: String,
    pub question_type: QuestionType,
    pub question_pattern: QuestionPattern,
    pub difficulty: Difficulty,
    pub options: Option<Vec<String>>,
    #[validate(length(min = 1, max = 500))]
    pub correct_answer: String,
    #[validate(length(max = 2000))]
    pub explanation: Option<String>,
}

/// DTO for updating a question. Fields are optional.
#[derive(Debug, Deserialize)]
pub struct UpdateQuestionRequest {
    pub topic: Option<String>,
    pub question_text: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub correct_answer: Option<String>,
    pub explanation: Option<String>,
}

/// Query parameters for the admin question listing.
#[derive(Debug, Deserialize)]
pub struct QuestionListParams {
    pub exam_type: Option<String>,
    pub subject: Option<String>,
    pub difficulty: Option<Difficulty>,
    /// Matches question text or subject, case-insensitive.
    pub search: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// Checks the MCQ/NUMERICAL shape invariant for a question about to be stored.
pub fn check_question_shape(
    question_type: QuestionType,
    options: &Option<Vec<String>>,
    correct_answer: &str,
) -> Result<(), AppError> {
    match question_type {
        QuestionType::Mcq => {
            let opts = options.as_ref().ok_or_else(|| {
                AppError::BadRequest("MCQ questions require 4 options".to_string())
            })?;
            if opts.len() != 4 {
                return Err(AppError::BadRequest(format!(
                    "MCQ questions require exactly 4 options, got {}",
                    opts.len()
                )));
            }
            for (opt, letter) in opts.iter().zip(["A", "B", "C", "D"]) {
                if !opt.starts_with(&format!("{}) ", letter)) {
                    return Err(AppError::BadRequest(format!(
                        "Option '{}' must be labeled '{}) ...'",
                        opt, letter
                    )));
                }
            }
            if !opts.iter().any(|o| o == correct_answer) {
                return Err(AppError::BadRequest(
                    "Correct answer must match one of the options exactly".to_string(),
                ));
            }
        }
        QuestionType::Numerical => {
            if options.as_ref().is_some_and(|o| !o.is_empty()) {
                return Err(AppError::BadRequest(
                    "Numerical questions must not carry options".to_string(),
                ));
            }
        }
    }
    Ok(())
}
