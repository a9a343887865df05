// src/ingest.rs

use std::collections::BTreeMap;

use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder, types::Json};

use crate::{
    config::INSERT_BATCH_SIZE,
    error::AppError,
    models::question::{Difficulty, QuestionPattern, QuestionType},
};

const OPTION_LETTERS: [&str; 4] = ["A", "B", "C", "D"];

/// Bulk upload document: `{ exam_name, subject, questions: [...] }`.
/// Fields are optional at the serde level so shape problems surface as
/// one clear `MalformedInput` instead of a deserializer message.
#[derive(Debug, Deserialize)]
pub struct BulkUploadPayload {
    pub exam_name: Option<String>,
    pub subject: Option<String>,
    pub questions: Option<Vec<RawQuestion>>,
}

/// One question as it appears in the upload document.
#[derive(Debug, Deserialize)]
pub struct RawQuestion {
    pub question: Option<String>,
    /// Present with keys A-D for MCQ entries; absent for numerical ones.
    pub options: Option<BTreeMap<String, serde_json::Value>>,
    /// A letter for MCQ entries; a number or string for numerical ones.
    pub correct_answer: Option<serde_json::Value>,
    pub explanation: Option<String>,
    /// "Theoretical" marks theory questions; anything else is numerical.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub subject: Option<String>,
    pub question_number: Option<i64>,
}

/// A validated question in its persisted shape, ready for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewQuestion {
    pub exam_type: String,
    pub subject: String,
    pub topic: String,
    pub question_text: String,
    pub question_type: QuestionType,
    pub question_pattern: QuestionPattern,
    pub difficulty: Difficulty,
    pub options: Option<Vec<String>>,
    pub correct_answer: String,
    pub explanation: String,
}

fn value_to_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn checked_payload(
    payload: &BulkUploadPayload,
) -> Result<(&str, &str, &[RawQuestion]), AppError> {
    match (&payload.exam_name, &payload.subject, &payload.questions) {
        (Some(exam), Some(subject), Some(questions)) => Ok((exam, subject, questions)),
        _ => Err(AppError::MalformedInput(
            "Invalid JSON format. Required fields: exam_name, subject, and questions array"
                .to_string(),
        )),
    }
}

fn record_label(record: &RawQuestion, index: usize) -> i64 {
    record.question_number.unwrap_or(index as i64 + 1)
}

/// Validates one raw record and rewrites it into the canonical shape.
fn transform_record(
    record: &RawQuestion,
    index: usize,
    exam_name: &str,
    default_subject: &str,
) -> Result<NewQuestion, AppError> {
    let number = record_label(record, index);

    let question_text = record
        .question
        .as_deref()
        .filter(|q| !q.is_empty())
        .ok_or_else(|| {
            AppError::MalformedInput(format!("Question text is required for question {}", number))
        })?;

    let correct_answer = record.correct_answer.as_ref().ok_or_else(|| {
        AppError::MalformedInput(format!("Correct answer is required for question {}", number))
    })?;

    // MCQ entries are recognized by an options object with exactly 4 keys.
    let mcq_options = record.options.as_ref().filter(|opts| opts.len() == 4);

    let (question_type, options, correct_answer) = match mcq_options {
        Some(opts) => {
            let missing: Vec<&str> = OPTION_LETTERS
                .iter()
                .filter(|letter| {
                    opts.get(**letter)
                        .map(value_to_text)
                        .unwrap_or_default()
                        .is_empty()
                })
                .copied()
                .collect();
            if !missing.is_empty() {
                return Err(AppError::MalformedInput(format!(
                    "Missing options {} for MCQ question {}",
                    missing.join(", "),
                    number
                )));
            }

            let answer_letter = value_to_text(correct_answer);
            if !OPTION_LETTERS.contains(&answer_letter.as_str()) {
                return Err(AppError::MalformedInput(format!(
                    "Invalid correct answer '{}' for MCQ question {}. Must be one of: A, B, C, D",
                    answer_letter, number
                )));
            }

            let option_text = |letter: &str| {
                opts.get(letter).map(value_to_text).unwrap_or_default()
            };
            let labeled: Vec<String> = OPTION_LETTERS
                .iter()
                .map(|letter| format!("{}) {}", letter, option_text(letter)))
                .collect();
            let labeled_answer = format!("{}) {}", answer_letter, option_text(&answer_letter));

            (QuestionType::Mcq, Some(labeled), labeled_answer)
        }
        None => (QuestionType::Numerical, None, value_to_text(correct_answer)),
    };

    let question_pattern = match record.kind.as_deref() {
        Some("Theoretical") => QuestionPattern::Theoretical,
        _ => QuestionPattern::Numerical,
    };

    let subject = record.subject.as_deref().unwrap_or(default_subject);

    Ok(NewQuestion {
        exam_type: exam_name.to_string(),
        subject: subject.to_string(),
        // Bulk uploads carry no topic field; the subject stands in.
        topic: subject.to_string(),
        question_text: question_text.to_string(),
        question_type,
        question_pattern,
        // Bulk ingestion does not accept a difficulty hint.
        difficulty: Difficulty::Medium,
        options,
        correct_answer,
        explanation: record.explanation.clone().unwrap_or_default(),
    })
}

/// Validates the whole payload and returns the transformed records.
pub fn validate_and_transform(payload: &BulkUploadPayload) -> Result<Vec<NewQuestion>, AppError> {
    let (exam_name, subject, questions) = checked_payload(payload)?;
    questions
        .iter()
        .enumerate()
        .map(|(index, record)| transform_record(record, index, exam_name, subject))
        .collect()
}

/// Looks up which of the uploaded question texts already exist in the bank.
/// Returned entries are labeled with the record's question number.
async fn find_duplicates(
    pool: &PgPool,
    questions: &[RawQuestion],
) -> Result<Vec<String>, AppError> {
    let texts: Vec<&str> = questions
        .iter()
        .filter_map(|q| q.question.as_deref())
        .filter(|t| !t.is_empty())
        .collect();
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder = QueryBuilder::<Postgres>::new(
        "SELECT question_text FROM master_questions WHERE question_text IN (",
    );
    let mut separated = builder.separated(",");
    for text in &texts {
        separated.push_bind(*text);
    }
    separated.push_unseparated(")");

    let existing: Vec<String> = builder
        .build_query_scalar()
        .fetch_all(pool)
        .await
        .map_err(|e| {
            tracing::error!("Duplicate check failed: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    let duplicates = questions
        .iter()
        .enumerate()
        .filter(|(_, q)| {
            q.question
                .as_deref()
                .is_some_and(|t| existing.iter().any(|e| e == t))
        })
        .map(|(index, q)| {
            format!(
                "Question {}: {}",
                record_label(q, index),
                q.question.as_deref().unwrap_or_default()
            )
        })
        .collect();

    Ok(duplicates)
}

/// Ingests a bulk upload: shape check, whole-batch duplicate probe,
/// per-record transform, then batched inserts inside one transaction.
/// Returns the number of inserted questions.
///
/// The duplicate probe runs before anything is written, so a payload with
/// any known question aborts with zero rows inserted. Insert failures roll
/// the whole transaction back.
pub async fn ingest(pool: &PgPool, payload: &BulkUploadPayload) -> Result<usize, AppError> {
    let (_, _, questions) = checked_payload(payload)?;

    let duplicates = find_duplicates(pool, questions).await?;
    if !duplicates.is_empty() {
        return Err(AppError::DuplicateQuestions(duplicates));
    }

    let transformed = validate_and_transform(payload)?;
    if transformed.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    let mut committed = 0usize;

    for batch in transformed.chunks(INSERT_BATCH_SIZE) {
        let mut builder = QueryBuilder::<Postgres>::new(
            "INSERT INTO master_questions \
             (exam_type, subject, topic, question_text, question_type, \
              question_pattern, difficulty, options, correct_answer, explanation) ",
        );
        builder.push_values(batch, |mut b, q| {
            b.push_bind(&q.exam_type)
                .push_bind(&q.subject)
                .push_bind(&q.topic)
                .push_bind(&q.question_text)
                .push_bind(q.question_type)
                .push_bind(q.question_pattern)
                .push_bind(q.difficulty)
                .push_bind(q.options.clone().map(Json))
                .push_bind(&q.correct_answer)
                .push_bind(&q.explanation);
        });

        if let Err(e) = builder.build().execute(&mut *tx).await {
            tracing::error!("Insert batch {} failed: {:?}", committed + 1, e);
            // The transaction rolls back on drop; nothing stays committed.
            return Err(AppError::Insertion {
                committed: 0,
                message: e.to_string(),
            });
        }
        committed += 1;
    }

    tx.commit().await.map_err(|e| AppError::Insertion {
        committed: 0,
        message: e.to_string(),
    })?;

    tracing::info!(
        "Ingested {} questions in {} batches",
        transformed.len(),
        committed
    );
    Ok(transformed.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload_with(questions: serde_json::Value) -> BulkUploadPayload {
        serde_json::from_value(json!({
            "exam_name": "GATE",
            "subject": "Electronics",
            "questions": questions,
        }))
        .unwrap()
    }

    #[test]
    fn rejects_missing_top_level_fields() {
        let payload: BulkUploadPayload =
            serde_json::from_value(json!({"subject": "Electronics"})).unwrap();
        let err = validate_and_transform(&payload).unwrap_err();
        assert!(matches!(err, AppError::MalformedInput(_)));
    }

    #[test]
    fn transforms_mcq_into_labeled_options() {
        let payload = payload_with(json!([{
            "question": "2+2?",
            "options": {"A": "3", "B": "4", "C": "5", "D": "6"},
            "correct_answer": "B",
        }]));

        let transformed = validate_and_transform(&payload).unwrap();
        assert_eq!(transformed.len(), 1);
        let q = &transformed[0];
        assert_eq!(q.question_type, QuestionType::Mcq);
        assert_eq!(
            q.options.as_deref().unwrap(),
            ["A) 3", "B) 4", "C) 5", "D) 6"]
        );
        assert_eq!(q.correct_answer, "B) 4");
        assert_eq!(q.difficulty, Difficulty::Medium);
        assert_eq!(q.question_pattern, QuestionPattern::Numerical);
    }

    #[test]
    fn reports_missing_option_letters() {
        let payload = payload_with(json!([{
            "question": "2+2?",
            "options": {"A": "3", "B": "4", "C": "", "E": "6"},
            "correct_answer": "B",
        }]));

        match validate_and_transform(&payload).unwrap_err() {
            AppError::MalformedInput(msg) => {
                assert_eq!(msg, "Missing options C, D for MCQ question 1");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn rejects_correct_answer_outside_letters() {
        let payload = payload_with(json!([{
            "question": "2+2?",
            "options": {"A": "3", "B": "4", "C": "5", "D": "6"},
            "correct_answer": "4",
        }]));

        match validate_and_transform(&payload).unwrap_err() {
            AppError::MalformedInput(msg) => {
                assert!(msg.contains("Invalid correct answer '4' for MCQ question 1"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn numerical_records_stringify_answers_and_drop_options() {
        let payload = payload_with(json!([
            {"question": "Resistance?", "correct_answer": 42},
            {"question": "Voltage?", "correct_answer": "3.3", "type": "Theoretical"},
        ]));

        let transformed = validate_and_transform(&payload).unwrap();
        assert_eq!(transformed[0].question_type, QuestionType::Numerical);
        assert_eq!(transformed[0].options, None);
        assert_eq!(transformed[0].correct_answer, "42");
        assert_eq!(transformed[0].question_pattern, QuestionPattern::Numerical);
        assert_eq!(transformed[1].correct_answer, "3.3");
        assert_eq!(transformed[1].question_pattern, QuestionPattern::Theoretical);
    }

    #[test]
    fn fewer_than_four_options_means_numerical() {
        // An options object that is not exactly 4 entries does not make
        // the record an MCQ; the raw answer passes through untouched.
        let payload = payload_with(json!([{
            "question": "Pick one",
            "options": {"A": "yes", "B": "no"},
            "correct_answer": "A",
        }]));

        let transformed = validate_and_transform(&payload).unwrap();
        assert_eq!(transformed[0].question_type, QuestionType::Numerical);
        assert_eq!(transformed[0].correct_answer, "A");
    }

    #[test]
    fn subject_and_topic_default_from_payload() {
        let payload = payload_with(json!([
            {"question": "Q1", "correct_answer": "1"},
            {"question": "Q2", "correct_answer": "2", "subject": "Networks"},
        ]));

        let transformed = validate_and_transform(&payload).unwrap();
        assert_eq!(transformed[0].subject, "Electronics");
        assert_eq!(transformed[0].topic, "Electronics");
        assert_eq!(transformed[1].subject, "Networks");
        assert_eq!(transformed[1].topic, "Networks");
    }

    #[test]
    fn missing_question_text_is_rejected_with_its_number() {
        let payload = payload_with(json!([
            {"question": "Q1", "correct_answer": "1"},
            {"correct_answer": "2", "question_number": 17},
        ]));

        match validate_and_transform(&payload).unwrap_err() {
            AppError::MalformedInput(msg) => {
                assert_eq!(msg, "Question text is required for question 17");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn batch_arithmetic_splits_on_fifty() {
        let questions: Vec<serde_json::Value> = (0..120)
            .map(|i| json!({"question": format!("Q{}", i), "correct_answer": i}))
            .collect();
        let payload = payload_with(serde_json::Value::Array(questions));

        let transformed = validate_and_transform(&payload).unwrap();
        assert_eq!(transformed.len(), 120);
        assert_eq!(transformed.chunks(INSERT_BATCH_SIZE).count(), 3);
    }
}
