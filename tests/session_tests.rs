// tests/session_tests.rs

use std::collections::BTreeMap;

use examprep::config::TEST_DURATION_SECS;
use examprep::models::question::{Difficulty, Question, QuestionPattern, QuestionType};
use examprep::models::session::{SessionStatus, SessionStore, TestSession};

fn mcq(id: i64, correct: &str) -> Question {
    Question {
        id,
        exam_type: "GATE".to_string(),
        subject: "Electronics and Communication Engineering".to_string(),
        topic: "Signals".to_string(),
        question_text: format!("Question {}", id),
        question_type: QuestionType::Mcq,
        question_pattern: QuestionPattern::Theoretical,
        difficulty: Difficulty::Medium,
        options: Some(sqlx::types::Json(vec![
            "A) 1".to_string(),
            "B) 2".to_string(),
            "C) 3".to_string(),
            "D) 4".to_string(),
        ])),
        correct_answer: correct.to_string(),
        explanation: Some("Explanation not available".to_string()),
        usage_count: 0,
        created_at: None,
    }
}

fn start_session(user_id: i64, questions: Vec<Question>) -> TestSession {
    TestSession::new(
        user_id,
        "GATE".to_string(),
        "Electronics and Communication Engineering".to_string(),
        Some("Signals".to_string()),
        Some("all".to_string()),
        questions,
    )
}

#[test]
fn full_attempt_scores_and_freezes() {
    let mut session = start_session(1, vec![mcq(1, "A) 1"), mcq(2, "B) 2"), mcq(3, "C) 3")]);
    assert_eq!(session.status, SessionStatus::InProgress);
    assert_eq!(session.time_remaining, TEST_DURATION_SECS);

    session.answer(1, "A) 1".to_string());
    session.answer(2, "D) 4".to_string());
    session.answer(2, "B) 2".to_string()); // changed their mind
    session.toggle_review(3);

    session.submit();
    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.score, Some(2));

    // Nothing moves after completion, whatever fires.
    session.answer(3, "C) 3".to_string());
    session.tick();
    session.submit();
    assert_eq!(session.score, Some(2));
    assert_eq!(session.answers.len(), 2);
}

#[test]
fn countdown_expiry_submits_exactly_once() {
    let mut session = start_session(1, vec![mcq(1, "A) 1")]);
    session.answer(1, "A) 1".to_string());
    session.time_remaining = 3;

    for _ in 0..10 {
        session.tick();
    }

    assert_eq!(session.time_remaining, 0);
    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.score, Some(1));
}

#[tokio::test]
async fn store_serves_not_started_view_without_a_session() {
    let store = SessionStore::default();
    let view = store.view(42).await;
    assert_eq!(view.status, SessionStatus::NotStarted);
    assert!(view.questions.is_empty());
}

#[tokio::test]
async fn restart_replaces_the_previous_attempt() {
    let store = SessionStore::default();
    let mut first = start_session(7, vec![mcq(1, "A) 1")]);
    first.answer(1, "A) 1".to_string());
    store.insert(first).await;

    let second = start_session(7, vec![mcq(2, "B) 2"), mcq(3, "C) 3")]);
    store.insert(second).await;

    let view = store.view(7).await;
    assert_eq!(view.status, SessionStatus::InProgress);
    assert_eq!(view.total_questions, 2);
    assert!(view.answers.is_empty());
    assert_eq!(view.time_remaining, TEST_DURATION_SECS);
}

#[tokio::test]
async fn discard_removes_the_session() {
    let store = SessionStore::default();
    store.insert(start_session(9, vec![mcq(1, "A) 1")])).await;

    store.remove(9).await;
    let view = store.view(9).await;
    assert_eq!(view.status, SessionStatus::NotStarted);
}

#[tokio::test]
async fn completed_view_reveals_answers_and_explanations() {
    let store = SessionStore::default();
    store.insert(start_session(5, vec![mcq(1, "B) 2")])).await;

    store
        .with_session(5, |s| {
            s.answer(1, "B) 2".to_string());
        })
        .await
        .unwrap();

    let in_progress = store.view(5).await;
    assert!(in_progress.questions[0].correct_answer.is_none());
    assert!(in_progress.questions[0].explanation.is_none());

    let completed = store
        .with_session(5, |s| {
            s.submit();
            s.score
        })
        .await
        .unwrap();
    assert_eq!(completed, Some(1));

    let view = store.view(5).await;
    assert_eq!(view.questions[0].correct_answer.as_deref(), Some("B) 2"));
    assert!(view.questions[0].explanation.is_some());
    assert_eq!(view.score, Some(1));
}

#[test]
fn view_serializes_wire_status_names() {
    let session = start_session(1, vec![mcq(1, "A) 1")]);
    let view = examprep::models::session::SessionView::of(&session);
    let value = serde_json::to_value(&view).unwrap();
    assert_eq!(value["status"], "IN_PROGRESS");
    assert_eq!(value["questions"][0]["question_type"], "MCQ");
    assert_eq!(value["questions"][0]["difficulty"], "MEDIUM");
}

// The ingest transform is also part of the public surface; make sure the
// canonical example survives end to end.
#[test]
fn bulk_transform_matches_persisted_shape() {
    let mut options = BTreeMap::new();
    for (letter, text) in [("A", "3"), ("B", "4"), ("C", "5"), ("D", "6")] {
        options.insert(letter.to_string(), serde_json::Value::String(text.to_string()));
    }

    let payload = examprep::ingest::BulkUploadPayload {
        exam_name: Some("GATE".to_string()),
        subject: Some("Mathematics".to_string()),
        questions: Some(vec![examprep::ingest::RawQuestion {
            question: Some("2+2?".to_string()),
            options: Some(options),
            correct_answer: Some(serde_json::Value::String("B".to_string())),
            explanation: None,
            kind: None,
            subject: None,
            question_number: None,
        }]),
    };

    let transformed = examprep::ingest::validate_and_transform(&payload).unwrap();
    assert_eq!(transformed[0].options.as_deref().unwrap(), [
        "A) 3", "B) 4", "C) 5", "D) 6"
    ]);
    assert_eq!(transformed[0].correct_answer, "B) 4");
}
