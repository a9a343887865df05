// src/models/session.rs

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::TEST_DURATION_SECS;
use crate::models::question::{Difficulty, Question, QuestionPattern, QuestionType};

/// Lifecycle of a test attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    NotStarted,
    InProgress,
    Completed,
}

/// One timed test attempt, held in memory from start to review.
///
/// The question list is a fixed snapshot taken when the session starts.
/// The session transitions to COMPLETED exactly once, via an explicit
/// submit or the countdown reaching zero, and the score is frozen at
/// that moment.
#[derive(Debug, Clone)]
pub struct TestSession {
    /// Distinguishes this attempt from any replacement, so a countdown
    /// task left over from an earlier attempt can never touch a new one.
    pub id: Uuid,
    pub user_id: i64,

    pub exam_type: String,
    pub subject: String,
    pub specific_topic: Option<String>,
    pub question_pattern: Option<String>,

    pub questions: Vec<Question>,
    /// Entries exist only for answered questions.
    pub answers: HashMap<i64, String>,
    pub marked_for_review: HashSet<i64>,

    pub time_remaining: u32,
    pub status: SessionStatus,
    pub score: Option<i64>,
}

impl TestSession {
    pub fn new(
        user_id: i64,
        exam_type: String,
        subject: String,
        specific_topic: Option<String>,
        question_pattern: Option<String>,
        questions: Vec<Question>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            exam_type,
            subject,
            specific_topic,
            question_pattern,
            questions,
            answers: HashMap::new(),
            marked_for_review: HashSet::new(),
            time_remaining: TEST_DURATION_SECS,
            status: SessionStatus::InProgress,
            score: None,
        }
    }

    fn contains_question(&self, question_id: i64) -> bool {
        self.questions.iter().any(|q| q.id == question_id)
    }

    /// Records or replaces an answer. Ignored unless the session is in
    /// progress and the question belongs to this attempt's snapshot.
    pub fn answer(&mut self, question_id: i64, value: String) {
        if self.status != SessionStatus::InProgress {
            return;
        }
        if !self.contains_question(question_id) {
            return;
        }
        self.answers.insert(question_id, value);
    }

    /// Flags or unflags a question for later review. In-progress only.
    pub fn toggle_review(&mut self, question_id: i64) {
        if self.status != SessionStatus::InProgress {
            return;
        }
        if !self.contains_question(question_id) {
            return;
        }
        if !self.marked_for_review.remove(&question_id) {
            self.marked_for_review.insert(question_id);
        }
    }

    /// Advances the countdown by one second. Hitting zero submits the
    /// attempt; the clock never goes below zero.
    pub fn tick(&mut self) {
        if self.status != SessionStatus::InProgress {
            return;
        }
        if self.time_remaining > 0 {
            self.time_remaining -= 1;
        }
        if self.time_remaining == 0 {
            self.submit();
        }
    }

    /// Scores the attempt and completes it. Idempotent: the countdown and
    /// a manual submit may race, only the first transition takes effect.
    pub fn submit(&mut self) {
        if self.status == SessionStatus::Completed {
            return;
        }
        let score = self
            .questions
            .iter()
            .filter(|q| {
                self.answers
                    .get(&q.id)
                    .is_some_and(|a| *a == q.correct_answer)
            })
            .count() as i64;
        self.score = Some(score);
        self.status = SessionStatus::Completed;
    }
}

/// A question as served to the client. Correct answer and explanation
/// stay hidden until the attempt is completed.
#[derive(Debug, Serialize)]
pub struct SessionQuestion {
    pub id: i64,
    pub question_text: String,
    pub question_type: QuestionType,
    pub question_pattern: QuestionPattern,
    pub difficulty: Difficulty,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// Snapshot of a session as returned by the API.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub status: SessionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exam_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specific_topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_pattern: Option<String>,
    pub time_remaining: u32,
    pub questions: Vec<SessionQuestion>,
    pub answers: HashMap<i64, String>,
    pub marked_for_review: Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
    pub total_questions: usize,
}

impl SessionView {
    /// The view served when the user has no session yet.
    pub fn not_started() -> Self {
        Self {
            status: SessionStatus::NotStarted,
            exam_type: None,
            subject: None,
            specific_topic: None,
            question_pattern: None,
            time_remaining: 0,
            questions: Vec::new(),
            answers: HashMap::new(),
            marked_for_review: Vec::new(),
            score: None,
            total_questions: 0,
        }
    }

    pub fn of(session: &TestSession) -> Self {
        let completed = session.status == SessionStatus::Completed;
        let questions = session
            .questions
            .iter()
            .map(|q| SessionQuestion {
                id: q.id,
                question_text: q.question_text.clone(),
                question_type: q.question_type,
                question_pattern: q.question_pattern,
                difficulty: q.difficulty,
                options: q.options.as_ref().map(|o| o.0.clone()),
                correct_answer: completed.then(|| q.correct_answer.clone()),
                explanation: completed.then(|| q.explanation.clone()).flatten(),
            })
            .collect();

        Self {
            status: session.status,
            exam_type: Some(session.exam_type.clone()),
            subject: Some(session.subject.clone()),
            specific_topic: session.specific_topic.clone(),
            question_pattern: session.question_pattern.clone(),
            time_remaining: session.time_remaining,
            questions,
            answers: session.answers.clone(),
            marked_for_review: session.marked_for_review.iter().copied().collect(),
            score: session.score,
            total_questions: session.questions.len(),
        }
    }
}

/// In-memory registry of active sessions, one per user.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<i64, TestSession>>>,
}

impl SessionStore {
    /// Stores a fresh session, replacing any previous attempt by the user.
    pub async fn insert(&self, session: TestSession) {
        self.inner.write().await.insert(session.user_id, session);
    }

    pub async fn remove(&self, user_id: i64) -> Option<TestSession> {
        self.inner.write().await.remove(&user_id)
    }

    pub async fn view(&self, user_id: i64) -> SessionView {
        match self.inner.read().await.get(&user_id) {
            Some(session) => SessionView::of(session),
            None => SessionView::not_started(),
        }
    }

    /// Runs `f` against the user's session, if one exists.
    pub async fn with_session<T>(
        &self,
        user_id: i64,
        f: impl FnOnce(&mut TestSession) -> T,
    ) -> Option<T> {
        self.inner.write().await.get_mut(&user_id).map(f)
    }

    /// Advances the countdown for the identified attempt by one second.
    /// Returns false once the countdown task should stop: the session is
    /// gone, was replaced by a newer attempt, or is no longer in progress.
    pub async fn tick(&self, user_id: i64, session_id: Uuid) -> bool {
        let mut sessions = self.inner.write().await;
        match sessions.get_mut(&user_id) {
            Some(session) if session.id == session_id => {
                session.tick();
                session.status == SessionStatus::InProgress
            }
            _ => false,
        }
    }
}

/// Session-start input. Exam and subject are required; the rest narrows
/// the question pool.
#[derive(Debug, Deserialize)]
pub struct StartTestRequest {
    pub exam_type: Option<String>,
    pub subject: Option<String>,
    pub specific_topic: Option<String>,
    pub question_type: Option<String>,
    pub question_pattern: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub question_id: i64,
    pub answer: String,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub question_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mcq(id: i64, correct: &str) -> Question {
        Question {
            id,
            exam_type: "GATE".to_string(),
            subject: "Electronics".to_string(),
            topic: String::new(),
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
            explanation: None,
            usage_count: 0,
            created_at: None,
        }
    }

    fn session_with(questions: Vec<Question>) -> TestSession {
        TestSession::new(
            1,
            "GATE".to_string(),
            "Electronics".to_string(),
            None,
            None,
            questions,
        )
    }

    #[test]
    fn score_counts_exact_matches_only() {
        let mut session = session_with(vec![mcq(1, "A) 1"), mcq(2, "B) 2"), mcq(3, "C) 3")]);
        session.answer(1, "A) 1".to_string());
        session.answer(2, "C) 3".to_string()); // wrong
        // question 3 left unanswered
        session.submit();

        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.score, Some(1));
    }

    #[test]
    fn submit_is_idempotent() {
        let mut session = session_with(vec![mcq(1, "A) 1"), mcq(2, "B) 2")]);
        session.answer(1, "A) 1".to_string());
        session.submit();

        let first_score = session.score;

        // A racing countdown may fire after a manual submit.
        session.answer(2, "B) 2".to_string());
        session.submit();
        session.tick();

        assert_eq!(session.score, first_score);
        assert_eq!(session.answers.len(), 1);
        assert_eq!(session.status, SessionStatus::Completed);
    }

    #[test]
    fn tick_floors_at_zero_and_submits_once() {
        let mut session = session_with(vec![mcq(1, "A) 1")]);
        session.time_remaining = 2;

        session.tick();
        assert_eq!(session.time_remaining, 1);
        assert_eq!(session.status, SessionStatus::InProgress);

        session.tick();
        assert_eq!(session.time_remaining, 0);
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.score, Some(0));

        session.tick();
        assert_eq!(session.time_remaining, 0);
        assert_eq!(session.status, SessionStatus::Completed);
    }

    #[test]
    fn mutations_after_completion_are_ignored() {
        let mut session = session_with(vec![mcq(1, "A) 1")]);
        session.toggle_review(1);
        session.submit();

        session.answer(1, "A) 1".to_string());
        session.toggle_review(1);

        assert!(session.answers.is_empty());
        assert!(session.marked_for_review.contains(&1));
        assert_eq!(session.score, Some(0));
    }

    #[test]
    fn answers_outside_snapshot_are_ignored() {
        let mut session = session_with(vec![mcq(1, "A) 1")]);
        session.answer(99, "A) 1".to_string());
        assert!(session.answers.is_empty());
    }

    #[test]
    fn toggle_review_flips_membership() {
        let mut session = session_with(vec![mcq(1, "A) 1")]);
        session.toggle_review(1);
        assert!(session.marked_for_review.contains(&1));
        session.toggle_review(1);
        assert!(!session.marked_for_review.contains(&1));
    }

    #[test]
    fn view_hides_answers_until_completed() {
        let mut session = session_with(vec![mcq(1, "A) 1")]);

        let in_progress = SessionView::of(&session);
        assert!(in_progress.questions[0].correct_answer.is_none());

        session.submit();
        let completed = SessionView::of(&session);
        assert_eq!(
            completed.questions[0].correct_answer.as_deref(),
            Some("A) 1")
        );
    }

    #[tokio::test]
    async fn store_tick_ignores_replaced_sessions() {
        let store = SessionStore::default();
        let first = session_with(vec![mcq(1, "A) 1")]);
        let stale_id = first.id;
        store.insert(first).await;

        let replacement = session_with(vec![mcq(2, "B) 2")]);
        let fresh_id = replacement.id;
        store.insert(replacement).await;

        assert!(!store.tick(1, stale_id).await);
        assert!(store.tick(1, fresh_id).await);

        let view = store.view(1).await;
        assert_eq!(view.time_remaining, TEST_DURATION_SECS - 1);
    }
}
