// src/models/attempt.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};

use crate::models::test::TestWithQuestions;

/// Represents the 'attempts' table in the database: one completed exam
/// submission and its score. Immutable once inserted; there is no update
/// or delete path in normal operation.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Attempt {
    pub id: i64,
    pub test_id: i64,
    pub user_id: i64,
    /// Percentage score in [0, 100].
    pub score: i64,
    pub total_questions: i64,
    pub correct_answers: i64,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

/// Represents the 'attempt_answers' table: the selected option ids and
/// per-question correctness for one graded question. Written in the same
/// transaction as the parent attempt row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AttemptAnswer {
    pub id: i64,
    pub attempt_id: i64,
    pub question_id: i64,
    pub selected_option_ids: Json<Vec<i64>>,
    pub is_correct: bool,
}

/// An attempt together with its graded answer map, as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptDetail {
    #[serde(flatten)]
    pub record: Attempt,
    /// Selected option ids per question, as graded.
    pub answers: HashMap<i64, Vec<i64>>,
}

/// DTO for submitting a finished exam session for grading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitExamRequest {
    pub test_id: i64,

    /// User's answers map.
    /// Key: Question ID
    /// Value: Selected option ids (one entry for single-choice questions).
    pub answers: HashMap<i64, Vec<i64>>,

    /// When the session actually began, as tracked by the session
    /// controller. Falls back to the completion instant when absent.
    #[serde(default)]
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO returned from grading and from attempt lookup: the persisted
/// attempt, the test with its questions for review rendering, and the
/// answer key per question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitExamResponse {
    pub attempt: AttemptDetail,
    pub test: TestWithQuestions,
    pub correct_answer_map: HashMap<i64, Vec<i64>>,
}
