// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

/// Question kind. Single-choice questions hold exactly one selection;
/// multiple-choice questions hold a set of selections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum QuestionType {
    Single,
    Multiple,
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    pub test_id: i64,

    /// Mapped from the database column 'type' since `type` is a reserved keyword in Rust.
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub question_type: QuestionType,

    /// The text content of the question.
    pub content: String,

    /// Explanation shown alongside the correct answers during review.
    pub explanation: Option<String>,

    /// Display order within the test.
    pub position: i64,
}

/// Represents the 'answer_options' table in the database.
/// The set of option ids with `is_correct = true` for a question is its
/// answer key; grading compares submissions against it by exact set equality.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: i64,
    pub question_id: i64,
    pub content: String,
    pub is_correct: bool,
}

/// DTO for an option as sent to the client (correctness flag stripped;
/// the correct-answer map in the grading response carries correctness).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicOption {
    pub id: i64,
    pub content: String,
}

impl From<AnswerOption> for PublicOption {
    fn from(o: AnswerOption) -> Self {
        Self {
            id: o.id,
            content: o.content,
        }
    }
}

/// DTO for a question with its options as sent to the client, both while
/// taking an exam and when reviewing a graded attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewQuestion {
    pub id: i64,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub content: String,
    pub explanation: Option<String>,
    pub options: Vec<PublicOption>,
}

impl ReviewQuestion {
    pub fn from_parts(question: Question, options: Vec<AnswerOption>) -> Self {
        Self {
            id: question.id,
            question_type: question.question_type,
            content: question.content,
            explanation: question.explanation,
            options: options.into_iter().map(PublicOption::from).collect(),
        }
    }
}
