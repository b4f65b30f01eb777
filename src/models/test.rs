// src/models/test.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

use crate::models::question::ReviewQuestion;

/// Represents the 'tests' table in the database. Test and question content
/// is managed by an external CRUD service; this crate only reads it.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Test {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    /// Countdown length for one attempt at this test.
    pub duration_seconds: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO embedding the test's questions (options without correctness flags),
/// returned from grading and attempt-review endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestWithQuestions {
    pub id: i64,
    pub title: String,
    pub duration_seconds: i64,
    pub questions: Vec<ReviewQuestion>,
}
