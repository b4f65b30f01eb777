// src/models/goal.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

use crate::error::AppError;

/// What a goal targets: a whole category's exams, or a hand-picked exam list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum TargetType {
    Category,
    Exams,
}

/// Goal lifecycle status. Transitions are set by the caller through the
/// status endpoint; nothing in this crate derives them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum GoalStatus {
    Draft,
    Active,
    Completed,
    Overdue,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum GoalPriority {
    Low,
    Medium,
    High,
}

/// Badge derived from a goal's average best-exam score. Always recomputed
/// from attempt history on read, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AwardTier {
    Bronze,
    Silver,
    Gold,
    Diamond,
    Perfect,
}

/// Represents the 'goals' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Goal {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub target_type: TargetType,

    /// Target exam ids, stored as a JSON integer array.
    /// Decode only through [`decode_exam_ids`].
    pub exam_ids: String,

    /// Minimum score for an exam to count towards the goal.
    pub passing_score: i64,

    pub start_date: chrono::NaiveDate,
    pub end_date: chrono::NaiveDate,
    pub status: GoalStatus,
    pub priority: GoalPriority,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// The single decoder for the stored exam-id list. The column holds a JSON
/// integer array and nothing else; anything that fails to parse as one is
/// corrupt data, not a format to be guessed at.
pub fn decode_exam_ids(raw: &str) -> Result<Vec<i64>, AppError> {
    serde_json::from_str::<Vec<i64>>(raw).map_err(|e| {
        AppError::InternalServerError(format!(
            "stored exam id list is not a JSON integer array: {e}"
        ))
    })
}

/// Best recorded score for one of a goal's target exams, projected from
/// the caller's attempt history at read time.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GoalExamScore {
    pub test_id: i64,
    pub best_score: i64,
}

/// Fresh progress figures for one goal, derived from `GoalExamScore` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalProgress {
    /// Exams whose best score reached the passing score.
    pub completed: i64,
    pub total: i64,
    pub percentage: i64,
    /// Rounded mean of best scores over exams with at least one attempt.
    pub average_score: i64,
}

/// DTO for a goal as returned to the client, with progress and award tier
/// computed on every read.
#[derive(Debug, Clone, Serialize)]
pub struct GoalResponse {
    pub id: i64,
    pub title: String,
    pub target_type: TargetType,
    pub exam_ids: Vec<i64>,
    pub passing_score: i64,
    pub start_date: chrono::NaiveDate,
    pub end_date: chrono::NaiveDate,
    pub status: GoalStatus,
    pub priority: GoalPriority,
    pub progress: GoalProgress,
    pub award_tier: AwardTier,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for creating a new goal. Goals start out 'active'.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateGoalRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub target_type: TargetType,
    #[validate(custom(function = validate_exam_ids))]
    pub exam_ids: Vec<i64>,
    #[validate(range(min = 0, max = 100))]
    pub passing_score: i64,
    pub start_date: chrono::NaiveDate,
    pub end_date: chrono::NaiveDate,
    pub priority: Option<GoalPriority>,
}

fn validate_exam_ids(exam_ids: &[i64]) -> Result<(), validator::ValidationError> {
    if exam_ids.is_empty() {
        return Err(validator::ValidationError::new("exam_ids_cannot_be_empty"));
    }
    Ok(())
}

/// DTO for the external status setter.
#[derive(Debug, Deserialize)]
pub struct UpdateGoalStatusRequest {
    pub status: GoalStatus,
}
