// src/handlers/goals.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use validator::Validate;

use crate::{
    analytics,
    error::AppError,
    models::goal::{
        CreateGoalRequest, Goal, GoalExamScore, GoalPriority, GoalResponse, GoalStatus,
        UpdateGoalStatusRequest, decode_exam_ids,
    },
    utils::jwt::Claims,
};

/// Best recorded score per target exam, projected from the caller's
/// attempt history. Exams never attempted simply have no row.
async fn best_scores(
    pool: &SqlitePool,
    user_id: i64,
    exam_ids: &[i64],
) -> Result<Vec<GoalExamScore>, AppError> {
    if exam_ids.is_empty() {
        return Ok(Vec::new());
    }

    // Dynamic IN clause over the goal's target exams.
    let mut query_builder = QueryBuilder::<Sqlite>::new(
        "SELECT test_id, MAX(score) AS best_score FROM attempts WHERE user_id = ",
    );
    query_builder.push_bind(user_id);
    query_builder.push(" AND test_id IN (");
    let mut separated = query_builder.separated(",");
    for id in exam_ids {
        separated.push_bind(id);
    }
    separated.push_unseparated(") GROUP BY test_id");

    let scores: Vec<GoalExamScore> = query_builder.build_query_as().fetch_all(pool).await?;
    Ok(scores)
}

/// Builds the response for one goal, computing progress and award tier
/// fresh from attempt history. Neither is ever stored.
async fn goal_response(pool: &SqlitePool, goal: Goal) -> Result<GoalResponse, AppError> {
    let exam_ids = decode_exam_ids(&goal.exam_ids)?;
    let scores = best_scores(pool, goal.user_id, &exam_ids).await?;
    let score_values: Vec<i64> = scores.iter().map(|s| s.best_score).collect();

    let progress = analytics::goal_progress(goal.passing_score, exam_ids.len(), &score_values);
    let award_tier = analytics::award_tier(progress.average_score);

    Ok(GoalResponse {
        id: goal.id,
        title: goal.title,
        target_type: goal.target_type,
        exam_ids,
        passing_score: goal.passing_score,
        start_date: goal.start_date,
        end_date: goal.end_date,
        status: goal.status,
        priority: goal.priority,
        progress,
        award_tier,
        created_at: goal.created_at,
    })
}

async fn fetch_goal(pool: &SqlitePool, id: i64) -> Result<Goal, AppError> {
    sqlx::query_as::<_, Goal>(
        "SELECT id, user_id, title, target_type, exam_ids, passing_score,
                start_date, end_date, status, priority, created_at
         FROM goals WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Goal not found".to_string()))
}

/// Creates a goal. Goals start out 'active'; later status transitions come
/// from the status endpoint, never from this crate's own logic.
pub async fn create_goal(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateGoalRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    req.validate()?;

    if req.end_date < req.start_date {
        return Err(AppError::BadRequest(
            "end_date must not precede start_date".to_string(),
        ));
    }

    let exam_ids = serde_json::to_string(&req.exam_ids)?;
    let priority = req.priority.unwrap_or(GoalPriority::Medium);

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO goals (user_id, title, target_type, exam_ids, passing_score,
                            start_date, end_date, status, priority)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(user_id)
    .bind(&req.title)
    .bind(req.target_type)
    .bind(&exam_ids)
    .bind(req.passing_score)
    .bind(req.start_date)
    .bind(req.end_date)
    .bind(GoalStatus::Active)
    .bind(priority)
    .fetch_one(&pool)
    .await?;

    let goal = fetch_goal(&pool, id).await?;
    Ok((StatusCode::CREATED, Json(goal_response(&pool, goal).await?)))
}

/// Lists the caller's goals, newest first, each with fresh progress.
pub async fn list_goals(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let goals = sqlx::query_as::<_, Goal>(
        "SELECT id, user_id, title, target_type, exam_ids, passing_score,
                start_date, end_date, status, priority, created_at
         FROM goals WHERE user_id = ? ORDER BY created_at DESC, id DESC",
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await?;

    let mut responses = Vec::with_capacity(goals.len());
    for goal in goals {
        responses.push(goal_response(&pool, goal).await?);
    }

    Ok(Json(responses))
}

/// Retrieves a single goal. Callers can only read their own goals.
pub async fn get_goal(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let goal = fetch_goal(&pool, id).await?;
    if goal.user_id != user_id {
        return Err(AppError::AuthError("You do not own this goal".to_string()));
    }

    Ok(Json(goal_response(&pool, goal).await?))
}

/// External status setter: the caller (or a scheduler acting for them)
/// moves the goal through its lifecycle.
pub async fn update_goal_status(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateGoalStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let goal = fetch_goal(&pool, id).await?;
    if goal.user_id != user_id {
        return Err(AppError::AuthError("You do not own this goal".to_string()));
    }

    sqlx::query("UPDATE goals SET status = ? WHERE id = ?")
        .bind(req.status)
        .bind(id)
        .execute(&pool)
        .await?;

    let goal = fetch_goal(&pool, id).await?;
    Ok(Json(goal_response(&pool, goal).await?))
}
