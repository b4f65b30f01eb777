// src/handlers/stats.rs

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use sqlx::prelude::FromRow;

use crate::{analytics, error::AppError, utils::jwt::Claims};

/// Query parameters carrying the caller's UTC offset ("+HH:MM" / "-HH:MM"),
/// used to bucket attempts into the caller's calendar days. Defaults to UTC.
#[derive(Debug, Deserialize)]
pub struct TzParams {
    pub tz: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub tests_completed: i64,
    pub average_score: i64,
    /// Accumulated exam time, "<H>h <M>m" or "<M>m" under an hour.
    pub total_time: String,
    pub streak: i64,
    pub longest_streak: i64,
}

#[derive(Debug, FromRow)]
struct AttemptRow {
    score: i64,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
}

async fn fetch_attempts(pool: &SqlitePool, user_id: i64) -> Result<Vec<AttemptRow>, AppError> {
    let rows = sqlx::query_as::<_, AttemptRow>(
        "SELECT score, started_at, completed_at FROM attempts WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Aggregated dashboard figures for the caller: completed attempt count,
/// mean score, accumulated exam time and the current daily streak.
pub async fn dashboard(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<TzParams>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let offset = analytics::parse_utc_offset(params.tz.as_deref().unwrap_or("+00:00"))?;

    let attempts = fetch_attempts(&pool, user_id).await?;

    let tests_completed = attempts.len() as i64;
    let average_score = if attempts.is_empty() {
        0
    } else {
        (attempts.iter().map(|a| a.score).sum::<i64>() as f64 / attempts.len() as f64).round()
            as i64
    };

    let total_seconds: i64 = attempts
        .iter()
        .map(|a| (a.completed_at - a.started_at).num_seconds().max(0))
        .sum();

    let active_dates: Vec<NaiveDate> = attempts
        .iter()
        .map(|a| a.completed_at.with_timezone(&offset).date_naive())
        .collect();
    let today = Utc::now().with_timezone(&offset).date_naive();
    let streaks = analytics::streaks(&active_dates, today);

    Ok(Json(DashboardStats {
        tests_completed,
        average_score,
        total_time: analytics::format_total_time(total_seconds),
        streak: streaks.current,
        longest_streak: streaks.longest,
    }))
}

/// Daily completed-attempt counts for the trailing 365 days ending today
/// in the caller's timezone, zero-count days included.
pub async fn heatmap(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<TzParams>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let offset = analytics::parse_utc_offset(params.tz.as_deref().unwrap_or("+00:00"))?;

    let attempts = fetch_attempts(&pool, user_id).await?;

    let mut daily_counts: HashMap<NaiveDate, i64> = HashMap::new();
    for attempt in &attempts {
        let date = attempt.completed_at.with_timezone(&offset).date_naive();
        *daily_counts.entry(date).or_insert(0) += 1;
    }

    let today = Utc::now().with_timezone(&offset).date_naive();
    Ok(Json(analytics::heatmap(&daily_counts, today)))
}
