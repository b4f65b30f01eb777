// src/handlers/attempts.rs

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::types::Json as SqlJson;

use crate::{
    error::AppError,
    grading::{self, AnswerKey},
    models::{
        attempt::{Attempt, AttemptAnswer, AttemptDetail, SubmitExamRequest, SubmitExamResponse},
        question::{AnswerOption, Question, ReviewQuestion},
        test::{Test, TestWithQuestions},
    },
    utils::jwt::Claims,
};

/// Loads a test with its ordered questions and their options.
/// Unknown `test_id` is NotFound.
async fn load_test(
    pool: &SqlitePool,
    test_id: i64,
) -> Result<(Test, Vec<Question>, Vec<AnswerOption>), AppError> {
    let test = sqlx::query_as::<_, Test>(
        "SELECT id, title, description, duration_seconds, created_at FROM tests WHERE id = ?",
    )
    .bind(test_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Test not found".to_string()))?;

    let questions = sqlx::query_as::<_, Question>(
        "SELECT id, test_id, type, content, explanation, position
         FROM questions WHERE test_id = ? ORDER BY position, id",
    )
    .bind(test_id)
    .fetch_all(pool)
    .await?;

    let options = sqlx::query_as::<_, AnswerOption>(
        "SELECT o.id, o.question_id, o.content, o.is_correct
         FROM answer_options o
         JOIN questions q ON o.question_id = q.id
         WHERE q.test_id = ? ORDER BY o.question_id, o.id",
    )
    .bind(test_id)
    .fetch_all(pool)
    .await?;

    Ok((test, questions, options))
}

fn answer_keys(questions: &[Question], options: &[AnswerOption]) -> Vec<AnswerKey> {
    questions
        .iter()
        .map(|q| AnswerKey {
            question_id: q.id,
            correct: options
                .iter()
                .filter(|o| o.question_id == q.id && o.is_correct)
                .map(|o| o.id)
                .collect(),
        })
        .collect()
}

fn correct_answer_map(questions: &[Question], options: &[AnswerOption]) -> HashMap<i64, Vec<i64>> {
    questions
        .iter()
        .map(|q| {
            (
                q.id,
                options
                    .iter()
                    .filter(|o| o.question_id == q.id && o.is_correct)
                    .map(|o| o.id)
                    .collect(),
            )
        })
        .collect()
}

fn test_with_questions(test: &Test, questions: Vec<Question>, options: &[AnswerOption]) -> TestWithQuestions {
    let questions = questions
        .into_iter()
        .map(|q| {
            let opts = options
                .iter()
                .filter(|o| o.question_id == q.id)
                .cloned()
                .collect();
            ReviewQuestion::from_parts(q, opts)
        })
        .collect();

    TestWithQuestions {
        id: test.id,
        title: test.title.clone(),
        duration_seconds: test.duration_seconds,
        questions,
    }
}

/// Grades a submission and persists the attempt. The attempt row and its
/// per-question answer rows are written in one transaction, so readers
/// never observe a partially written attempt.
///
/// This is the only write path for attempts. There is no deduplication of
/// retried submissions yet: a client retry after a network timeout creates
/// a second attempt.
pub async fn grade_and_store(
    pool: &SqlitePool,
    user_id: i64,
    req: &SubmitExamRequest,
) -> Result<SubmitExamResponse, AppError> {
    if req.answers.is_empty() {
        return Err(AppError::BadRequest("No answers submitted".to_string()));
    }

    let (test, questions, options) = load_test(pool, req.test_id).await?;

    let keys = answer_keys(&questions, &options);
    let outcome = grading::grade(&keys, &req.answers);

    let completed_at = Utc::now();
    let started_at = req.started_at.unwrap_or(completed_at);

    let mut tx = pool.begin().await?;

    let attempt_id: i64 = sqlx::query_scalar(
        "INSERT INTO attempts (test_id, user_id, score, total_questions, correct_answers, started_at, completed_at)
         VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(test.id)
    .bind(user_id)
    .bind(outcome.score)
    .bind(outcome.total_questions)
    .bind(outcome.correct_answers)
    .bind(started_at)
    .bind(completed_at)
    .fetch_one(&mut *tx)
    .await?;

    for graded in &outcome.questions {
        sqlx::query(
            "INSERT INTO attempt_answers (attempt_id, question_id, selected_option_ids, is_correct)
             VALUES (?, ?, ?, ?)",
        )
        .bind(attempt_id)
        .bind(graded.question_id)
        .bind(SqlJson(&graded.selected))
        .bind(graded.is_correct)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await.map_err(|e| {
        tracing::error!("Failed to commit attempt: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let attempt = AttemptDetail {
        record: Attempt {
            id: attempt_id,
            test_id: test.id,
            user_id,
            score: outcome.score,
            total_questions: outcome.total_questions,
            correct_answers: outcome.correct_answers,
            started_at,
            completed_at,
        },
        answers: outcome
            .questions
            .iter()
            .map(|g| (g.question_id, g.selected.clone()))
            .collect(),
    };

    Ok(SubmitExamResponse {
        correct_answer_map: correct_answer_map(&questions, &options),
        test: test_with_questions(&test, questions, &options),
        attempt,
    })
}

/// Submits a finished exam session for grading.
///
/// * Validates the token and extracts the user id.
/// * Rejects empty submissions outright rather than scoring them as zero.
/// * Persists exactly one attempt and returns it with the answer key for
///   review rendering.
pub async fn submit_attempt(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SubmitExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let response = grade_and_store(&pool, user_id, &req).await?;
    Ok(Json(response))
}

/// Retrieves a graded attempt for review. Callers can only read their own
/// attempts.
pub async fn get_attempt(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let attempt = sqlx::query_as::<_, Attempt>(
        "SELECT id, test_id, user_id, score, total_questions, correct_answers, started_at, completed_at
         FROM attempts WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Attempt not found".to_string()))?;

    if attempt.user_id != user_id {
        return Err(AppError::AuthError(
            "You do not own this attempt".to_string(),
        ));
    }

    let answer_rows = sqlx::query_as::<_, AttemptAnswer>(
        "SELECT id, attempt_id, question_id, selected_option_ids, is_correct
         FROM attempt_answers WHERE attempt_id = ?",
    )
    .bind(attempt.id)
    .fetch_all(&pool)
    .await?;

    let (test, questions, options) = load_test(&pool, attempt.test_id).await?;

    Ok(Json(SubmitExamResponse {
        correct_answer_map: correct_answer_map(&questions, &options),
        test: test_with_questions(&test, questions, &options),
        attempt: AttemptDetail {
            record: attempt,
            answers: answer_rows
                .into_iter()
                .map(|r| (r.question_id, r.selected_option_ids.0))
                .collect(),
        },
    }))
}
