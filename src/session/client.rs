// src/session/client.rs

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::error::AppError;
use crate::handlers::attempts::grade_and_store;
use crate::models::attempt::{SubmitExamRequest, SubmitExamResponse};

/// Errors surfaced to the session controller by a grading backend.
#[derive(Debug, thiserror::Error)]
pub enum GradingClientError {
    /// The request never reached the grader (network failure, timeout).
    /// A retry after this can produce a duplicate attempt server-side;
    /// there is no idempotency key yet to deduplicate it.
    #[error("grading request failed to complete: {0}")]
    Transport(String),

    /// The grader rejected the submission.
    #[error("submission rejected: {0}")]
    Rejected(String),
}

/// Seam between the in-memory exam session and the grading side. The only
/// component behind this trait is allowed to persist an attempt.
#[async_trait]
pub trait GradingClient: Send + Sync {
    async fn submit_exam(
        &self,
        request: &SubmitExamRequest,
    ) -> Result<SubmitExamResponse, GradingClientError>;
}

/// Grading client for service-mode deployments where the session runs in
/// the same process as the store: calls the grading service directly.
#[derive(Clone)]
pub struct LocalGradingClient {
    pool: SqlitePool,
    user_id: i64,
}

impl LocalGradingClient {
    pub fn new(pool: SqlitePool, user_id: i64) -> Self {
        Self { pool, user_id }
    }
}

#[async_trait]
impl GradingClient for LocalGradingClient {
    async fn submit_exam(
        &self,
        request: &SubmitExamRequest,
    ) -> Result<SubmitExamResponse, GradingClientError> {
        grade_and_store(&self.pool, self.user_id, request)
            .await
            .map_err(|e| match e {
                AppError::InternalServerError(msg) => GradingClientError::Transport(msg),
                other => GradingClientError::Rejected(other.to_string()),
            })
    }
}
