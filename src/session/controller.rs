// src/session/controller.rs

use std::collections::{HashMap, HashSet};

use tokio::sync::mpsc;

use crate::models::attempt::{SubmitExamRequest, SubmitExamResponse};
use crate::models::question::{QuestionType, ReviewQuestion};
use crate::session::client::GradingClient;
use crate::session::timer::{ExamTimer, TimerEvent};

/// Session phase. Active and Paused toggle freely; submission is a one-way
/// door: Active|Paused -> Submitting -> Completed, and Completed is
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Active,
    Paused,
    Submitting,
    Completed,
}

/// Navigation request for the question cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavTarget {
    Prev,
    Next,
    Index(usize),
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("an exam session needs at least one question")]
    NoQuestions,
    #[error("answers can only be changed while the session is active")]
    NotActive,
    #[error("a submission is already in flight")]
    SubmitInFlight,
    #[error("unknown question id {0}")]
    UnknownQuestion(i64),
    #[error("option {option_id} does not belong to question {question_id}")]
    UnknownOption { question_id: i64, option_id: i64 },
    #[error("grading failed: {0}")]
    Grading(String),
}

/// In-memory state machine for one exam attempt. Owns the countdown timer
/// and the answer map; produces exactly one submission per session, either
/// through a manual [`submit`](Self::submit) or through
/// [`on_timer_expired`](Self::on_timer_expired), whichever fires first.
pub struct ExamSession<G> {
    test_id: i64,
    questions: Vec<ReviewQuestion>,
    current_index: usize,
    answers: HashMap<i64, HashSet<i64>>,
    phase: Phase,
    timer: ExamTimer,
    expiry: Option<mpsc::UnboundedReceiver<TimerEvent>>,
    started_at: chrono::DateTime<chrono::Utc>,
    client: G,
    outcome: Option<SubmitExamResponse>,
}

impl<G: GradingClient> ExamSession<G> {
    /// Starts a session over the given questions and begins the countdown.
    /// The start instant is captured here and travels with the submission,
    /// so the persisted attempt records the real elapsed time.
    pub fn start(
        test_id: i64,
        questions: Vec<ReviewQuestion>,
        duration_seconds: u64,
        client: G,
    ) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::NoQuestions);
        }

        let mut timer = ExamTimer::new();
        let expiry = timer.start(duration_seconds);

        Ok(Self {
            test_id,
            questions,
            current_index: 0,
            answers: HashMap::new(),
            phase: Phase::Active,
            timer,
            expiry: Some(expiry),
            started_at: chrono::Utc::now(),
            client,
            outcome: None,
        })
    }

    /// Records a selection for a question. Single-choice questions replace
    /// any prior selection; multiple-choice questions toggle membership of
    /// the option in the selection set. Only allowed while Active.
    pub fn select_answer(&mut self, question_id: i64, option_id: i64) -> Result<(), SessionError> {
        if self.phase != Phase::Active {
            return Err(SessionError::NotActive);
        }

        let question = self
            .questions
            .iter()
            .find(|q| q.id == question_id)
            .ok_or(SessionError::UnknownQuestion(question_id))?;

        if !question.options.iter().any(|o| o.id == option_id) {
            return Err(SessionError::UnknownOption {
                question_id,
                option_id,
            });
        }

        let selected = self.answers.entry(question_id).or_default();
        match question.question_type {
            QuestionType::Single => {
                selected.clear();
                selected.insert(option_id);
            }
            QuestionType::Multiple => {
                if !selected.remove(&option_id) {
                    selected.insert(option_id);
                }
            }
        }
        Ok(())
    }

    /// Moves the question cursor. Out-of-range index targets are a no-op,
    /// as is any navigation once the session is submitting or done.
    pub fn navigate(&mut self, target: NavTarget) {
        if !matches!(self.phase, Phase::Active | Phase::Paused) {
            return;
        }
        match target {
            NavTarget::Prev => {
                self.current_index = self.current_index.saturating_sub(1);
            }
            NavTarget::Next => {
                if self.current_index + 1 < self.questions.len() {
                    self.current_index += 1;
                }
            }
            NavTarget::Index(i) => {
                if i < self.questions.len() {
                    self.current_index = i;
                }
            }
        }
    }

    /// Toggles between Active and Paused, forwarding to the timer. A no-op
    /// in any other phase.
    pub fn toggle_pause(&mut self) {
        match self.phase {
            Phase::Active => {
                self.timer.pause();
                self.phase = Phase::Paused;
            }
            Phase::Paused => {
                self.timer.resume();
                self.phase = Phase::Active;
            }
            Phase::Submitting | Phase::Completed => {}
        }
    }

    /// Submits the answer map for grading. Valid from Active or Paused;
    /// cancels the timer, blocks further submissions while in flight, and
    /// on failure reverts to the pre-submit phase so the caller may retry.
    /// A no-op once the session is already Completed.
    pub async fn submit(&mut self) -> Result<(), SessionError> {
        let revert_to = match self.phase {
            Phase::Completed => return Ok(()),
            Phase::Submitting => return Err(SessionError::SubmitInFlight),
            phase @ (Phase::Active | Phase::Paused) => phase,
        };

        self.phase = Phase::Submitting;
        self.timer.cancel();

        let request = SubmitExamRequest {
            test_id: self.test_id,
            answers: self
                .answers
                .iter()
                .map(|(q, opts)| {
                    let mut ids: Vec<i64> = opts.iter().copied().collect();
                    ids.sort_unstable();
                    (*q, ids)
                })
                .collect(),
            started_at: Some(self.started_at),
        };

        match self.client.submit_exam(&request).await {
            Ok(outcome) => {
                self.outcome = Some(outcome);
                self.phase = Phase::Completed;
                Ok(())
            }
            Err(e) => {
                self.phase = revert_to;
                Err(SessionError::Grading(e.to_string()))
            }
        }
    }

    /// Timer expiry entry point: an automatic submit. Ignored when a manual
    /// submit is already in flight or the session is done, so exactly one
    /// submission is produced per session.
    pub async fn on_timer_expired(&mut self) -> Result<(), SessionError> {
        match self.phase {
            Phase::Active | Phase::Paused => self.submit().await,
            Phase::Submitting | Phase::Completed => Ok(()),
        }
    }

    /// Abandons the session: stops the timer and discards all state.
    /// Nothing is persisted.
    pub fn abandon(mut self) {
        self.timer.cancel();
    }

    /// Hands the expiry channel to the host event loop. The single
    /// `Expired` event it yields should be routed to
    /// [`on_timer_expired`](Self::on_timer_expired).
    pub fn take_expiry(&mut self) -> Option<mpsc::UnboundedReceiver<TimerEvent>> {
        self.expiry.take()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_question(&self) -> &ReviewQuestion {
        &self.questions[self.current_index]
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.timer.remaining_seconds()
    }

    pub fn selected_options(&self, question_id: i64) -> Option<&HashSet<i64>> {
        self.answers.get(&question_id)
    }

    /// The grading response, present once the session is Completed.
    pub fn outcome(&self) -> Option<&SubmitExamResponse> {
        self.outcome.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::models::attempt::{Attempt, AttemptDetail};
    use crate::models::question::PublicOption;
    use crate::models::test::TestWithQuestions;
    use crate::session::client::GradingClientError;

    /// Scripted grading backend: pops one canned result per call and
    /// counts how many submissions actually went out.
    struct ScriptedGrader {
        calls: AtomicUsize,
        script: Mutex<Vec<Result<(), String>>>,
    }

    impl ScriptedGrader {
        fn new(script: Vec<Result<(), String>>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                script: Mutex::new(script),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GradingClient for &ScriptedGrader {
        async fn submit_exam(
            &self,
            request: &SubmitExamRequest,
        ) -> Result<SubmitExamResponse, GradingClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop().unwrap_or(Ok(()));
            match next {
                Ok(()) => Ok(canned_response(request)),
                Err(msg) => Err(GradingClientError::Transport(msg)),
            }
        }
    }

    fn canned_response(request: &SubmitExamRequest) -> SubmitExamResponse {
        let now = chrono::Utc::now();
        SubmitExamResponse {
            attempt: AttemptDetail {
                record: Attempt {
                    id: 1,
                    test_id: request.test_id,
                    user_id: 7,
                    score: 100,
                    total_questions: request.answers.len() as i64,
                    correct_answers: request.answers.len() as i64,
                    started_at: request.started_at.unwrap_or(now),
                    completed_at: now,
                },
                answers: request.answers.clone(),
            },
            test: TestWithQuestions {
                id: request.test_id,
                title: "canned".to_string(),
                duration_seconds: 60,
                questions: vec![],
            },
            correct_answer_map: HashMap::new(),
        }
    }

    fn question(id: i64, question_type: QuestionType, option_ids: &[i64]) -> ReviewQuestion {
        ReviewQuestion {
            id,
            question_type,
            content: format!("question {id}"),
            explanation: None,
            options: option_ids
                .iter()
                .map(|o| PublicOption {
                    id: *o,
                    content: format!("option {o}"),
                })
                .collect(),
        }
    }

    fn three_questions() -> Vec<ReviewQuestion> {
        vec![
            question(1, QuestionType::Single, &[10, 11]),
            question(2, QuestionType::Multiple, &[20, 21, 22]),
            question(3, QuestionType::Single, &[30, 31]),
        ]
    }

    #[tokio::test]
    async fn single_choice_replaces_and_multiple_choice_toggles() {
        let grader = ScriptedGrader::new(vec![]);
        let mut session = ExamSession::start(1, three_questions(), 60, &grader).unwrap();

        session.select_answer(1, 10).unwrap();
        session.select_answer(1, 11).unwrap();
        assert_eq!(
            session.selected_options(1),
            Some(&HashSet::from([11])),
            "single choice replaces the prior selection"
        );

        session.select_answer(2, 20).unwrap();
        session.select_answer(2, 21).unwrap();
        session.select_answer(2, 20).unwrap();
        assert_eq!(session.selected_options(2), Some(&HashSet::from([21])));
    }

    #[tokio::test]
    async fn rejects_unknown_questions_and_options() {
        let grader = ScriptedGrader::new(vec![]);
        let mut session = ExamSession::start(1, three_questions(), 60, &grader).unwrap();

        assert!(matches!(
            session.select_answer(99, 10),
            Err(SessionError::UnknownQuestion(99))
        ));
        assert!(matches!(
            session.select_answer(1, 20),
            Err(SessionError::UnknownOption { .. })
        ));
    }

    #[tokio::test]
    async fn navigation_clamps_to_bounds() {
        let grader = ScriptedGrader::new(vec![]);
        let mut session = ExamSession::start(1, three_questions(), 60, &grader).unwrap();

        session.navigate(NavTarget::Prev);
        assert_eq!(session.current_index(), 0);

        session.navigate(NavTarget::Next);
        session.navigate(NavTarget::Next);
        session.navigate(NavTarget::Next);
        assert_eq!(session.current_index(), 2);

        session.navigate(NavTarget::Index(99));
        assert_eq!(session.current_index(), 2, "out-of-range index is a no-op");

        session.navigate(NavTarget::Index(1));
        assert_eq!(session.current_index(), 1);
    }

    #[tokio::test]
    async fn pause_blocks_answering_until_resumed() {
        let grader = ScriptedGrader::new(vec![]);
        let mut session = ExamSession::start(1, three_questions(), 60, &grader).unwrap();

        session.toggle_pause();
        assert_eq!(session.phase(), Phase::Paused);
        assert!(matches!(
            session.select_answer(1, 10),
            Err(SessionError::NotActive)
        ));

        session.toggle_pause();
        assert_eq!(session.phase(), Phase::Active);
        session.select_answer(1, 10).unwrap();
    }

    #[tokio::test]
    async fn successful_submit_completes_the_session() {
        let grader = ScriptedGrader::new(vec![Ok(())]);
        let mut session = ExamSession::start(1, three_questions(), 60, &grader).unwrap();
        session.select_answer(1, 10).unwrap();

        session.submit().await.unwrap();
        assert_eq!(session.phase(), Phase::Completed);
        assert!(session.outcome().is_some());
        assert_eq!(grader.calls(), 1);

        // Completed is terminal: everything else is a no-op.
        assert!(matches!(
            session.select_answer(1, 11),
            Err(SessionError::NotActive)
        ));
        session.navigate(NavTarget::Next);
        assert_eq!(session.current_index(), 0);
        session.toggle_pause();
        assert_eq!(session.phase(), Phase::Completed);
        session.submit().await.unwrap();
        assert_eq!(grader.calls(), 1, "no second submission after completion");
    }

    #[tokio::test]
    async fn failed_submit_reverts_to_the_pre_submit_phase() {
        let grader = ScriptedGrader::new(vec![Ok(()), Err("timeout".to_string())]);
        let mut session = ExamSession::start(1, three_questions(), 60, &grader).unwrap();
        session.toggle_pause();

        let err = session.submit().await.unwrap_err();
        assert!(matches!(err, SessionError::Grading(_)));
        assert_eq!(session.phase(), Phase::Paused, "retryable from where it was");

        session.submit().await.unwrap();
        assert_eq!(session.phase(), Phase::Completed);
        assert_eq!(grader.calls(), 2);
    }

    #[tokio::test]
    async fn expiry_submits_once_and_is_ignored_after_completion() {
        let grader = ScriptedGrader::new(vec![Ok(())]);
        let mut session = ExamSession::start(1, three_questions(), 60, &grader).unwrap();

        session.on_timer_expired().await.unwrap();
        assert_eq!(session.phase(), Phase::Completed);
        assert_eq!(grader.calls(), 1);

        session.on_timer_expired().await.unwrap();
        assert_eq!(grader.calls(), 1, "expiry after completion is swallowed");
    }

    #[tokio::test]
    async fn submission_carries_the_true_start_instant() {
        let grader = ScriptedGrader::new(vec![Ok(())]);
        let before = chrono::Utc::now();
        let mut session = ExamSession::start(1, three_questions(), 60, &grader).unwrap();

        session.submit().await.unwrap();
        let record = &session.outcome().unwrap().attempt.record;
        assert!(record.started_at >= before);
        assert!(record.started_at <= record.completed_at);
    }

    #[tokio::test(start_paused = true)]
    async fn timer_expiry_event_drives_automatic_submission() {
        let grader = ScriptedGrader::new(vec![Ok(())]);
        let mut session = ExamSession::start(1, three_questions(), 2, &grader).unwrap();
        let mut expiry = session.take_expiry().unwrap();

        for _ in 0..2 {
            tokio::task::yield_now().await;
            tokio::time::advance(tokio::time::Duration::from_secs(1)).await;
            tokio::task::yield_now().await;
        }
        assert!(matches!(expiry.try_recv(), Ok(TimerEvent::Expired)));

        session.on_timer_expired().await.unwrap();
        assert_eq!(session.phase(), Phase::Completed);
    }
}
