// src/session/mod.rs
//
// Client-side exam session: the countdown timer and the per-attempt state
// machine that owns navigation, answer selection and submission. Nothing
// here touches storage; a successful submit hands the frozen answer map to
// the grading side through the `GradingClient` seam.

pub mod client;
pub mod controller;
pub mod timer;

pub use client::{GradingClient, GradingClientError, LocalGradingClient};
pub use controller::{ExamSession, NavTarget, Phase, SessionError};
pub use timer::{ExamTimer, TimerEvent};
