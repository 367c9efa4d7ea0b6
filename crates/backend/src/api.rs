use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use exam_core::DecodeError;
use exam_core::model::{
    AnswerSheet, ExamId, FeedbackVisibility, LearnerId, Question, SubmissionRecord,
};

use crate::sse::ProgressStream;

/// Errors surfaced by backend adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BackendError {
    #[error("authentication rejected")]
    Unauthorized,

    #[error("request failed with status {status}: {message}")]
    Status {
        status: reqwest::StatusCode,
        message: String,
    },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("internal backend error: {0}")]
    Internal(String),
}

impl BackendError {
    /// Human-readable text for display, preferring the server-provided
    /// message when one exists.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            BackendError::Status { message, .. } if !message.is_empty() => message.clone(),
            other => other.to_string(),
        }
    }

    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, BackendError::Unauthorized)
    }
}

/// The exam as fetched for taking, including anything recovered from a
/// previous visit: autosaved answers and, for a resumed attempt, the
/// remaining time the server tracked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TakePaper {
    pub exam_id: ExamId,
    pub title: String,
    pub duration_seconds: u32,
    #[serde(default)]
    pub remaining_seconds: Option<u32>,
    pub feedback: FeedbackVisibility,
    pub questions: Vec<Question>,
    #[serde(default)]
    pub saved_answers: AnswerSheet,
}

impl TakePaper {
    #[must_use]
    pub fn new(
        exam_id: ExamId,
        title: impl Into<String>,
        duration_seconds: u32,
        feedback: FeedbackVisibility,
        questions: Vec<Question>,
    ) -> Self {
        Self {
            exam_id,
            title: title.into(),
            duration_seconds,
            remaining_seconds: None,
            feedback,
            questions,
            saved_answers: AnswerSheet::new(),
        }
    }
}

/// Whether this learner already submitted this exam, and the record if so.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmissionStatus {
    pub submitted: bool,
    #[serde(default)]
    pub record: Option<SubmissionRecord>,
}

/// Boundary to the REST+SSE exam backend, as consumed by the session
/// controller. Implementations must not retry or reconnect on their own;
/// recovery policy belongs to the caller.
#[async_trait]
pub trait ExamBackend: Send + Sync {
    /// Fetch the exam definition for taking.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Unauthorized` on 401, otherwise the mapped
    /// transport or server error.
    async fn fetch_paper(&self, exam: ExamId) -> Result<TakePaper, BackendError>;

    /// Fetch whether the learner already submitted this exam. Idempotent;
    /// this is the recovery path after a lost grading stream.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` on transport or server failure.
    async fn fetch_submission_status(
        &self,
        exam: ExamId,
        learner: LearnerId,
    ) -> Result<SubmissionStatus, BackendError>;

    /// Persist the full current answer mapping (autosave and manual save).
    ///
    /// # Errors
    ///
    /// Returns `BackendError` on transport or server failure.
    async fn save_answers(&self, exam: ExamId, answers: &AnswerSheet) -> Result<(), BackendError>;

    /// Submit the full answer mapping. An accepted response carries no
    /// grade; grading is asynchronous via the progress stream.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` when the submission is rejected.
    async fn submit_answers(&self, exam: ExamId, answers: &AnswerSheet)
    -> Result<(), BackendError>;

    /// Open the grading progress stream scoped to one exam + learner.
    /// `force_regenerate` re-runs grading for report-style variants.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` when the stream cannot be opened.
    async fn open_progress_stream(
        &self,
        exam: ExamId,
        learner: LearnerId,
        force_regenerate: bool,
    ) -> Result<ProgressStream, BackendError>;

    /// Best-effort logout of the exam context. Callers ignore failures.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` on transport failure; callers treat it as
    /// advisory only.
    async fn sign_out(&self, learner: LearnerId) -> Result<(), BackendError>;
}
