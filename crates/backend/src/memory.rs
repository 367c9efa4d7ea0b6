//! Scripted in-memory backend for tests and prototyping, mirroring the
//! shape of the HTTP implementation without any transport.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use reqwest::StatusCode;
use serde_json::Value;

use exam_core::model::{AnswerSheet, ExamId, GradingEvent, LearnerId};

use crate::api::{BackendError, ExamBackend, SubmissionStatus, TakePaper};
use crate::sse::ProgressStream;

#[derive(Default)]
struct State {
    paper: Option<TakePaper>,
    status: SubmissionStatus,
    grading_events: Vec<Result<String, BackendError>>,
    saved_payloads: Vec<Value>,
    submitted_payloads: Vec<Value>,
    fail_saves: bool,
    reject_submit: Option<String>,
    unauthorized: bool,
}

/// In-memory `ExamBackend` double: scripted responses in, recorded calls out.
#[derive(Default)]
pub struct InMemoryBackend {
    state: Mutex<State>,
    save_calls: AtomicUsize,
    submit_calls: AtomicUsize,
    stream_opens: AtomicUsize,
    sign_outs: AtomicUsize,
}

impl InMemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_paper(self, paper: TakePaper) -> Self {
        self.lock().paper = Some(paper);
        self
    }

    #[must_use]
    pub fn with_status(self, status: SubmissionStatus) -> Self {
        self.lock().status = status;
        self
    }

    /// Script the grading stream: events are serialized to their wire
    /// payloads and delivered in order.
    #[must_use]
    pub fn with_grading_events(self, events: Vec<GradingEvent>) -> Self {
        self.lock().grading_events = events
            .iter()
            .map(|event| {
                serde_json::to_string(event)
                    .map_err(|e| BackendError::Internal(e.to_string()))
            })
            .collect();
        self
    }

    /// Make every save attempt fail with a server error.
    pub fn fail_saves(&self, fail: bool) {
        self.lock().fail_saves = fail;
    }

    /// Make the next submit attempts be rejected with this message.
    pub fn reject_submit(&self, message: impl Into<String>) {
        self.lock().reject_submit = Some(message.into());
    }

    /// Stop rejecting submits.
    pub fn accept_submit(&self) {
        self.lock().reject_submit = None;
    }

    /// Make every call fail with a 401.
    pub fn set_unauthorized(&self, unauthorized: bool) {
        self.lock().unauthorized = unauthorized;
    }

    #[must_use]
    pub fn save_count(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn submit_count(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn stream_open_count(&self) -> usize {
        self.stream_opens.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn sign_out_count(&self) -> usize {
        self.sign_outs.load(Ordering::SeqCst)
    }

    /// Every full-mapping payload posted through `save_answers`, in order.
    #[must_use]
    pub fn saved_payloads(&self) -> Vec<Value> {
        self.lock().saved_payloads.clone()
    }

    /// Every full-mapping payload posted through `submit_answers`, in order.
    #[must_use]
    pub fn submitted_payloads(&self) -> Vec<Value> {
        self.lock().submitted_payloads.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn gate(&self) -> Result<(), BackendError> {
        if self.lock().unauthorized {
            Err(BackendError::Unauthorized)
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl ExamBackend for InMemoryBackend {
    async fn fetch_paper(&self, exam: ExamId) -> Result<TakePaper, BackendError> {
        self.gate()?;
        self.lock()
            .paper
            .clone()
            .filter(|p| p.exam_id == exam)
            .ok_or(BackendError::Status {
                status: StatusCode::NOT_FOUND,
                message: format!("exam {exam} not found"),
            })
    }

    async fn fetch_submission_status(
        &self,
        _exam: ExamId,
        _learner: LearnerId,
    ) -> Result<SubmissionStatus, BackendError> {
        self.gate()?;
        Ok(self.lock().status.clone())
    }

    async fn save_answers(&self, _exam: ExamId, answers: &AnswerSheet) -> Result<(), BackendError> {
        self.gate()?;
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.lock();
        state.saved_payloads.push(answers.to_wire());
        if state.fail_saves {
            return Err(BackendError::Status {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "save failed".into(),
            });
        }
        Ok(())
    }

    async fn submit_answers(
        &self,
        _exam: ExamId,
        answers: &AnswerSheet,
    ) -> Result<(), BackendError> {
        self.gate()?;
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.lock();
        if let Some(message) = state.reject_submit.clone() {
            return Err(BackendError::Status {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                message,
            });
        }
        state.submitted_payloads.push(answers.to_wire());
        Ok(())
    }

    async fn open_progress_stream(
        &self,
        _exam: ExamId,
        _learner: LearnerId,
        _force_regenerate: bool,
    ) -> Result<ProgressStream, BackendError> {
        self.gate()?;
        self.stream_opens.fetch_add(1, Ordering::SeqCst);
        let events = std::mem::take(&mut self.lock().grading_events);
        Ok(ProgressStream::from_events(events))
    }

    async fn sign_out(&self, _learner: LearnerId) -> Result<(), BackendError> {
        self.gate()?;
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{AnswerValue, FeedbackVisibility, QuestionId};

    fn paper() -> TakePaper {
        TakePaper::new(
            ExamId::new(1),
            "Smoke",
            600,
            FeedbackVisibility::ScoreOnly,
            Vec::new(),
        )
    }

    #[tokio::test]
    async fn records_save_payloads_in_order() {
        let backend = InMemoryBackend::new().with_paper(paper());
        let mut sheet = AnswerSheet::new();
        sheet.set(QuestionId::new(1), AnswerValue::Choice("A".into()));
        backend.save_answers(ExamId::new(1), &sheet).await.unwrap();
        sheet.set(QuestionId::new(1), AnswerValue::Choice("B".into()));
        backend.save_answers(ExamId::new(1), &sheet).await.unwrap();

        assert_eq!(backend.save_count(), 2);
        let payloads = backend.saved_payloads();
        assert_eq!(payloads[0]["1"], "A");
        assert_eq!(payloads[1]["1"], "B");
    }

    #[tokio::test]
    async fn rejected_submit_carries_server_message() {
        let backend = InMemoryBackend::new();
        backend.reject_submit("window closed");
        let err = backend
            .submit_answers(ExamId::new(1), &AnswerSheet::new())
            .await
            .unwrap_err();
        assert_eq!(err.message(), "window closed");
        assert_eq!(backend.submit_count(), 1);
        assert!(backend.submitted_payloads().is_empty());
    }

    #[tokio::test]
    async fn unauthorized_gate_applies_to_all_calls() {
        let backend = InMemoryBackend::new().with_paper(paper());
        backend.set_unauthorized(true);
        let err = backend.fetch_paper(ExamId::new(1)).await.unwrap_err();
        assert!(err.is_unauthorized());
    }
}
