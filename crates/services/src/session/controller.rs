use std::fmt;

use chrono::{DateTime, Utc};

use backend::TakePaper;
use exam_core::model::{
    AnswerSheet, AnswerValue, ExamId, FeedbackVisibility, GradingEvent, GradingProgress, Question,
    QuestionId, SubmissionRecord,
};

use crate::error::TakeError;
use super::phase::{Phase, TickEffects};

/// Seconds between autosave boundaries while the attempt is in progress.
pub const AUTOSAVE_INTERVAL_SECS: u32 = 30;

/// Outcome of feeding one grading event into the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GradingStep {
    /// Keep consuming the stream.
    Continue,
    /// `complete` arrived; the stream must be closed.
    Finished,
    /// `error` arrived; the stream must be closed and the failure surfaced.
    Failed { message: String },
}

//
// ─── EXAM SESSION ──────────────────────────────────────────────────────────────
//

/// One learner's attempt at one exam, owned exclusively by a single view
/// instance for its lifetime.
///
/// This is the state machine only: it decides transitions and reports tick
/// effects, while `ExamTakeService` performs the I/O those effects call for.
pub struct ExamSession {
    exam_id: ExamId,
    title: String,
    questions: Vec<Question>,
    answers: AnswerSheet,
    remaining_seconds: u32,
    ticks_to_autosave: u32,
    expiry_forced: bool,
    phase: Phase,
    feedback: FeedbackVisibility,
    started_at: DateTime<Utc>,
    last_submission: Option<SubmissionRecord>,
    grading_progress: Option<GradingProgress>,
    notice: Option<String>,
    saving: bool,
}

impl ExamSession {
    /// Begin a fresh or resumed attempt: autosaved answers are restored and
    /// the countdown starts from the server-tracked remainder when present.
    ///
    /// `started_at` should come from the services layer clock to keep time
    /// deterministic.
    #[must_use]
    pub fn start(paper: TakePaper, started_at: DateTime<Utc>) -> Self {
        let remaining_seconds = paper.remaining_seconds.unwrap_or(paper.duration_seconds);
        Self {
            exam_id: paper.exam_id,
            title: paper.title,
            questions: paper.questions,
            answers: paper.saved_answers,
            remaining_seconds,
            ticks_to_autosave: AUTOSAVE_INTERVAL_SECS,
            expiry_forced: false,
            phase: Phase::InProgress,
            feedback: paper.feedback,
            started_at,
            last_submission: None,
            grading_progress: None,
            notice: None,
            saving: false,
        }
    }

    /// Read-only result view for an exam this learner already submitted.
    #[must_use]
    pub fn already_submitted(
        paper: TakePaper,
        record: Option<SubmissionRecord>,
        started_at: DateTime<Utc>,
    ) -> Self {
        let mut session = Self::start(paper, started_at);
        session.phase = Phase::AlreadySubmitted;
        session.last_submission = record;
        session
    }

    /// Placeholder session rendered while a load is in flight. Answering
    /// and ticking are inert until the host replaces it with the loaded
    /// session.
    #[must_use]
    pub fn loading(exam_id: ExamId, started_at: DateTime<Utc>) -> Self {
        Self {
            exam_id,
            title: String::new(),
            questions: Vec::new(),
            answers: AnswerSheet::new(),
            remaining_seconds: 0,
            ticks_to_autosave: AUTOSAVE_INTERVAL_SECS,
            expiry_forced: true,
            phase: Phase::Loading,
            feedback: FeedbackVisibility::ScoreOnly,
            started_at,
            last_submission: None,
            grading_progress: None,
            notice: None,
            saving: false,
        }
    }

    /// Session shell for a failed load, carrying the displayable message.
    #[must_use]
    pub fn load_failed(
        exam_id: ExamId,
        message: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            exam_id,
            title: String::new(),
            questions: Vec::new(),
            answers: AnswerSheet::new(),
            remaining_seconds: 0,
            ticks_to_autosave: AUTOSAVE_INTERVAL_SECS,
            expiry_forced: true,
            phase: Phase::Error {
                message: message.into(),
            },
            feedback: FeedbackVisibility::ScoreOnly,
            started_at,
            last_submission: None,
            grading_progress: None,
            notice: None,
            saving: false,
        }
    }

    #[must_use]
    pub fn exam_id(&self) -> ExamId {
        self.exam_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerSheet {
        &self.answers
    }

    #[must_use]
    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    #[must_use]
    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    #[must_use]
    pub fn feedback(&self) -> FeedbackVisibility {
        self.feedback
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn last_submission(&self) -> Option<&SubmissionRecord> {
        self.last_submission.as_ref()
    }

    #[must_use]
    pub fn grading_progress(&self) -> Option<&GradingProgress> {
        self.grading_progress.as_ref()
    }

    /// Transient message from a rejected submit, cleared on the next attempt.
    #[must_use]
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    #[must_use]
    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub(crate) fn set_saving(&mut self, saving: bool) {
        self.saving = saving;
    }

    //
    // ─── ANSWER MUTATION ───────────────────────────────────────────────────
    //

    /// Replace the answer for one question. Rejected once the attempt has
    /// left `InProgress`: the sheet is read-only from submission onward.
    ///
    /// # Errors
    ///
    /// Returns `TakeError::SessionFrozen` when answering is no longer open.
    pub fn set_answer(&mut self, question: QuestionId, value: AnswerValue) -> Result<(), TakeError> {
        self.check_mutable()?;
        self.answers.set(question, value);
        Ok(())
    }

    /// Toggle one option of a multiple-choice answer.
    ///
    /// # Errors
    ///
    /// Returns `TakeError::SessionFrozen` when answering is no longer open.
    pub fn toggle_choice(&mut self, question: QuestionId, label: &str) -> Result<(), TakeError> {
        self.check_mutable()?;
        self.answers.toggle_choice(question, label);
        Ok(())
    }

    fn check_mutable(&self) -> Result<(), TakeError> {
        if self.phase == Phase::InProgress {
            Ok(())
        } else {
            Err(TakeError::SessionFrozen)
        }
    }

    //
    // ─── COUNTDOWN / AUTOSAVE TICK ─────────────────────────────────────────
    //

    /// Advance the session by one second.
    ///
    /// Only meaningful while `InProgress`; any other phase is a no-op. The
    /// remaining time is clamped at zero, and `force_submit` is reported
    /// exactly once, on the first tick at which the remainder is zero. An
    /// attempt resumed with no time left is therefore forced on its very
    /// first tick. Autosave is due on every 30-second boundary at which at
    /// least one answer exists; an empty boundary fires nothing and the next
    /// boundary re-checks.
    pub fn tick_second(&mut self) -> TickEffects {
        if self.phase != Phase::InProgress {
            return TickEffects::none();
        }

        let mut effects = TickEffects::none();

        if self.remaining_seconds > 0 {
            self.remaining_seconds -= 1;
        }
        if self.remaining_seconds == 0 && !self.expiry_forced {
            self.expiry_forced = true;
            effects.force_submit = true;
        }

        self.ticks_to_autosave = self.ticks_to_autosave.saturating_sub(1);
        if self.ticks_to_autosave == 0 {
            self.ticks_to_autosave = AUTOSAVE_INTERVAL_SECS;
            effects.autosave_due = !self.answers.is_empty();
        }

        // a forced submit carries the full sheet anyway
        if effects.force_submit {
            effects.autosave_due = false;
        }

        effects
    }

    //
    // ─── SUBMISSION ────────────────────────────────────────────────────────
    //

    /// The single gate for the at-most-one-submission invariant: transitions
    /// `InProgress -> Submitting` and reports whether it happened. Any second
    /// trigger while a submission is outstanding is a no-op.
    pub fn begin_submit(&mut self) -> bool {
        if self.phase == Phase::InProgress {
            self.phase = Phase::Submitting;
            self.notice = None;
            true
        } else {
            false
        }
    }

    /// The submit request was accepted; grading is now asynchronous.
    pub(crate) fn submit_accepted(&mut self) {
        if self.phase == Phase::Submitting {
            self.phase = Phase::AwaitingGrading;
        }
    }

    /// The submit request was rejected: surface the message and return to
    /// answering so the learner may retry.
    pub(crate) fn submit_rejected(&mut self, message: impl Into<String>) {
        if self.phase == Phase::Submitting {
            self.phase = Phase::InProgress;
            self.notice = Some(message.into());
        }
    }

    /// Feed one parsed grading event into the session.
    ///
    /// `progress` only updates the display counter; `complete` stores the
    /// authoritative record and freezes the session; `error` surfaces the
    /// failure. Events arriving outside `AwaitingGrading` are ignored.
    pub fn on_grading_event(&mut self, event: GradingEvent) -> GradingStep {
        if self.phase != Phase::AwaitingGrading {
            return GradingStep::Continue;
        }

        match event {
            GradingEvent::Progress(progress) => {
                self.grading_progress = Some(progress);
                GradingStep::Continue
            }
            GradingEvent::Complete { submission } => {
                self.last_submission = Some(submission);
                self.phase = Phase::Completed;
                GradingStep::Finished
            }
            GradingEvent::Error { message } => {
                self.phase = Phase::Error {
                    message: message.clone(),
                };
                GradingStep::Failed { message }
            }
        }
    }

    /// The transport dropped before a terminal event arrived.
    pub(crate) fn mark_stream_lost(&mut self, message: impl Into<String>) {
        if self.phase == Phase::AwaitingGrading {
            self.phase = Phase::Error {
                message: message.into(),
            };
        }
    }
}

impl fmt::Debug for ExamSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExamSession")
            .field("exam_id", &self.exam_id)
            .field("phase", &self.phase)
            .field("questions_len", &self.questions.len())
            .field("answers_len", &self.answers.len())
            .field("remaining_seconds", &self.remaining_seconds)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
