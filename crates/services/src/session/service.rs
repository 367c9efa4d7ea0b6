use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use backend::{BackendError, ExamBackend, ProgressStream};
use exam_core::Clock;
use exam_core::model::{ExamId, GradingEvent};

use super::controller::{ExamSession, GradingStep};
use crate::auth::CredentialStore;
use crate::error::TakeError;
use crate::events::{AuthEvent, AuthEvents};

/// Orchestrates one exam attempt against the backend: load, autosave,
/// submit, and grading-progress consumption.
///
/// The service owns the I/O and the single open-stream slot; the state
/// machine itself lives in `ExamSession`, which callers pass in by `&mut` —
/// the session is owned by exactly one view instance.
pub struct ExamTakeService {
    clock: Clock,
    backend: Arc<dyn ExamBackend>,
    credentials: Arc<dyn CredentialStore>,
    events: AuthEvents,
    stream: Mutex<Option<ProgressStream>>,
}

impl ExamTakeService {
    #[must_use]
    pub fn new(
        clock: Clock,
        backend: Arc<dyn ExamBackend>,
        credentials: Arc<dyn CredentialStore>,
        events: AuthEvents,
    ) -> Self {
        Self {
            clock,
            backend,
            credentials,
            events,
            stream: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn auth_events(&self) -> &AuthEvents {
        &self.events
    }

    /// Load the exam and this learner's submission status, concurrently.
    ///
    /// A prior submission short-circuits into the read-only result view. A
    /// non-auth failure yields a session in `Phase::Error` carrying the
    /// server message.
    ///
    /// # Errors
    ///
    /// Returns `TakeError::NotAuthenticated` when no learner is stored
    /// (caller redirects to re-authentication), or `TakeError::Unauthorized`
    /// after a 401 cleared the stored credentials.
    pub async fn load(&self, exam_id: ExamId) -> Result<ExamSession, TakeError> {
        let context = self.credentials.load().ok_or(TakeError::NotAuthenticated)?;

        let (paper, status) = tokio::join!(
            self.backend.fetch_paper(exam_id),
            self.backend
                .fetch_submission_status(exam_id, context.learner.id),
        );
        let paper = match paper {
            Ok(paper) => paper,
            Err(err) => return self.load_failure(exam_id, err),
        };
        let status = match status {
            Ok(status) => status,
            Err(err) => return self.load_failure(exam_id, err),
        };

        let started_at = self.clock.now();
        if status.submitted {
            info!(exam = %exam_id, "prior submission found; opening result view");
            return Ok(ExamSession::already_submitted(
                paper,
                status.record,
                started_at,
            ));
        }
        Ok(ExamSession::start(paper, started_at))
    }

    fn load_failure(&self, exam_id: ExamId, err: BackendError) -> Result<ExamSession, TakeError> {
        if err.is_unauthorized() {
            self.expire_session();
            return Err(TakeError::Unauthorized);
        }
        warn!(exam = %exam_id, error = %err, "exam load failed");
        Ok(ExamSession::load_failed(
            exam_id,
            err.message(),
            self.clock.now(),
        ))
    }

    /// Drive the session by one second of wall time: countdown, autosave
    /// boundary, and forced submission at expiry.
    ///
    /// Autosave failures are logged and superseded by the next boundary. A
    /// rejected forced submit stays on the session notice for a manual
    /// retry.
    ///
    /// # Errors
    ///
    /// Returns `TakeError::Unauthorized` when a forced submit hit a 401.
    pub async fn tick_second(&self, session: &mut ExamSession) -> Result<(), TakeError> {
        let effects = session.tick_second();

        if effects.force_submit {
            info!(exam = %session.exam_id(), "time expired; submitting answers");
            match self.submit(session).await {
                Ok(_) => {}
                Err(TakeError::Submit { message }) => {
                    warn!(exam = %session.exam_id(), %message, "forced submit rejected");
                }
                Err(other) => return Err(other),
            }
        } else if effects.autosave_due {
            if let Err(err) = self
                .backend
                .save_answers(session.exam_id(), session.answers())
                .await
            {
                warn!(exam = %session.exam_id(), error = %err, "autosave failed");
            }
        }

        Ok(())
    }

    /// One user-triggered save cycle, holding the session's saving flag for
    /// the duration of the request.
    ///
    /// # Errors
    ///
    /// Returns `TakeError::Save` so the caller may show a transient notice;
    /// never fatal to the attempt.
    pub async fn save_now(&self, session: &mut ExamSession) -> Result<(), TakeError> {
        if session.answers().is_empty() {
            return Ok(());
        }
        session.set_saving(true);
        let result = self
            .backend
            .save_answers(session.exam_id(), session.answers())
            .await;
        session.set_saving(false);

        result.map_err(|err| {
            warn!(exam = %session.exam_id(), error = %err, "manual save failed");
            TakeError::Save {
                message: err.message(),
            }
        })
    }

    /// Submit the full answer mapping. The `begin_submit` gate makes a
    /// second trigger (manual or countdown) a no-op, so at most one HTTP
    /// submit is ever issued per attempt.
    ///
    /// Returns `Ok(false)` when the gate was already engaged, `Ok(true)`
    /// once the submission is accepted and the grading stream is open.
    ///
    /// # Errors
    ///
    /// Returns `TakeError::Submit` on rejection (session back to
    /// `InProgress` with the message surfaced), `TakeError::Unauthorized`
    /// on a 401, or `TakeError::Stream` when the stream cannot be opened.
    pub async fn submit(&self, session: &mut ExamSession) -> Result<bool, TakeError> {
        let context = self.credentials.load().ok_or(TakeError::NotAuthenticated)?;

        if !session.begin_submit() {
            return Ok(false);
        }

        if let Err(err) = self
            .backend
            .submit_answers(session.exam_id(), session.answers())
            .await
        {
            let message = err.message();
            session.submit_rejected(message.clone());
            if err.is_unauthorized() {
                self.expire_session();
                return Err(TakeError::Unauthorized);
            }
            return Err(TakeError::Submit { message });
        }
        session.submit_accepted();

        match self
            .backend
            .open_progress_stream(session.exam_id(), context.learner.id, false)
            .await
        {
            Ok(stream) => {
                self.install_stream(stream).await;
                Ok(true)
            }
            Err(err) => {
                // the submission is already recorded server-side; reload
                // re-checks status idempotently
                let message = err.message();
                session.mark_stream_lost(message.clone());
                Err(TakeError::Stream { message })
            }
        }
    }

    /// Consume the open grading stream until a terminal event.
    ///
    /// `progress` events only update the session's display counter. The
    /// stream is closed on `complete`, on an `error` event, and on
    /// transport loss; no reconnection is attempted.
    ///
    /// # Errors
    ///
    /// Returns `TakeError::Stream` when grading did not reach completion;
    /// the learner recovers by reloading.
    pub async fn await_grading(&self, session: &mut ExamSession) -> Result<(), TakeError> {
        let mut stream = self.stream.lock().await.take().ok_or(TakeError::Stream {
            message: "no open grading stream".into(),
        })?;

        loop {
            match stream.next_event().await {
                Some(Ok(payload)) => match GradingEvent::parse(&payload) {
                    Ok(event) => match session.on_grading_event(event) {
                        GradingStep::Continue => {}
                        GradingStep::Finished => {
                            stream.close();
                            info!(exam = %session.exam_id(), "grading complete");
                            return Ok(());
                        }
                        GradingStep::Failed { message } => {
                            stream.close();
                            return Err(TakeError::Stream { message });
                        }
                    },
                    Err(err) => {
                        warn!(error = %err, "skipping malformed grading event");
                    }
                },
                Some(Err(err)) => {
                    let message = err.message();
                    session.mark_stream_lost(message.clone());
                    stream.close();
                    return Err(TakeError::Stream { message });
                }
                None => {
                    let message = "grading stream closed before completion".to_owned();
                    session.mark_stream_lost(message.clone());
                    return Err(TakeError::Stream { message });
                }
            }
        }
    }

    /// Explicit sign-out of the exam context, valid in any phase — even
    /// mid-submit, since the server-side call has already been fired.
    /// The backend call is best-effort; its failure is ignored.
    pub async fn sign_out(&self) {
        self.teardown().await;
        if let Some(context) = self.credentials.load() {
            if let Err(err) = self.backend.sign_out(context.learner.id).await {
                debug!(error = %err, "ignoring exam sign-out failure");
            }
            self.events.emit(AuthEvent::SignedOut {
                learner: context.learner.id,
            });
        }
        self.credentials.clear();
    }

    /// Release the open stream, if any. Called on view unmount; timers are
    /// the host's ticks and stop with it.
    pub async fn teardown(&self) {
        if let Some(mut stream) = self.stream.lock().await.take() {
            stream.close();
        }
    }

    async fn install_stream(&self, stream: ProgressStream) {
        let mut slot = self.stream.lock().await;
        // a new stream always replaces and cancels any prior one
        if let Some(mut prior) = slot.take() {
            prior.close();
        }
        *slot = Some(stream);
    }

    fn expire_session(&self) {
        self.credentials.clear();
        self.events.emit(AuthEvent::SessionExpired);
    }
}
