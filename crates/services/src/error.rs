//! Shared error types for the services crate.

use thiserror::Error;

/// Errors emitted by the exam-taking services.
///
/// Every network-originated failure is converted at the boundary where the
/// request was issued into either a phase transition or one of these scoped
/// variants; nothing propagates as an unhandled fault.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TakeError {
    #[error("no learner session is available")]
    NotAuthenticated,

    #[error("authentication expired")]
    Unauthorized,

    #[error("saving answers failed: {message}")]
    Save { message: String },

    #[error("submission rejected: {message}")]
    Submit { message: String },

    #[error("grading stream failed: {message}")]
    Stream { message: String },

    #[error("session is read-only after submission")]
    SessionFrozen,
}
