#![forbid(unsafe_code)]

pub mod auth;
pub mod error;
pub mod events;
pub mod session;

pub use exam_core::Clock;

pub use auth::{CredentialStore, ExamLearner, InMemoryCredentialStore, SessionContext};
pub use error::TakeError;
pub use events::{AuthEvent, AuthEvents};

pub use session::{
    CountdownView, ExamSession, ExamTakeService, GradingStep, Phase, SubmissionView, TickEffects,
    progress_label,
};
