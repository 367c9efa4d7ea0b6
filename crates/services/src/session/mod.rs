mod controller;
mod phase;
mod service;
mod view;

// Public API of the exam-taking subsystem.
pub use controller::{ExamSession, GradingStep};
pub use phase::{Phase, TickEffects};
pub use service::ExamTakeService;
pub use view::{CountdownView, SubmissionView, progress_label};
