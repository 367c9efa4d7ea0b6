//! Rendering-free view helpers: pure projections of session state that the
//! host's presentation components display verbatim.

use exam_core::countdown::{format_clock, is_low_time};
use exam_core::model::{FeedbackVisibility, GradingProgress, SubmissionRecord};

/// Countdown display state, derived purely from the remaining seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountdownView {
    pub label: String,
    /// Below five minutes the timer renders in its warning style.
    pub low_time: bool,
}

impl CountdownView {
    #[must_use]
    pub fn from_seconds(remaining_seconds: u32) -> Self {
        Self {
            label: format_clock(remaining_seconds),
            low_time: is_low_time(remaining_seconds),
        }
    }
}

/// "5/10"-style label for the grading progress counter, with the server
/// message appended when one was sent.
#[must_use]
pub fn progress_label(progress: &GradingProgress) -> String {
    match &progress.message {
        Some(message) => format!("{}/{} {message}", progress.current, progress.total),
        None => format!("{}/{}", progress.current, progress.total),
    }
}

/// Post-submission detail gated by the exam's feedback visibility setting.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionView {
    pub score: f64,
    pub show_answers: bool,
    pub show_detail: bool,
}

impl SubmissionView {
    #[must_use]
    pub fn new(record: &SubmissionRecord, visibility: FeedbackVisibility) -> Self {
        let (show_answers, show_detail) = match visibility {
            FeedbackVisibility::ScoreOnly => (false, false),
            FeedbackVisibility::WithAnswers => (true, false),
            FeedbackVisibility::FullDetail => (true, true),
        };
        Self {
            score: record.score(),
            show_answers,
            show_detail,
        }
    }
}
