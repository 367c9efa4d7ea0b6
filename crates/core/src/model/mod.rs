mod answer;
mod grading;
mod ids;
mod question;
mod submission;

pub use answer::{AnswerSheet, AnswerValue, MatchPair};
pub use grading::{GradingEvent, GradingProgress};
pub use ids::{ExamId, LearnerId, ParseIdError, QuestionId};
pub use question::{ChoiceOption, Question, QuestionKind};
pub use submission::{FeedbackVisibility, QuestionResult, SubmissionRecord};
