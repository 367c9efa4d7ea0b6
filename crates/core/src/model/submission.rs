use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::QuestionId;

/// Per-exam setting controlling how much post-submission detail the learner
/// may see. Consumed, not computed, by the session controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackVisibility {
    /// Final score only.
    ScoreOnly,
    /// Score plus the learner's own answers.
    WithAnswers,
    /// Score, answers, and per-question grading detail.
    FullDetail,
}

/// Grading outcome for a single question within a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionResult {
    pub question_id: QuestionId,
    pub awarded: f64,
    pub correct: bool,
    #[serde(default)]
    pub comment: Option<String>,
}

/// The server's authoritative record of one graded submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    score: f64,
    submitted_at: DateTime<Utc>,
    #[serde(default)]
    detail: Vec<QuestionResult>,
}

impl SubmissionRecord {
    #[must_use]
    pub fn new(score: f64, submitted_at: DateTime<Utc>, detail: Vec<QuestionResult>) -> Self {
        Self {
            score,
            submitted_at,
            detail,
        }
    }

    #[must_use]
    pub fn score(&self) -> f64 {
        self.score
    }

    #[must_use]
    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    #[must_use]
    pub fn detail(&self) -> &[QuestionResult] {
        &self.detail
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn record_round_trips_through_json() {
        let record = SubmissionRecord::new(
            87.5,
            fixed_now(),
            vec![QuestionResult {
                question_id: QuestionId::new(1),
                awarded: 5.0,
                correct: true,
                comment: None,
            }],
        );

        let text = serde_json::to_string(&record).unwrap();
        let back: SubmissionRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(back, record);
        assert_eq!(back.detail().len(), 1);
    }
}
