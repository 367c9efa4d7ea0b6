use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::model::submission::SubmissionRecord;

/// Display-only counter carried by `progress` events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingProgress {
    pub current: u32,
    pub total: u32,
    #[serde(default)]
    pub message: Option<String>,
}

/// One event of the post-submission grading stream.
///
/// The wire payload is JSON text with a `type` discriminant; `complete`
/// carries the authoritative submission record and terminates the stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GradingEvent {
    Progress(GradingProgress),
    Complete { submission: SubmissionRecord },
    Error { message: String },
}

impl GradingEvent {
    /// Parse one raw server-sent payload.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError` when the payload is not a recognized event.
    pub fn parse(payload: &str) -> Result<Self, DecodeError> {
        serde_json::from_str(payload).map_err(|e| DecodeError::json("grading event", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_progress_event() {
        let event =
            GradingEvent::parse(r#"{"type":"progress","current":5,"total":10}"#).unwrap();
        assert_eq!(
            event,
            GradingEvent::Progress(GradingProgress {
                current: 5,
                total: 10,
                message: None,
            })
        );
    }

    #[test]
    fn parses_complete_event_with_record() {
        let payload = r#"{
            "type": "complete",
            "submission": { "score": 92.0, "submitted_at": "2023-11-14T22:13:20Z" }
        }"#;
        let event = GradingEvent::parse(payload).unwrap();
        match event {
            GradingEvent::Complete { submission } => {
                assert!((submission.score() - 92.0).abs() < f64::EPSILON);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn parses_error_event() {
        let event = GradingEvent::parse(r#"{"type":"error","message":"grader crashed"}"#).unwrap();
        assert_eq!(
            event,
            GradingEvent::Error {
                message: "grader crashed".into()
            }
        );
    }

    #[test]
    fn unknown_discriminant_is_a_decode_error() {
        assert!(GradingEvent::parse(r#"{"type":"heartbeat"}"#).is_err());
        assert!(GradingEvent::parse("not json").is_err());
    }
}
