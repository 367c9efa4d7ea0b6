use std::env;

use futures_util::StreamExt;
use reqwest::header::ACCEPT;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tokio::sync::mpsc;
use tracing::warn;

use exam_core::model::{
    AnswerSheet, AnswerValue, ExamId, FeedbackVisibility, LearnerId, Question, QuestionId,
    QuestionKind,
};

use crate::api::{BackendError, ExamBackend, SubmissionStatus, TakePaper};
use crate::sse::{ProgressStream, SseParser};

/// Environment-driven configuration for the HTTP backend.
#[derive(Clone, Debug)]
pub struct BackendConfig {
    pub base_url: String,
}

impl BackendConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let base_url = env::var("EXAM_API_BASE_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8080/api".into());
        Self { base_url }
    }
}

/// `reqwest`-backed implementation of the exam backend boundary.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpBackend {
    #[must_use]
    pub fn new(config: BackendConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url,
            token: None,
        }
    }

    /// Attach the learner's bearer token to every request.
    #[must_use]
    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Map a response into the error taxonomy: 401 is authentication
    /// failure, any other non-success surfaces the server `message` field
    /// or a generic fallback.
    async fn checked(response: Response) -> Result<Response, BackendError> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(BackendError::Unauthorized);
        }
        if !status.is_success() {
            let message = response
                .json::<ServerMessage>()
                .await
                .ok()
                .and_then(|m| m.message)
                .unwrap_or_else(|| format!("request failed with status {status}"));
            return Err(BackendError::Status { status, message });
        }
        Ok(response)
    }
}

#[derive(Debug, Deserialize)]
struct ServerMessage {
    message: Option<String>,
}

/// Wire shape of the exam-for-taking response: answers arrive as raw JSON
/// values keyed by stringified question id and are re-typed here.
#[derive(Debug, Deserialize)]
struct RawTakePaper {
    exam_id: ExamId,
    title: String,
    duration_seconds: u32,
    #[serde(default)]
    remaining_seconds: Option<u32>,
    feedback: FeedbackVisibility,
    questions: Vec<Question>,
    #[serde(default)]
    saved_answers: Map<String, Value>,
}

impl RawTakePaper {
    fn into_paper(self) -> TakePaper {
        let saved_answers = decode_saved_answers(&self.questions, &self.saved_answers);
        TakePaper {
            exam_id: self.exam_id,
            title: self.title,
            duration_seconds: self.duration_seconds,
            remaining_seconds: self.remaining_seconds,
            feedback: self.feedback,
            questions: self.questions,
            saved_answers,
        }
    }
}

/// Re-type previously autosaved answers through the tagged-union boundary.
///
/// Unknown question ids and unparseable keys are dropped. A malformed
/// matching payload decodes to the empty pairing (the documented legacy
/// default); any other malformed value is dropped with a warning rather
/// than failing the whole load.
fn decode_saved_answers(questions: &[Question], raw: &Map<String, Value>) -> AnswerSheet {
    let mut sheet = AnswerSheet::new();
    for (key, value) in raw {
        let Ok(question_id) = key.parse::<QuestionId>() else {
            continue;
        };
        let Some(kind) = questions
            .iter()
            .find(|q| q.id() == question_id)
            .map(Question::kind)
        else {
            continue;
        };
        match AnswerValue::from_wire(kind, value) {
            Ok(answer) => sheet.set(question_id, answer),
            Err(_) if kind == QuestionKind::Matching => {
                sheet.set(question_id, AnswerValue::Matching(Vec::new()));
            }
            Err(err) => {
                warn!(question = %question_id, error = %err, "dropping malformed saved answer");
            }
        }
    }
    sheet
}

#[async_trait::async_trait]
impl ExamBackend for HttpBackend {
    async fn fetch_paper(&self, exam: ExamId) -> Result<TakePaper, BackendError> {
        let response = self
            .authorize(self.client.get(self.url(&format!("/exams/{exam}/take"))))
            .send()
            .await?;
        let raw: RawTakePaper = Self::checked(response).await?.json().await?;
        Ok(raw.into_paper())
    }

    async fn fetch_submission_status(
        &self,
        exam: ExamId,
        learner: LearnerId,
    ) -> Result<SubmissionStatus, BackendError> {
        let response = self
            .authorize(
                self.client
                    .get(self.url(&format!("/exams/{exam}/submissions/{learner}"))),
            )
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(SubmissionStatus::default());
        }
        Ok(Self::checked(response).await?.json().await?)
    }

    async fn save_answers(&self, exam: ExamId, answers: &AnswerSheet) -> Result<(), BackendError> {
        let response = self
            .authorize(self.client.post(self.url(&format!("/exams/{exam}/answers"))))
            .json(&json!({ "answers": answers.to_wire() }))
            .send()
            .await?;
        Self::checked(response).await?;
        Ok(())
    }

    async fn submit_answers(
        &self,
        exam: ExamId,
        answers: &AnswerSheet,
    ) -> Result<(), BackendError> {
        let response = self
            .authorize(self.client.post(self.url(&format!("/exams/{exam}/submit"))))
            .json(&json!({ "answers": answers.to_wire() }))
            .send()
            .await?;
        Self::checked(response).await?;
        Ok(())
    }

    async fn open_progress_stream(
        &self,
        exam: ExamId,
        learner: LearnerId,
        force_regenerate: bool,
    ) -> Result<ProgressStream, BackendError> {
        let mut request = self
            .authorize(
                self.client
                    .get(self.url(&format!("/exams/{exam}/grading/stream"))),
            )
            .header(ACCEPT, "text/event-stream")
            .query(&[("learner", learner.to_string())]);
        if force_regenerate {
            request = request.query(&[("force", "true")]);
        }

        let response = Self::checked(request.send().await?).await?;

        let (tx, rx) = mpsc::channel(16);
        let task = tokio::spawn(async move {
            let mut parser = SseParser::new();
            let mut body = response.bytes_stream();
            while let Some(chunk) = body.next().await {
                match chunk {
                    Ok(bytes) => {
                        let text = String::from_utf8_lossy(&bytes);
                        for payload in parser.push(&text) {
                            if tx.send(Ok(payload)).await.is_err() {
                                // consumer closed the stream
                                return;
                            }
                        }
                    }
                    Err(err) => {
                        let _ = tx.send(Err(BackendError::Http(err))).await;
                        return;
                    }
                }
            }
        });

        Ok(ProgressStream::new(rx, Some(task.abort_handle())))
    }

    async fn sign_out(&self, learner: LearnerId) -> Result<(), BackendError> {
        let response = self
            .authorize(self.client.post(self.url("/auth/exam-logout")))
            .json(&json!({ "learner": learner }))
            .send()
            .await?;
        Self::checked(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{MatchPair, QuestionId};

    fn questions() -> Vec<Question> {
        vec![
            Question::new(QuestionId::new(1), QuestionKind::SingleChoice, "q1", 5),
            Question::new(QuestionId::new(2), QuestionKind::Matching, "q2", 10),
            Question::new(QuestionId::new(3), QuestionKind::TrueFalse, "q3", 2),
        ]
    }

    #[test]
    fn retypes_saved_answers_by_question_kind() {
        let mut raw = Map::new();
        raw.insert("1".into(), json!("B"));
        raw.insert("3".into(), json!(false));

        let sheet = decode_saved_answers(&questions(), &raw);
        assert_eq!(
            sheet.get(QuestionId::new(1)),
            Some(&AnswerValue::Choice("B".into()))
        );
        assert_eq!(
            sheet.get(QuestionId::new(3)),
            Some(&AnswerValue::Flag(false))
        );
    }

    #[test]
    fn malformed_matching_defaults_to_empty_pairing() {
        let mut raw = Map::new();
        raw.insert("2".into(), json!("{broken"));

        let sheet = decode_saved_answers(&questions(), &raw);
        assert_eq!(
            sheet.get(QuestionId::new(2)),
            Some(&AnswerValue::Matching(Vec::new()))
        );
    }

    #[test]
    fn legacy_matching_string_is_decoded() {
        let mut raw = Map::new();
        raw.insert("2".into(), json!("[{\"left\":\"a\",\"right\":\"b\"}]"));

        let sheet = decode_saved_answers(&questions(), &raw);
        assert_eq!(
            sheet.get(QuestionId::new(2)),
            Some(&AnswerValue::Matching(vec![MatchPair {
                left: "a".into(),
                right: "b".into()
            }]))
        );
    }

    #[test]
    fn unknown_and_malformed_entries_are_dropped() {
        let mut raw = Map::new();
        raw.insert("99".into(), json!("stray"));
        raw.insert("not-an-id".into(), json!("stray"));
        raw.insert("3".into(), json!("yes"));

        let sheet = decode_saved_answers(&questions(), &raw);
        assert!(sheet.is_empty());
    }
}
