//! Process-wide exam session context: the learner record and auth token,
//! read once at session start through an injected store instead of ad hoc
//! key-value lookups scattered across components.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use exam_core::model::LearnerId;

/// The learner identity persisted between reloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamLearner {
    pub id: LearnerId,
    pub name: String,
}

/// Resolved session context for one exam-taking visit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub learner: ExamLearner,
    pub token: String,
}

/// Read/clear access to the locally persisted learner record and token.
///
/// `load` returns `None` both when nothing is stored and when the stored
/// record is malformed; a corrupt value is discarded, never a crash.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Option<SessionContext>;
    fn clear(&self);
}

/// Key-value credential store backed by process memory, standing in for the
/// host's persistent storage.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    learner_json: Mutex<Option<String>>,
    token: Mutex<Option<String>>,
}

impl InMemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with a valid learner record and token already present.
    #[must_use]
    pub fn signed_in(learner: &ExamLearner, token: impl Into<String>) -> Self {
        let store = Self::new();
        if let Ok(json) = serde_json::to_string(learner) {
            store.put_raw(&json, token);
        }
        store
    }

    /// Seed the raw stored values directly; the learner record may be
    /// arbitrary (possibly corrupt) text.
    pub fn put_raw(&self, learner_json: &str, token: impl Into<String>) {
        if let Ok(mut guard) = self.learner_json.lock() {
            *guard = Some(learner_json.to_owned());
        }
        if let Ok(mut guard) = self.token.lock() {
            *guard = Some(token.into());
        }
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn load(&self) -> Option<SessionContext> {
        let token = self.token.lock().ok()?.clone()?;
        let raw = self.learner_json.lock().ok()?.clone()?;
        match serde_json::from_str::<ExamLearner>(&raw) {
            Ok(learner) => Some(SessionContext { learner, token }),
            Err(_) => {
                // corrupt record: discard and behave as signed out
                if let Ok(mut guard) = self.learner_json.lock() {
                    *guard = None;
                }
                None
            }
        }
    }

    fn clear(&self) {
        if let Ok(mut guard) = self.learner_json.lock() {
            *guard = None;
        }
        if let Ok(mut guard) = self.token.lock() {
            *guard = None;
        }
    }
}
