use serde::{Deserialize, Serialize};

use crate::model::ids::QuestionId;

//
// ─── QUESTION TYPES ────────────────────────────────────────────────────────────
//

/// Discriminant for the answer shape a question expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    SingleChoice,
    MultipleChoice,
    TrueFalse,
    FillBlank,
    Matching,
    Essay,
}

impl QuestionKind {
    /// True for kinds whose answer is one or more of a fixed option list.
    #[must_use]
    pub fn is_choice(&self) -> bool {
        matches!(self, Self::SingleChoice | Self::MultipleChoice)
    }
}

/// One selectable option of a choice question, in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub label: String,
    pub text: String,
}

/// A question as fetched for taking. Read-only for the session controller;
/// score and ordering edits belong to the authoring flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    id: QuestionId,
    kind: QuestionKind,
    prompt: String,
    #[serde(default)]
    options: Vec<ChoiceOption>,
    #[serde(default)]
    left_items: Vec<String>,
    #[serde(default)]
    right_items: Vec<String>,
    points: u32,
    #[serde(default)]
    images: Vec<String>,
}

impl Question {
    #[must_use]
    pub fn new(id: QuestionId, kind: QuestionKind, prompt: impl Into<String>, points: u32) -> Self {
        Self {
            id,
            kind,
            prompt: prompt.into(),
            options: Vec::new(),
            left_items: Vec::new(),
            right_items: Vec::new(),
            points,
            images: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: Vec<ChoiceOption>) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_matching_items(mut self, left: Vec<String>, right: Vec<String>) -> Self {
        self.left_items = left;
        self.right_items = right;
        self
    }

    #[must_use]
    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        self.kind
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[ChoiceOption] {
        &self.options
    }

    #[must_use]
    pub fn left_items(&self) -> &[String] {
        &self.left_items
    }

    #[must_use]
    pub fn right_items(&self) -> &[String] {
        &self.right_items
    }

    #[must_use]
    pub fn points(&self) -> u32 {
        self.points
    }

    #[must_use]
    pub fn images(&self) -> &[String] {
        &self.images
    }
}
