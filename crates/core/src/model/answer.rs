use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

use crate::error::DecodeError;
use crate::model::ids::QuestionId;
use crate::model::question::QuestionKind;

//
// ─── ANSWER VALUES ─────────────────────────────────────────────────────────────
//

/// One matched left/right pairing of a matching question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPair {
    pub left: String,
    pub right: String,
}

impl MatchPair {
    /// Decode a JSON-encoded pair list, as stored by older clients that
    /// serialized matching answers to a string before posting.
    ///
    /// Callers that want the lenient legacy behavior apply
    /// `.unwrap_or_default()` at the boundary; the decode itself is explicit.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError` when the text is not a JSON pair list.
    pub fn decode_list(text: &str) -> Result<Vec<MatchPair>, DecodeError> {
        serde_json::from_str(text).map_err(|e| DecodeError::json("matching answer", e))
    }
}

/// The learner's answer for one question, discriminated by question kind.
///
/// Serialization to the backend's raw wire shapes (string / array / bool /
/// pair list) is handled exhaustively in `to_wire`/`from_wire` so no other
/// layer needs runtime shape checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AnswerValue {
    /// Selected option label of a single-choice question.
    Choice(String),
    /// Selected option labels of a multiple-choice question. Order is not
    /// significant; membership is toggled, never duplicated.
    Choices(Vec<String>),
    /// True/false answer.
    Flag(bool),
    /// Free text for fill-blank and essay questions.
    Text(String),
    /// Pairings for a matching question.
    Matching(Vec<MatchPair>),
}

impl AnswerValue {
    /// Serialize into the backend's raw value shape.
    #[must_use]
    pub fn to_wire(&self) -> Value {
        match self {
            AnswerValue::Choice(label) => json!(label),
            AnswerValue::Choices(labels) => json!(labels),
            AnswerValue::Flag(flag) => json!(flag),
            AnswerValue::Text(text) => json!(text),
            AnswerValue::Matching(pairs) => json!(pairs),
        }
    }

    /// Rebuild a typed answer from a raw wire value, using the question kind
    /// as the discriminant.
    ///
    /// Matching answers additionally accept the legacy string encoding; a
    /// malformed legacy payload is an error the caller defaults to empty.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError::UnexpectedShape` when the value does not match
    /// the kind's expected shape.
    pub fn from_wire(kind: QuestionKind, value: &Value) -> Result<Self, DecodeError> {
        match kind {
            QuestionKind::SingleChoice => value
                .as_str()
                .map(|s| AnswerValue::Choice(s.to_owned()))
                .ok_or(DecodeError::UnexpectedShape {
                    context: "single-choice answer",
                }),
            QuestionKind::MultipleChoice => value
                .as_array()
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_owned)
                        .collect()
                })
                .map(AnswerValue::Choices)
                .ok_or(DecodeError::UnexpectedShape {
                    context: "multiple-choice answer",
                }),
            QuestionKind::TrueFalse => {
                value
                    .as_bool()
                    .map(AnswerValue::Flag)
                    .ok_or(DecodeError::UnexpectedShape {
                        context: "true-false answer",
                    })
            }
            QuestionKind::FillBlank | QuestionKind::Essay => value
                .as_str()
                .map(|s| AnswerValue::Text(s.to_owned()))
                .ok_or(DecodeError::UnexpectedShape {
                    context: "text answer",
                }),
            QuestionKind::Matching => match value {
                Value::String(text) => MatchPair::decode_list(text).map(AnswerValue::Matching),
                other => serde_json::from_value(other.clone())
                    .map(AnswerValue::Matching)
                    .map_err(|e| DecodeError::json("matching answer", e)),
            },
        }
    }
}

//
// ─── ANSWER SHEET ──────────────────────────────────────────────────────────────
//

/// In-memory mapping from question id to the learner's current answer.
///
/// Entries are only ever replaced, never removed; a question the learner has
/// not visited is simply absent. Serialization always carries the full
/// current mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnswerSheet {
    entries: BTreeMap<QuestionId, AnswerValue>,
}

impl AnswerSheet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn get(&self, question: QuestionId) -> Option<&AnswerValue> {
        self.entries.get(&question)
    }

    /// Replace (not merge) the answer for one question, preserving all other
    /// entries. Last write wins per key.
    pub fn set(&mut self, question: QuestionId, value: AnswerValue) {
        self.entries.insert(question, value);
    }

    /// Toggle membership of one option label in a multiple-choice answer:
    /// added if absent, removed if present. A non-`Choices` prior value is
    /// replaced by a fresh single-member set.
    pub fn toggle_choice(&mut self, question: QuestionId, label: &str) {
        let next = match self.entries.get(&question) {
            Some(AnswerValue::Choices(labels)) => {
                let mut labels = labels.clone();
                if let Some(pos) = labels.iter().position(|l| l == label) {
                    labels.remove(pos);
                } else {
                    labels.push(label.to_owned());
                }
                AnswerValue::Choices(labels)
            }
            _ => AnswerValue::Choices(vec![label.to_owned()]),
        };
        self.entries.insert(question, next);
    }

    pub fn iter(&self) -> impl Iterator<Item = (QuestionId, &AnswerValue)> {
        self.entries.iter().map(|(id, value)| (*id, value))
    }

    /// Serialize the full mapping into the wire object posted on autosave
    /// and submit, keyed by stringified question id. Only questions actually
    /// answered appear.
    #[must_use]
    pub fn to_wire(&self) -> Value {
        let mut object = Map::with_capacity(self.entries.len());
        for (question, value) in &self.entries {
            object.insert(question.to_string(), value.to_wire());
        }
        Value::Object(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(id: u64) -> QuestionId {
        QuestionId::new(id)
    }

    #[test]
    fn set_replaces_prior_value_last_write_wins() {
        let mut sheet = AnswerSheet::new();
        sheet.set(q(1), AnswerValue::Choice("A".into()));
        sheet.set(q(2), AnswerValue::Text("draft".into()));
        sheet.set(q(1), AnswerValue::Choice("B".into()));
        sheet.set(q(1), AnswerValue::Choice("C".into()));

        assert_eq!(sheet.len(), 2);
        assert_eq!(sheet.get(q(1)), Some(&AnswerValue::Choice("C".into())));
        assert_eq!(sheet.get(q(2)), Some(&AnswerValue::Text("draft".into())));
    }

    #[test]
    fn toggle_adds_then_removes_membership() {
        let mut sheet = AnswerSheet::new();
        sheet.toggle_choice(q(3), "A");
        sheet.toggle_choice(q(3), "C");
        sheet.toggle_choice(q(3), "A");

        assert_eq!(sheet.get(q(3)), Some(&AnswerValue::Choices(vec!["C".into()])));
    }

    #[test]
    fn wire_payload_contains_only_answered_keys() {
        let mut sheet = AnswerSheet::new();
        sheet.set(q(1), AnswerValue::Choice("B".into()));
        sheet.set(q(4), AnswerValue::Flag(true));
        sheet.set(
            q(6),
            AnswerValue::Matching(vec![MatchPair {
                left: "ox".into(),
                right: "herd".into(),
            }]),
        );

        let wire = sheet.to_wire();
        let object = wire.as_object().unwrap();
        assert_eq!(object.len(), 3);
        assert_eq!(object["1"], serde_json::json!("B"));
        assert_eq!(object["4"], serde_json::json!(true));
        assert_eq!(
            object["6"],
            serde_json::json!([{ "left": "ox", "right": "herd" }])
        );
        assert!(!object.contains_key("2"));
    }

    #[test]
    fn from_wire_rebuilds_by_kind() {
        let value = AnswerValue::from_wire(
            QuestionKind::MultipleChoice,
            &serde_json::json!(["A", "D"]),
        )
        .unwrap();
        assert_eq!(value, AnswerValue::Choices(vec!["A".into(), "D".into()]));

        let err = AnswerValue::from_wire(QuestionKind::TrueFalse, &serde_json::json!("yes"));
        assert!(err.is_err());
    }

    #[test]
    fn legacy_matching_string_decodes_or_defaults_empty() {
        let ok = AnswerValue::from_wire(
            QuestionKind::Matching,
            &serde_json::json!("[{\"left\":\"a\",\"right\":\"b\"}]"),
        )
        .unwrap();
        assert_eq!(
            ok,
            AnswerValue::Matching(vec![MatchPair {
                left: "a".into(),
                right: "b".into()
            }])
        );

        // The documented default policy at the boundary: malformed -> empty.
        let pairs = MatchPair::decode_list("{not json").unwrap_or_default();
        assert!(pairs.is_empty());
    }
}
