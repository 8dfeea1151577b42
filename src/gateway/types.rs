//! Wire types for the follow-up exchange

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Outbound payload: the question that was posed and the user's answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUpRequest {
    pub question: String,
    pub answer: String,
}

impl FollowUpRequest {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Inbound payload from the inference service
///
/// The body must be a JSON object. A missing or non-string
/// `followUpQuestion` becomes `None`; the state machine substitutes
/// placeholder text for it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FollowUpResponse {
    #[serde(rename = "followUpQuestion", skip_serializing_if = "Option::is_none")]
    pub follow_up_question: Option<String>,
}

impl FollowUpResponse {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            follow_up_question: Some(question.into()),
        }
    }

    pub fn into_question(self) -> Option<String> {
        self.follow_up_question
    }
}

impl<'de> Deserialize<'de> for FollowUpResponse {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Only objects are accepted; arrays would otherwise match field order
        let mut body = Map::<String, Value>::deserialize(deserializer)?;
        let follow_up_question = match body.remove("followUpQuestion") {
            Some(Value::String(s)) => Some(s),
            _ => None,
        };
        Ok(Self { follow_up_question })
    }
}
