//! API request and response types

use crate::gateway::FollowUpRequest;
use crate::state_machine::Session;
use serde::{Deserialize, Serialize};

/// Session snapshot as returned to clients
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: String,
    pub session: Session,
    /// Whether the submit control should be enabled
    pub can_submit: bool,
}

impl SessionResponse {
    pub fn new(id: impl Into<String>, session: Session) -> Self {
        Self {
            id: id.into(),
            can_submit: session.can_submit(),
            session,
        }
    }
}

/// Request to replace the draft answer
#[derive(Debug, Deserialize)]
pub struct DraftRequest {
    pub text: String,
}

/// Response for queued session actions
#[derive(Debug, Serialize)]
pub struct QueuedResponse {
    pub queued: bool,
}

/// Body of `POST /api/inference` and `POST /inference`.
///
/// Fields are optional here so a missing one maps to a 400 with a JSON body
/// instead of an extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub struct QuestionAnswerBody {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
}

impl QuestionAnswerBody {
    /// Parse a JSON object body carrying both string fields
    pub fn parse(body: &[u8]) -> Option<FollowUpRequest> {
        let value = serde_json::from_slice::<serde_json::Value>(body)
            .ok()
            .filter(serde_json::Value::is_object)?;
        serde_json::from_value::<Self>(value).ok()?.into_request()
    }

    fn into_request(self) -> Option<FollowUpRequest> {
        Some(FollowUpRequest::new(self.question?, self.answer?))
    }
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
