//! Session state types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Seed question used when no override is configured
pub const DEFAULT_INITIAL_QUESTION: &str = "What is Java?";

/// Shown as the system turn when the gateway returns no usable follow-up
pub const FALLBACK_FOLLOW_UP: &str = "No follow-up question generated.";

/// Shown as the error turn when the gateway call fails
pub const REQUEST_FAILED_MESSAGE: &str =
    "Error generating follow-up question. Please try again.";

// ============================================================================
// Turns
// ============================================================================

/// Who produced a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// A posed question (seed or follow-up)
    System,
    /// A submitted answer
    User,
    /// A failed submission notice
    Error,
}

/// One immutable entry in the transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    fn new(role: Role, text: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            role,
            text: text.into(),
            created_at,
        }
    }

    pub fn system(text: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self::new(Role::System, text, created_at)
    }

    pub fn user(text: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self::new(Role::User, text, created_at)
    }

    pub fn error(text: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self::new(Role::Error, text, created_at)
    }
}

// ============================================================================
// Session
// ============================================================================

/// Where the session is in its answer cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    NotStarted,
    AwaitingAnswer,
    /// One follow-up request is in flight
    Submitting,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::NotStarted => "not_started",
            Status::AwaitingAnswer => "awaiting_answer",
            Status::Submitting => "submitting",
        }
    }
}

/// Full mutable state of one conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub status: Status,
    pub transcript: Vec<Turn>,
    pub current_question: String,
    pub pending_answer: String,
    /// Bumped on every reset; results tagged with an older value are stale
    pub generation: u64,
    pub initial_question: String,
}

impl Session {
    pub fn new(initial_question: impl Into<String>) -> Self {
        let initial_question = initial_question.into();
        Self {
            status: Status::NotStarted,
            transcript: Vec::new(),
            current_question: initial_question.clone(),
            pending_answer: String::new(),
            generation: 0,
            initial_question,
        }
    }

    /// Whether a submit would be accepted right now
    pub fn can_submit(&self) -> bool {
        self.status == Status::AwaitingAnswer && !self.pending_answer.trim().is_empty()
    }

    /// Text of the most recent system turn, if any
    pub fn last_question(&self) -> Option<&str> {
        self.transcript
            .iter()
            .rev()
            .find(|turn| turn.role == Role::System)
            .map(|turn| turn.text.as_str())
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(DEFAULT_INITIAL_QUESTION)
    }
}

/// Immutable configuration for one session runtime
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session_id: String,
    pub initial_question: String,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>, initial_question: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            initial_question: initial_question.into(),
        }
    }
}
