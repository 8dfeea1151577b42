//! Events that can occur in a session

use chrono::{DateTime, Utc};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // Client events
    Start {
        at: DateTime<Utc>,
    },
    UpdateDraft {
        text: String,
    },
    Submit {
        at: DateTime<Utc>,
    },
    Reset,

    // Gateway events
    FollowUpReceived {
        /// Generation captured when the request was issued
        generation: u64,
        /// `None` when the response carried no usable follow-up
        follow_up: Option<String>,
        at: DateTime<Utc>,
    },
    FollowUpFailed {
        generation: u64,
        message: String,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn start() -> Self {
        Event::Start { at: Utc::now() }
    }

    pub fn update_draft(text: impl Into<String>) -> Self {
        Event::UpdateDraft { text: text.into() }
    }

    pub fn submit() -> Self {
        Event::Submit { at: Utc::now() }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Event::Start { .. } => "start",
            Event::UpdateDraft { .. } => "update_draft",
            Event::Submit { .. } => "submit",
            Event::Reset => "reset",
            Event::FollowUpReceived { .. } => "follow_up_received",
            Event::FollowUpFailed { .. } => "follow_up_failed",
        }
    }
}
