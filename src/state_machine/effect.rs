//! Effects produced by state transitions

use crate::gateway::FollowUpRequest;
use crate::state_machine::state::{Session, Status, Turn};

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Ask the inference gateway for a follow-up question
    RequestFollowUp {
        generation: u64,
        request: FollowUpRequest,
    },

    /// A turn was appended to the transcript
    NotifyTurn { turn: Turn },

    /// Status changed
    NotifyStatus { status: Status },

    /// Session was cleared back to its initial state
    NotifyReset { session: Session },
}

impl Effect {
    pub fn request_follow_up(
        generation: u64,
        question: impl Into<String>,
        answer: impl Into<String>,
    ) -> Self {
        Effect::RequestFollowUp {
            generation,
            request: FollowUpRequest::new(question, answer),
        }
    }

    pub fn notify_turn(turn: Turn) -> Self {
        Effect::NotifyTurn { turn }
    }

    pub fn notify_status(status: Status) -> Self {
        Effect::NotifyStatus { status }
    }
}
