//! Pure state transition function
//!
//! Given the same session and event this always produces the same result,
//! with no I/O. The runtime executes the returned effects.

use super::state::{Session, Status, Turn, FALLBACK_FOLLOW_UP, REQUEST_FAILED_MESSAGE};
use super::{Effect, Event};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: Session,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: Session) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    /// A documented no-op: same state, nothing to do
    pub fn unchanged(state: &Session) -> Self {
        Self::new(state.clone())
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Session has not been started")]
    NotStarted,
}

/// Pure transition function
pub fn transition(state: &Session, event: Event) -> Result<TransitionResult, TransitionError> {
    match (state.status, event) {
        // ============================================================
        // Reset: available from every status
        // ============================================================
        (_, Event::Reset) => {
            let mut next = Session::new(state.initial_question.clone());
            next.generation = state.generation + 1;
            Ok(TransitionResult::new(next.clone()).with_effect(Effect::NotifyReset { session: next }))
        }

        // ============================================================
        // Start
        // ============================================================
        (Status::NotStarted, Event::Start { at }) => {
            let seed = Turn::system(state.current_question.clone(), at);
            let mut next = state.clone();
            next.transcript = vec![seed.clone()];
            next.status = Status::AwaitingAnswer;
            Ok(TransitionResult::new(next)
                .with_effect(Effect::notify_turn(seed))
                .with_effect(Effect::notify_status(Status::AwaitingAnswer)))
        }

        // Already started: never duplicate the seed turn
        (_, Event::Start { .. }) => Ok(TransitionResult::unchanged(state)),

        // ============================================================
        // Draft editing
        // ============================================================
        (Status::NotStarted, Event::UpdateDraft { .. }) => Err(TransitionError::NotStarted),

        (_, Event::UpdateDraft { text }) => {
            let mut next = state.clone();
            next.pending_answer = text;
            Ok(TransitionResult::new(next))
        }

        // ============================================================
        // Submit
        // ============================================================
        (Status::AwaitingAnswer, Event::Submit { at }) if !state.pending_answer.trim().is_empty() => {
            // The turn keeps the raw draft; trimming only gates the submit
            let answer = Turn::user(state.pending_answer.clone(), at);
            let mut next = state.clone();
            next.transcript.push(answer.clone());
            next.status = Status::Submitting;
            Ok(TransitionResult::new(next)
                .with_effect(Effect::notify_turn(answer))
                .with_effect(Effect::notify_status(Status::Submitting))
                .with_effect(Effect::request_follow_up(
                    state.generation,
                    state.current_question.clone(),
                    state.pending_answer.clone(),
                )))
        }

        // Busy, not started, or blank draft
        (_, Event::Submit { .. }) => Ok(TransitionResult::unchanged(state)),

        // ============================================================
        // Gateway results
        // ============================================================
        (
            Status::Submitting,
            Event::FollowUpReceived {
                generation,
                follow_up,
                at,
            },
        ) if generation == state.generation => {
            let question = follow_up
                .filter(|q| !q.trim().is_empty())
                .unwrap_or_else(|| FALLBACK_FOLLOW_UP.to_string());
            let turn = Turn::system(question.clone(), at);
            let mut next = state.clone();
            next.transcript.push(turn.clone());
            next.current_question = question;
            next.pending_answer.clear();
            next.status = Status::AwaitingAnswer;
            debug_assert_eq!(next.last_question(), Some(next.current_question.as_str()));
            Ok(TransitionResult::new(next)
                .with_effect(Effect::notify_turn(turn))
                .with_effect(Effect::notify_status(Status::AwaitingAnswer)))
        }

        (Status::Submitting, Event::FollowUpFailed { generation, at, .. })
            if generation == state.generation =>
        {
            // Question and draft are kept so the user can resubmit
            let turn = Turn::error(REQUEST_FAILED_MESSAGE, at);
            let mut next = state.clone();
            next.transcript.push(turn.clone());
            next.status = Status::AwaitingAnswer;
            Ok(TransitionResult::new(next)
                .with_effect(Effect::notify_turn(turn))
                .with_effect(Effect::notify_status(Status::AwaitingAnswer)))
        }

        // Stale: issued before a reset, or nothing in flight
        (_, Event::FollowUpReceived { .. } | Event::FollowUpFailed { .. }) => {
            Ok(TransitionResult::unchanged(state))
        }
    }
}
