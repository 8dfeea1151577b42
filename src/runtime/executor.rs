//! Session runtime executor

use super::{SessionHandle, SseEvent};
use crate::gateway::InferenceGateway;
use crate::state_machine::{transition, Effect, Event, Session, SessionContext};
use chrono::Utc;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Runtime that owns one session and applies events to it in order
pub struct SessionRuntime<G>
where
    G: InferenceGateway + ?Sized + 'static,
{
    context: SessionContext,
    state: Session,
    gateway: Arc<G>,
    event_rx: mpsc::Receiver<Event>,
    /// Cloned into request tasks so results come back through the queue
    event_tx: mpsc::Sender<Event>,
    snapshot_tx: watch::Sender<Session>,
    broadcast_tx: broadcast::Sender<SseEvent>,
    shutdown: CancellationToken,
}

impl<G> SessionRuntime<G>
where
    G: InferenceGateway + ?Sized + 'static,
{
    /// Start a runtime in the background and return a handle to it
    pub fn spawn(context: SessionContext, gateway: Arc<G>) -> SessionHandle {
        let state = Session::new(context.initial_question.clone());
        let (event_tx, event_rx) = mpsc::channel(32);
        let (broadcast_tx, _) = broadcast::channel(128);
        let (snapshot_tx, snapshot_rx) = watch::channel(state.clone());
        let shutdown = CancellationToken::new();

        let handle = SessionHandle {
            event_tx: event_tx.clone(),
            broadcast_tx: broadcast_tx.clone(),
            snapshot_rx,
            shutdown: shutdown.clone(),
            last_activity: Arc::new(Mutex::new(Instant::now())),
        };

        let runtime = Self {
            context,
            state,
            gateway,
            event_rx,
            event_tx,
            snapshot_tx,
            broadcast_tx,
            shutdown,
        };
        tokio::spawn(runtime.run());

        handle
    }

    pub async fn run(mut self) {
        tracing::info!(session_id = %self.context.session_id, "Starting session runtime");

        loop {
            tokio::select! {
                biased;

                () = self.shutdown.cancelled() => break,

                Some(event) = self.event_rx.recv() => self.process_event(event),

                else => break,
            }
        }

        tracing::info!(session_id = %self.context.session_id, "Session runtime stopped");
    }

    fn process_event(&mut self, event: Event) {
        let event_name = event.name();
        let result_generation = match &event {
            Event::FollowUpReceived { generation, .. } => Some(*generation),
            Event::FollowUpFailed {
                generation,
                message,
                ..
            } => {
                tracing::debug!(
                    session_id = %self.context.session_id,
                    generation,
                    error = %message,
                    "Follow-up request failed"
                );
                Some(*generation)
            }
            _ => None,
        };

        let result = match transition(&self.state, event) {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(
                    session_id = %self.context.session_id,
                    event = event_name,
                    error = %e,
                    "Event rejected"
                );
                let _ = self.broadcast_tx.send(SseEvent::Error {
                    message: e.to_string(),
                });
                return;
            }
        };

        if result.effects.is_empty() && result.new_state == self.state {
            if let Some(generation) = result_generation {
                tracing::debug!(
                    session_id = %self.context.session_id,
                    generation,
                    current_generation = self.state.generation,
                    "Discarding stale follow-up result"
                );
            } else {
                tracing::debug!(
                    session_id = %self.context.session_id,
                    event = event_name,
                    status = self.state.status.as_str(),
                    "Event ignored"
                );
            }
            return;
        }

        self.state = result.new_state;
        self.snapshot_tx.send_replace(self.state.clone());

        for effect in result.effects {
            self.execute_effect(effect);
        }
    }

    fn execute_effect(&self, effect: Effect) {
        match effect {
            Effect::RequestFollowUp {
                generation,
                request,
            } => {
                let gateway = self.gateway.clone();
                let event_tx = self.event_tx.clone();
                let shutdown = self.shutdown.clone();
                let session_id = self.context.session_id.clone();

                tokio::spawn(async move {
                    tracing::debug!(session_id = %session_id, generation, "Requesting follow-up");

                    tokio::select! {
                        biased;

                        () = shutdown.cancelled() => {
                            tracing::debug!(session_id = %session_id, "Session closed, dropping follow-up request");
                        }

                        result = gateway.follow_up(&request) => {
                            let event = match result {
                                Ok(response) => Event::FollowUpReceived {
                                    generation,
                                    follow_up: response.into_question(),
                                    at: Utc::now(),
                                },
                                Err(e) => Event::FollowUpFailed {
                                    generation,
                                    message: e.message,
                                    at: Utc::now(),
                                },
                            };
                            // Receiver is gone only if the session was closed
                            let _ = event_tx.send(event).await;
                        }
                    }
                });
            }

            Effect::NotifyTurn { turn } => {
                let _ = self.broadcast_tx.send(SseEvent::Turn { turn });
            }

            Effect::NotifyStatus { status } => {
                let _ = self.broadcast_tx.send(SseEvent::Status { status });
            }

            Effect::NotifyReset { session } => {
                tracing::info!(
                    session_id = %self.context.session_id,
                    generation = session.generation,
                    "Session reset"
                );
                let _ = self.broadcast_tx.send(SseEvent::Reset { session });
            }
        }
    }
}
