//! Runtime for executing sessions
//!
//! Every session is driven by its own task consuming an event queue, so the
//! events of one session are handled strictly in order. Observers read the
//! latest snapshot from a `watch` channel and receive deltas on a
//! `broadcast` channel.

mod executor;

#[cfg(test)]
pub mod testing;

pub use executor::SessionRuntime;

use crate::gateway::InferenceGateway;
use crate::state_machine::{Event, Session, SessionContext, Status, Turn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Errors surfaced to callers of the runtime
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Session not found: {0}")]
    NotFound(String),
    #[error("Session runtime has stopped")]
    Closed,
}

/// Events sent to stream subscribers
#[derive(Debug, Clone)]
pub enum SseEvent {
    Init { session: Session },
    Turn { turn: Turn },
    Status { status: Status },
    Reset { session: Session },
    Error { message: String },
}

/// Handle to interact with a running session
#[derive(Clone)]
pub struct SessionHandle {
    pub event_tx: mpsc::Sender<Event>,
    pub broadcast_tx: broadcast::Sender<SseEvent>,
    pub snapshot_rx: watch::Receiver<Session>,
    shutdown: CancellationToken,
    /// Last time a client sent, subscribed or looked the session up
    last_activity: Arc<Mutex<Instant>>,
}

impl SessionHandle {
    /// Latest committed state
    pub fn snapshot(&self) -> Session {
        self.snapshot_rx.borrow().clone()
    }

    pub async fn send(&self, event: Event) -> Result<(), RuntimeError> {
        if self.is_closed() {
            return Err(RuntimeError::Closed);
        }
        self.touch();
        self.event_tx
            .send(event)
            .await
            .map_err(|_| RuntimeError::Closed)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SseEvent> {
        self.touch();
        self.broadcast_tx.subscribe()
    }

    fn touch(&self) {
        *self
            .last_activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.last_activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .elapsed()
    }

    /// Whether any stream is attached
    fn has_subscribers(&self) -> bool {
        self.broadcast_tx.receiver_count() > 0
    }

    /// Stop the runtime; in-flight results are dropped
    pub fn close(&self) {
        self.shutdown.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

/// Sessions untouched for this long with no stream attached are closed
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Manager for all live sessions
pub struct SessionManager {
    gateway: Arc<dyn InferenceGateway>,
    initial_question: String,
    idle_timeout: Duration,
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionManager {
    pub fn new(gateway: Arc<dyn InferenceGateway>, initial_question: impl Into<String>) -> Self {
        Self {
            gateway,
            initial_question: initial_question.into(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Create a fresh, not-started session and start its runtime
    pub async fn create(&self) -> (String, SessionHandle) {
        let session_id = uuid::Uuid::new_v4().to_string();
        let context = SessionContext::new(&session_id, &self.initial_question);
        let handle = SessionRuntime::spawn(context, self.gateway.clone());

        self.sessions
            .write()
            .await
            .insert(session_id.clone(), handle.clone());
        tracing::info!(session_id = %session_id, "Session created");

        (session_id, handle)
    }

    /// Look a session up; counts as client activity
    pub async fn get(&self, session_id: &str) -> Result<SessionHandle, RuntimeError> {
        let handle = self
            .sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| RuntimeError::NotFound(session_id.to_string()))?;
        handle.touch();
        Ok(handle)
    }

    /// Send an event to a session
    pub async fn send_event(&self, session_id: &str, event: Event) -> Result<(), RuntimeError> {
        self.get(session_id).await?.send(event).await
    }

    /// Destroy a session; nothing about it is kept
    pub async fn close(&self, session_id: &str) -> Result<(), RuntimeError> {
        let handle = self
            .sessions
            .write()
            .await
            .remove(session_id)
            .ok_or_else(|| RuntimeError::NotFound(session_id.to_string()))?;
        handle.close();
        tracing::info!(session_id = %session_id, "Session closed");
        Ok(())
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Close sessions with no attached stream and no activity within the
    /// idle timeout. Returns how many were closed.
    pub async fn evict_idle(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let idle: Vec<String> = sessions
            .iter()
            .filter(|(_, handle)| {
                !handle.has_subscribers() && handle.idle_for() >= self.idle_timeout
            })
            .map(|(id, _)| id.clone())
            .collect();

        for session_id in &idle {
            if let Some(handle) = sessions.remove(session_id) {
                handle.close();
                tracing::info!(session_id = %session_id, "Evicted idle session");
            }
        }
        idle.len()
    }

    /// Periodically evict idle sessions until the manager is dropped
    pub fn spawn_reaper(self: &Arc<Self>) -> JoinHandle<()> {
        let manager = Arc::downgrade(self);
        let period = (self.idle_timeout / 2).max(Duration::from_millis(10));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(manager) = manager.upgrade() else {
                    break;
                };
                manager.evict_idle().await;
            }
        })
    }

    /// Close every session, used on server shutdown
    pub async fn close_all(&self) {
        let mut sessions = self.sessions.write().await;
        for handle in sessions.values() {
            handle.close();
        }
        sessions.clear();
    }
}
