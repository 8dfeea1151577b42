//! HTTP API
//!
//! Session routes drive the per-session runtimes; `/api/inference` relays to
//! the inference backend; `/inference` is the backend itself when a
//! completion provider is configured.

mod error;
mod handlers;
mod inference;
mod relay;
mod sse;
mod types;

pub use handlers::create_router;

use crate::gateway::InferenceGateway;
use crate::llm::LlmService;
use crate::runtime::SessionManager;
use std::sync::Arc;
use std::time::Duration;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    /// Used by the relay route; the same gateway sessions use
    pub gateway: Arc<dyn InferenceGateway>,
    pub llm: Option<Arc<dyn LlmService>>,
}

impl AppState {
    pub fn new(
        gateway: Arc<dyn InferenceGateway>,
        initial_question: impl Into<String>,
        session_idle: Duration,
        llm: Option<Arc<dyn LlmService>>,
    ) -> Self {
        let sessions =
            SessionManager::new(gateway.clone(), initial_question).with_idle_timeout(session_idle);
        Self {
            sessions: Arc::new(sessions),
            gateway,
            llm,
        }
    }
}
