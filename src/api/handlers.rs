//! HTTP request handlers

use super::error::AppError;
use super::inference::generate_follow_up;
use super::relay::{method_not_allowed, relay_inference};
use super::sse::sse_stream;
use super::types::{DraftRequest, QueuedResponse, SessionResponse};
use super::AppState;
use crate::runtime::SseEvent;
use crate::state_machine::Event;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        // Session lifecycle
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session).delete(delete_session))
        // Session actions
        .route("/api/sessions/:id/start", post(start_session))
        .route("/api/sessions/:id/draft", put(update_draft))
        .route("/api/sessions/:id/submit", post(submit_answer))
        .route("/api/sessions/:id/reset", post(reset_session))
        // SSE streaming
        .route("/api/sessions/:id/stream", get(stream_session))
        // Relay to the inference backend
        .route(
            "/api/inference",
            post(relay_inference).fallback(method_not_allowed),
        )
        // Version
        .route("/version", get(get_version));

    if state.llm.is_some() {
        router = router.route("/inference", post(generate_follow_up));
    }

    router.with_state(state)
}

// ============================================================
// Session Lifecycle
// ============================================================

async fn create_session(State(state): State<AppState>) -> impl IntoResponse {
    let (id, handle) = state.sessions.create().await;
    (
        StatusCode::CREATED,
        Json(SessionResponse::new(id, handle.snapshot())),
    )
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, AppError> {
    let handle = state.sessions.get(&id).await?;
    Ok(Json(SessionResponse::new(id, handle.snapshot())))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.sessions.close(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================
// Session Actions
// ============================================================

async fn queue(state: &AppState, id: &str, event: Event) -> Result<Json<QueuedResponse>, AppError> {
    state.sessions.send_event(id, event).await?;
    Ok(Json(QueuedResponse { queued: true }))
}

async fn start_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<QueuedResponse>, AppError> {
    queue(&state, &id, Event::start()).await
}

async fn update_draft(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<DraftRequest>,
) -> Result<Json<QueuedResponse>, AppError> {
    queue(&state, &id, Event::update_draft(req.text)).await
}

async fn submit_answer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<QueuedResponse>, AppError> {
    queue(&state, &id, Event::submit()).await
}

async fn reset_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<QueuedResponse>, AppError> {
    queue(&state, &id, Event::Reset).await
}

// ============================================================
// SSE Streaming
// ============================================================

async fn stream_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let handle = state.sessions.get(&id).await?;

    // Subscribe before reading the snapshot so no delta is lost in between
    let broadcast_rx = handle.subscribe();
    let init_event = SseEvent::Init {
        session: handle.snapshot(),
    };

    Ok(sse_stream(init_event, broadcast_rx))
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!("followup-qa ", env!("CARGO_PKG_VERSION"))
}
