//! Follow-up Q&A server
//!
//! Runs guided question-and-answer sessions: each submitted answer is sent to
//! an inference backend, which returns the next question to ask.

mod api;
mod config;
mod gateway;
mod llm;
mod prompt;
mod runtime;
mod state_machine;

use api::{create_router, AppState};
use config::ServerConfig;
use gateway::{HttpGateway, InferenceGateway, LoggingGateway};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "followup_qa=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = ServerConfig::from_env()?;

    // Inference gateway used by sessions and the relay route
    let endpoint = config.inference_endpoint();
    let http_gateway = HttpGateway::new(&endpoint, config.gateway_timeout)?;
    let gateway: Arc<dyn InferenceGateway> =
        Arc::new(LoggingGateway::new(Arc::new(http_gateway)));
    tracing::info!(
        endpoint = %endpoint,
        timeout_secs = config.gateway_timeout.as_secs(),
        "Inference gateway configured"
    );

    // Optional completion provider backing /inference
    let llm = config.llm.build(config.gateway_timeout)?;
    match &llm {
        Some(service) => {
            tracing::info!(model = %service.model_id(), "Completion provider enabled; serving /inference");
        }
        None => {
            tracing::info!("INFERENCE_LLM_URL not set; /inference disabled");
        }
    }

    // Create application state
    let state = AppState::new(
        gateway,
        config.initial_question.clone(),
        config.session_idle,
        llm,
    );
    let sessions = state.sessions.clone();
    let reaper = sessions.spawn_reaper();
    tracing::info!(idle_secs = config.session_idle.as_secs(), "Idle session reaper started");

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Follow-up Q&A server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!(sessions = sessions.session_count().await, "Closing sessions");
    reaper.abort();
    sessions.close_all().await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
