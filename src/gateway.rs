//! Inference gateway abstraction
//!
//! The gateway turns a (question, answer) pair into a follow-up question.
//! Sessions only see this trait, so tests swap in mocks.

mod error;
mod http;
mod types;

#[allow(unused_imports)] // Public API re-exports
pub use error::{GatewayError, GatewayErrorKind};
pub use http::HttpGateway;
pub use types::{FollowUpRequest, FollowUpResponse};

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Common interface for follow-up providers
#[async_trait]
pub trait InferenceGateway: Send + Sync {
    /// Send one answered question and return the backend's JSON reply as-is
    async fn request_json(&self, request: &FollowUpRequest) -> Result<Value, GatewayError>;

    /// Request a follow-up question for one answered question
    async fn follow_up(&self, request: &FollowUpRequest) -> Result<FollowUpResponse, GatewayError> {
        let body = self.request_json(request).await?;
        serde_json::from_value(body).map_err(|e| {
            GatewayError::invalid_body(format!("Failed to parse gateway response: {e}"))
        })
    }

    /// Where requests go, for logs
    fn endpoint(&self) -> &str;
}

#[async_trait]
impl<T: InferenceGateway + ?Sized> InferenceGateway for Arc<T> {
    async fn request_json(&self, request: &FollowUpRequest) -> Result<Value, GatewayError> {
        (**self).request_json(request).await
    }

    async fn follow_up(&self, request: &FollowUpRequest) -> Result<FollowUpResponse, GatewayError> {
        (**self).follow_up(request).await
    }

    fn endpoint(&self) -> &str {
        (**self).endpoint()
    }
}

/// Logging wrapper for gateways
pub struct LoggingGateway {
    inner: Arc<dyn InferenceGateway>,
    endpoint: String,
}

impl LoggingGateway {
    pub fn new(inner: Arc<dyn InferenceGateway>) -> Self {
        let endpoint = inner.endpoint().to_string();
        Self { inner, endpoint }
    }
}

#[async_trait]
impl InferenceGateway for LoggingGateway {
    async fn request_json(&self, request: &FollowUpRequest) -> Result<Value, GatewayError> {
        let start = std::time::Instant::now();
        let result = self.inner.request_json(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(body) => {
                tracing::info!(
                    endpoint = %self.endpoint,
                    duration_ms = %duration.as_millis(),
                    has_follow_up = body.get("followUpQuestion").is_some_and(serde_json::Value::is_string),
                    "Follow-up request completed"
                );
            }
            Err(e) => {
                tracing::warn!(
                    endpoint = %self.endpoint,
                    duration_ms = %duration.as_millis(),
                    kind = e.kind.as_str(),
                    error = %e.message,
                    "Follow-up request failed"
                );
            }
        }

        result
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}
