//! `/api/inference`: pass-through to the inference backend

use super::error::AppError;
use super::types::QuestionAnswerBody;
use super::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde_json::Value;

/// Forward `{question, answer}` and return the backend's JSON untouched
pub async fn relay_inference(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let request = QuestionAnswerBody::parse(&body)
        .ok_or_else(|| AppError::BadRequest("question and answer are required".to_string()))?;

    match state.gateway.request_json(&request).await {
        Ok(reply) => Ok(Json(reply)),
        Err(e) => {
            tracing::warn!(error = %e, kind = e.kind.as_str(), "Relay request failed");
            Err(AppError::Internal("Failed".to_string()))
        }
    }
}

pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
