//! `/inference`: generate a follow-up question with the completion provider

use super::error::AppError;
use super::types::QuestionAnswerBody;
use super::AppState;
use crate::gateway::FollowUpResponse;
use crate::llm::CompletionRequest;
use crate::prompt::{build_follow_up_prompt, clean_follow_up};
use axum::body::Bytes;
use axum::extract::State;
use axum::Json;

pub async fn generate_follow_up(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<FollowUpResponse>, AppError> {
    let Some(llm) = state.llm.clone() else {
        return Err(AppError::NotFound("No completion provider configured".to_string()));
    };

    let request = QuestionAnswerBody::parse(&body)
        .ok_or_else(|| AppError::BadRequest("question and answer are required".to_string()))?;

    let prompt = build_follow_up_prompt(&request.question, &request.answer);
    let completion = llm
        .complete(&CompletionRequest::follow_up(prompt))
        .await
        .map_err(|e| AppError::BadGateway(format!("Completion failed: {e}")))?;

    Ok(Json(FollowUpResponse::new(clean_follow_up(&completion.text))))
}
