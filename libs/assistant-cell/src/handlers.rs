// libs/assistant-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    Json,
};
use tracing::info;

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::AppJson;

use crate::models::{AssistantError, ChatReply, ChatRequest};
use crate::services::RuleBasedResponder;

impl From<AssistantError> for AppError {
    fn from(err: AssistantError) -> Self {
        match err {
            AssistantError::ValidationError(msg) => AppError::ValidationError(msg),
            AssistantError::Pattern(e) => AppError::Internal(e.to_string()),
        }
    }
}

#[axum::debug_handler]
pub async fn chat(
    State(responder): State<Arc<RuleBasedResponder>>,
    Extension(user): Extension<User>,
    AppJson(request): AppJson<ChatRequest>,
) -> Result<Json<ChatReply>, AppError> {
    let reply = responder.respond(&request.message)?;

    if reply.urgent {
        info!("AUDIT: urgent assistant reply sent to user {}", user.id);
    }

    Ok(Json(reply))
}
