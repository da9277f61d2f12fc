use axum::extract::{Json, State};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::auth::AuthUser;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

/// `POST /api/assistant/chat`: one message in, the model's reply verbatim.
pub async fn chat_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let message = payload.message.trim();
    if message.is_empty() {
        return Err(AppError::BadRequest("Message is required".to_string()));
    }

    tracing::debug!("Chat message from {} ({} chars)", auth.user_id, message.len());

    let reply = state
        .analysis
        .chat(message)
        .await
        .map_err(|e| AppError::internal("Chat failed", e))?;

    Ok(Json(ChatResponse { reply }))
}
