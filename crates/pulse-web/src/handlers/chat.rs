//! Customer-care chat endpoint.

use axum::{extract::State, Json};
use pulse_common::ClassificationResult;
use pulse_ingestion::store::CHAT_LOG_DATASET;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub user_input: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub bot_response: String,
    pub sentiment: ClassificationResult,
}

/// POST /api/chat
///
/// Replies to the message, classifies the exchange and appends it to the chat log.
pub async fn chat_submit(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if payload.user_input.trim().is_empty() {
        return Err(ApiError::unprocessable("user_input must not be empty"));
    }

    let entry = state.chat.exchange(&payload.user_input).await?;

    state.store.append(CHAT_LOG_DATASET, &entry).await?;
    debug!(emotion = %entry.emotion_sentiment, "Chat exchange logged");

    Ok(Json(ChatResponse {
        sentiment: ClassificationResult::new(
            entry.emotion_sentiment,
            entry.fine_grained_sentiment,
            entry.thinking,
        ),
        bot_response: entry.bot_response,
    }))
}
