//! One-off classification.

use axum::{extract::State, Json};
use pulse_common::ClassificationResult;
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct ClassifyRequest {
    pub text: String,
}

/// POST /api/classify
///
/// Empty text is classified like any other message.
pub async fn classify(
    State(state): State<SharedState>,
    Json(payload): Json<ClassifyRequest>,
) -> Result<Json<ClassificationResult>, ApiError> {
    let result = state.classifier.classify(&payload.text, &state.vocab).await?;
    Ok(Json(result))
}
