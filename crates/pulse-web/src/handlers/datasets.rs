//! Dataset listing, per-dataset analysis and the chat log.

use axum::{
    extract::{Path, State},
    Json,
};
use pulse_common::{ChatLogEntry, PulseError};
use pulse_ingestion::stats::{analyze_dataset, DatasetAnalysis};
use pulse_ingestion::store::{DatasetInfo, CHAT_LOG_DATASET};
use serde::Serialize;

use crate::error::ApiError;
use crate::state::SharedState;

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub success: bool,
    #[serde(flatten)]
    pub analysis: DatasetAnalysis,
}

/// GET /api/datasets
pub async fn list_datasets(State(state): State<SharedState>) -> Result<Json<Vec<DatasetInfo>>, ApiError> {
    Ok(Json(state.store.list().await?))
}

/// GET /api/analyze/{dataset}
pub async fn analyze(
    State(state): State<SharedState>,
    Path(dataset): Path<String>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let analysis = analyze_dataset(&state.store, &dataset).await?;
    Ok(Json(AnalyzeResponse { success: true, analysis }))
}

/// GET /api/chatlogs
pub async fn chat_logs(State(state): State<SharedState>) -> Result<Json<Vec<ChatLogEntry>>, ApiError> {
    match state.store.read::<ChatLogEntry>(CHAT_LOG_DATASET).await {
        Ok(rows) => Ok(Json(rows)),
        Err(PulseError::DatasetNotFound(_)) => Ok(Json(Vec::new())),
        Err(e) => Err(e.into()),
    }
}
