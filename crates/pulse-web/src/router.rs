//! Axum router — maps all URL paths to handlers.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{
    chat::chat_submit,
    datasets::{analyze, chat_logs, list_datasets},
    sentiment::classify,
    system::health,
};
use crate::state::{AppState, SharedState};

/// Build and return the full Axum router.
pub fn build_router(state: AppState) -> Router {
    let shared: SharedState = Arc::new(state);

    Router::new()
        .route("/api/health",            get(health))
        .route("/api/datasets",          get(list_datasets))
        .route("/api/analyze/{dataset}", get(analyze))
        .route("/api/classify",          post(classify))
        .route("/api/chat",              post(chat_submit))
        .route("/api/chatlogs",          get(chat_logs))

        // Middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}
