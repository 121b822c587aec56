//! HTTP error responses.
//!
//! Every failure renders as `{ "error": true, "message", "solution" }`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pulse_common::PulseError;
use pulse_llm::LlmError;
use serde_json::json;
use tracing::error;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub solution: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>, solution: impl Into<String>) -> Self {
        Self { status, message: message.into(), solution: solution.into() }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            message,
            "Run the matching pipeline first so the dataset exists in the data folder",
        )
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message, "Check the file format and content")
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message, "Check the model provider settings and try again")
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message, "Check server logs")
    }
}

impl From<PulseError> for ApiError {
    fn from(e: PulseError) -> Self {
        match e {
            PulseError::DatasetNotFound(name) => Self::not_found(format!("Dataset {name} not found")),
            PulseError::MissingField { .. } | PulseError::Csv(_) => Self::unprocessable(e.to_string()),
            PulseError::Remote { .. } | PulseError::Http(_) | PulseError::Upstream { .. } => {
                Self::bad_gateway(e.to_string())
            }
            other => Self::internal(other.to_string()),
        }
    }
}

impl From<LlmError> for ApiError {
    fn from(e: LlmError) -> Self {
        Self::from(PulseError::from(e))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = self.status.as_u16(), message = %self.message, "Request failed");
        }
        let body = json!({
            "error": true,
            "message": self.message,
            "solution": self.solution,
        });
        (self.status, Json(body)).into_response()
    }
}
