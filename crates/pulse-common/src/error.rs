use thiserror::Error;

#[derive(Debug, Error)]
pub enum PulseError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream API error [{status}]: {message}")]
    Upstream { status: u16, message: String },

    #[error("Remote model call failed: {message}")]
    Remote { message: String, retryable: bool },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Dataset not found: {0}")]
    DatasetNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PulseError {
    pub fn missing_field(field: impl Into<String>) -> Self {
        PulseError::MissingField { field: field.into() }
    }

    /// True for faults worth retrying later (timeouts, rate limits, 5xx).
    pub fn is_retryable(&self) -> bool {
        match self {
            PulseError::Remote { retryable, .. } => *retryable,
            PulseError::Upstream { status, .. } => *status == 429 || *status >= 500,
            PulseError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, PulseError>;
