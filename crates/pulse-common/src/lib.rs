//! pulse-common — Shared types and errors used across all Pulse crates.

pub mod error;
pub mod records;

// Re-export commonly used types
pub use error::{PulseError, Result};
pub use records::{
    ChatLogEntry, ClassificationResult, EmailRecord, IssueRecord, SentimentRecord, UNKNOWN_LABEL,
};
