//! Row shapes shared by producers, the classifier and the dataset sinks.
//!
//! Field names are pinned with `serde(rename)` to the CSV column headers the
//! dashboard reads, so a record round-trips through a dataset file unchanged.

use serde::{Deserialize, Serialize};

/// Label substituted for a sentiment field the model reply did not yield.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Structured sentiment judgment for one message.
///
/// Every field is always present: either the value recovered from the model
/// reply or that field's fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub emotion_sentiment: String,
    pub fine_grained_sentiment: String,
    pub thinking: String,
}

impl ClassificationResult {
    pub fn new(
        emotion_sentiment: impl Into<String>,
        fine_grained_sentiment: impl Into<String>,
        thinking: impl Into<String>,
    ) -> Self {
        Self {
            emotion_sentiment: emotion_sentiment.into(),
            fine_grained_sentiment: fine_grained_sentiment.into(),
            thinking: thinking.into(),
        }
    }

    /// Result used when nothing could be recovered from a reply.
    pub fn unknown(thinking_fallback: impl Into<String>) -> Self {
        Self::new(UNKNOWN_LABEL, UNKNOWN_LABEL, thinking_fallback)
    }

    /// Both sentiment labels were recovered from the reply.
    pub fn is_fully_parsed(&self) -> bool {
        self.emotion_sentiment != UNKNOWN_LABEL && self.fine_grained_sentiment != UNKNOWN_LABEL
    }

    /// `(emotion, fine_grained, thinking)` in dataset column order.
    pub fn as_tuple(&self) -> (&str, &str, &str) {
        (&self.emotion_sentiment, &self.fine_grained_sentiment, &self.thinking)
    }
}

/// A dataset row that carries the three sentiment columns.
pub trait SentimentRecord {
    /// Text handed to the classifier for this row.
    fn sentiment_text(&self) -> &str;

    /// Merge a classification into the row's sentiment columns.
    fn apply_sentiment(&mut self, result: &ClassificationResult);
}

/// One email, as fetched and later enriched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmailRecord {
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "Subject")]
    pub subject: String,
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Body")]
    pub body: String,
    /// Body with HTML tags stripped and whitespace collapsed.
    #[serde(default)]
    pub clean_body: String,
    #[serde(default)]
    pub src_name: String,
    #[serde(default)]
    pub src_email: String,
    /// Body after the model-based cleaning pass; empty when that pass is skipped.
    #[serde(default)]
    pub new_body: String,
    #[serde(default)]
    pub emotion_sentiment: String,
    #[serde(default)]
    pub fine_grained_sentiment: String,
    #[serde(default)]
    pub thinking: String,
}

impl SentimentRecord for EmailRecord {
    fn sentiment_text(&self) -> &str {
        if !self.new_body.is_empty() {
            &self.new_body
        } else if !self.clean_body.is_empty() {
            &self.clean_body
        } else {
            &self.body
        }
    }

    fn apply_sentiment(&mut self, result: &ClassificationResult) {
        self.emotion_sentiment = result.emotion_sentiment.clone();
        self.fine_grained_sentiment = result.fine_grained_sentiment.clone();
        self.thinking = result.thinking.clone();
    }
}

/// One GitHub issue (pull requests are filtered out upstream).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueRecord {
    #[serde(rename = "Issue ID")]
    pub issue_id: u64,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Created At")]
    pub created_at: String,
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "Issue URL")]
    pub issue_url: String,
    #[serde(default)]
    pub emotion_sentiment: String,
    #[serde(default)]
    pub fine_grained_sentiment: String,
    #[serde(default)]
    pub thinking: String,
}

impl SentimentRecord for IssueRecord {
    fn sentiment_text(&self) -> &str {
        &self.description
    }

    fn apply_sentiment(&mut self, result: &ClassificationResult) {
        self.emotion_sentiment = result.emotion_sentiment.clone();
        self.fine_grained_sentiment = result.fine_grained_sentiment.clone();
        self.thinking = result.thinking.clone();
    }
}

/// One chat turn as written to the chat log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatLogEntry {
    /// Local time, `%Y-%m-%d %H:%M:%S`.
    pub timestamp: String,
    pub user_input: String,
    pub bot_response: String,
    pub emotion_sentiment: String,
    pub fine_grained_sentiment: String,
    pub thinking: String,
    pub model_used: String,
}

impl ChatLogEntry {
    pub const TIMESTAMP_FORMAT: &'static str = "%Y-%m-%d %H:%M:%S";

    pub fn new(
        user_input: impl Into<String>,
        bot_response: impl Into<String>,
        sentiment: &ClassificationResult,
        model_used: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: chrono::Local::now().format(Self::TIMESTAMP_FORMAT).to_string(),
            user_input: user_input.into(),
            bot_response: bot_response.into(),
            emotion_sentiment: sentiment.emotion_sentiment.clone(),
            fine_grained_sentiment: sentiment.fine_grained_sentiment.clone(),
            thinking: sentiment.thinking.clone(),
            model_used: model_used.into(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
