//! Auxiliary model calls around classification: cleaning noisy input and
//! drafting a customer-care reply.

use pulse_llm::{LlmBackend, LlmError, LlmRequest, Message};
use serde::{Deserialize, Serialize};
use tracing::instrument;

const CLEAN_TEMPERATURE: f32 = 0.2;
const CLEAN_MAX_TOKENS: u32 = 2048;
const RESPOND_TEMPERATURE: f32 = 0.5;
const RESPOND_MAX_TOKENS: u32 = 1024;

/// What kind of text the cleaner is handed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanTarget {
    #[default]
    EmailBody,
    ChatText,
}

fn clean_messages(text: &str, target: CleanTarget) -> Vec<Message> {
    match target {
        CleanTarget::EmailBody => vec![
            Message::system("You clean email content without changing meaning or wording."),
            Message::user(format!(
                "You are a helpful email cleaner. Clean the following email body:\n\
                 - Remove unnecessary HTML tags and useless formatting.\n\
                 - Do not change or alter the wording.\n\
                 - Keep the natural reading flow.\n\
                 Email Body:\n\
                 {text}\n"
            )),
        ],
        CleanTarget::ChatText => vec![
            Message::system("You clean text content without changing meaning."),
            Message::user(format!(
                "You are a helpful text cleaner. Clean the following:\n\
                 - Remove unnecessary formatting\n\
                 - Preserve original meaning\n\
                 - Keep natural flow\n\
                 Text: {text}\n"
            )),
        ],
    }
}

/// Strips markup and formatting noise while keeping the wording.
pub struct TextCleaner<B> {
    backend: B,
    model: Option<String>,
    target: CleanTarget,
}

impl<B: LlmBackend> TextCleaner<B> {
    pub fn new(backend: B, target: CleanTarget) -> Self {
        Self { backend, model: None, target }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    #[instrument(skip_all, fields(model = self.backend.model_id(), chars = text.chars().count()))]
    pub async fn clean(&self, text: &str) -> Result<String, LlmError> {
        let resp = self.backend.complete(LlmRequest {
            messages: clean_messages(text, self.target),
            model: self.model.clone(),
            max_tokens: Some(CLEAN_MAX_TOKENS),
            temperature: Some(CLEAN_TEMPERATURE),
        }).await?;
        Ok(resp.content.trim().to_string())
    }
}

/// Drafts a professional reply to a customer message.
pub struct Responder<B> {
    backend: B,
    model: Option<String>,
}

impl<B: LlmBackend> Responder<B> {
    pub fn new(backend: B) -> Self {
        Self { backend, model: None }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    #[instrument(skip_all, fields(model = self.backend.model_id()))]
    pub async fn respond(&self, user_input: &str) -> Result<String, LlmError> {
        let prompt = format!(
            "You are a customer care assistant.\n\
             Last user message: {user_input}\n\
             Respond helpfully and professionally.\n"
        );
        let resp = self.backend.complete(LlmRequest {
            messages: vec![
                Message::system("You resolve customer issues professionally."),
                Message::user(prompt),
            ],
            model: self.model.clone(),
            max_tokens: Some(RESPOND_MAX_TOKENS),
            temperature: Some(RESPOND_TEMPERATURE),
        }).await?;
        Ok(resp.content.trim().to_string())
    }
}
