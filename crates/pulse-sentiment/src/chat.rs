//! Customer-care chat: every turn is answered, classified and logged.

use chrono::{DateTime, Local};
use pulse_common::ChatLogEntry;
use pulse_llm::{LlmBackend, LlmError};
use tracing::info;

use crate::assist::{CleanTarget, Responder, TextCleaner};
use crate::classifier::{ClassifierConfig, SentimentClassifier};
use crate::prompt::Surface;
use crate::vocabulary::SentimentVocabulary;

/// Typed by the user to end an interactive session.
pub const QUIT_COMMAND: &str = "quit";

pub fn is_quit(input: &str) -> bool {
    input.trim().eq_ignore_ascii_case(QUIT_COMMAND)
}

/// `chat_log_<YYYYmmdd_HHMMSS>.csv`
pub fn session_log_file_name(at: DateTime<Local>) -> String {
    format!("chat_log_{}.csv", at.format("%Y%m%d_%H%M%S"))
}

/// One conversation and its ordered log.
pub struct ChatSession<B> {
    classifier: SentimentClassifier<B>,
    cleaner: TextCleaner<B>,
    responder: Responder<B>,
    vocab: SentimentVocabulary,
    clean_input: bool,
    log: Vec<ChatLogEntry>,
}

impl<B: LlmBackend + Clone> ChatSession<B> {
    pub fn new(backend: B, config: ClassifierConfig, vocab: SentimentVocabulary) -> Self {
        let model = config.model.clone();
        let mut cleaner = TextCleaner::new(backend.clone(), CleanTarget::ChatText);
        let mut responder = Responder::new(backend.clone());
        if let Some(m) = model {
            cleaner = cleaner.with_model(m.clone());
            responder = responder.with_model(m);
        }
        Self {
            classifier: SentimentClassifier::new(backend, ClassifierConfig { surface: Surface::Chat, ..config }),
            cleaner,
            responder,
            vocab,
            clean_input: true,
            log: Vec::new(),
        }
    }
}

impl<B: LlmBackend> ChatSession<B> {
    /// Skip the cleaning call and classify the raw input.
    pub fn with_clean_input(mut self, clean_input: bool) -> Self {
        self.clean_input = clean_input;
        self
    }

    pub fn model_id(&self) -> &str {
        self.classifier.model_id()
    }

    pub fn log(&self) -> &[ChatLogEntry] {
        &self.log
    }

    pub fn take_log(&mut self) -> Vec<ChatLogEntry> {
        std::mem::take(&mut self.log)
    }

    /// Clean, classify, reply, then log the turn.
    ///
    /// The logged `user_input` is the cleaned text. A failed call leaves the
    /// log untouched.
    pub async fn handle_turn(&mut self, input: &str) -> Result<ChatLogEntry, LlmError> {
        let cleaned = if self.clean_input {
            self.cleaner.clean(input).await?
        } else {
            input.trim().to_string()
        };
        let sentiment = self.classifier.classify(&cleaned, &self.vocab).await?;
        let reply = self.responder.respond(&cleaned).await?;

        let entry = ChatLogEntry::new(cleaned, reply, &sentiment, self.classifier.model_id());
        self.log.push(entry.clone());
        info!(turn = self.log.len(), emotion = %entry.emotion_sentiment, "Chat turn logged");
        Ok(entry)
    }

    /// Reply first, then classify the whole exchange (`input + " " + reply`).
    pub async fn handle_exchange(&mut self, input: &str) -> Result<ChatLogEntry, LlmError> {
        let entry = self.exchange(input).await?;
        self.log.push(entry.clone());
        Ok(entry)
    }

    /// [`handle_exchange`](Self::handle_exchange) without touching the log.
    pub async fn exchange(&self, input: &str) -> Result<ChatLogEntry, LlmError> {
        let reply = self.responder.respond(input).await?;
        let exchange = format!("{input} {reply}");
        let sentiment = self.classifier.classify(&exchange, &self.vocab).await?;
        Ok(ChatLogEntry::new(input, reply, &sentiment, self.classifier.model_id()))
    }
}
