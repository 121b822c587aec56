//! The classification call: prompt out, reply in, structure recovered.

use std::time::Instant;

use pulse_common::ClassificationResult;
use pulse_llm::{LlmBackend, LlmError, LlmRequest};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::parser::{parse_reply_detailed, ParseOptions};
use crate::prompt::{build_messages, PromptStyle, Surface};
use crate::vocabulary::SentimentVocabulary;

pub const DEFAULT_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_MAX_TOKENS: u32 = 1024;
/// Smallest budget that still leaves room for the rationale line.
pub const MIN_MAX_TOKENS: u32 = 512;

/// Decoding and formatting settings for classification calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Overrides the backend's model when set.
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub style: PromptStyle,
    #[serde(default)]
    pub surface: Surface,
    #[serde(default)]
    pub parse: ParseOptions,
}

fn default_temperature() -> f32 { DEFAULT_TEMPERATURE }
fn default_max_tokens() -> u32 { DEFAULT_MAX_TOKENS }

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model: None,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            style: PromptStyle::default(),
            surface: Surface::default(),
            parse: ParseOptions::default(),
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_tokens < MIN_MAX_TOKENS {
            return Err(format!(
                "max_tokens must be at least {MIN_MAX_TOKENS}, got {}",
                self.max_tokens
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(format!("temperature must be within 0.0..=2.0, got {}", self.temperature));
        }
        Ok(())
    }
}

/// Classifies free text against a [`SentimentVocabulary`] through an LLM backend.
pub struct SentimentClassifier<B> {
    backend: B,
    config: ClassifierConfig,
}

impl<B: LlmBackend> SentimentClassifier<B> {
    pub fn new(backend: B, config: ClassifierConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The model classification requests are sent to.
    pub fn model_id(&self) -> &str {
        self.config.model.as_deref().unwrap_or_else(|| self.backend.model_id())
    }

    /// Classify one message.
    ///
    /// `Err` carries only transport or service faults. A reply that does not
    /// follow the grammar still yields `Ok`, with fallbacks in place of the
    /// fields that could not be recovered.
    #[instrument(skip_all, fields(model = %self.model_id(), surface = self.config.surface.as_str(), chars = text.chars().count()))]
    pub async fn classify(
        &self,
        text: &str,
        vocab: &SentimentVocabulary,
    ) -> Result<ClassificationResult, LlmError> {
        let req = LlmRequest {
            messages: build_messages(text, vocab, self.config.surface, self.config.style),
            model: self.config.model.clone(),
            max_tokens: Some(self.config.max_tokens),
            temperature: Some(self.config.temperature),
        };

        let started = Instant::now();
        let resp = self.backend.complete(req).await?;
        let latency_ms = started.elapsed().as_millis() as u64;

        let (result, misses) = parse_reply_detailed(&resp.content, &self.config.parse);
        // Strict prompts never ask for a rationale, so its absence is expected.
        let thinking_missed = misses.thinking && self.config.style == PromptStyle::Reasoned;
        if misses.fine_grained || misses.emotion || thinking_missed {
            warn!(
                latency_ms,
                fine_grained_fallback = misses.fine_grained,
                emotion_fallback = misses.emotion,
                thinking_fallback = thinking_missed,
                "Model reply did not follow the output grammar"
            );
        } else {
            debug!(
                latency_ms,
                emotion = %result.emotion_sentiment,
                fine_grained = %result.fine_grained_sentiment,
                "Classified"
            );
        }
        Ok(result)
    }
}

impl<B: LlmBackend + Clone> SentimentClassifier<B> {
    /// Same backend and settings, worded for a different text source.
    pub fn for_surface(&self, surface: Surface) -> Self {
        Self {
            backend: self.backend.clone(),
            config: ClassifierConfig { surface, ..self.config.clone() },
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
