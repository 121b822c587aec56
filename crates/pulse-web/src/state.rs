//! Shared application state for the web server.

use std::sync::Arc;

use pulse_ingestion::DatasetStore;
use pulse_llm::LlmBackend;
use pulse_sentiment::{ChatSession, ClassifierConfig, SentimentClassifier, SentimentVocabulary};

/// Backend handle shared by every model-facing component.
pub type Backend = Arc<dyn LlmBackend>;

/// Shared state injected into every Axum handler.
pub struct AppState {
    pub store: DatasetStore,
    pub classifier: SentimentClassifier<Backend>,
    pub vocab: SentimentVocabulary,
    /// Stateless per request; `chat_logs.csv` is the only record of turns.
    pub chat: ChatSession<Backend>,
}

impl AppState {
    pub fn new(
        backend: Backend,
        config: ClassifierConfig,
        vocab: SentimentVocabulary,
        store: DatasetStore,
    ) -> Self {
        let chat = ChatSession::new(backend.clone(), config.clone(), vocab.clone());
        Self {
            store,
            classifier: SentimentClassifier::new(backend, config),
            vocab,
            chat,
        }
    }
}

pub type SharedState = Arc<AppState>;
