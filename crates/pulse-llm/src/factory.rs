//! Builds a ready-to-use backend from a provider description.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::backend::{
    AnthropicBackend, LlmBackend, LlmError, OllamaBackend, OpenAiBackend,
    OpenAiCompatibleBackend, GROQ_BASE_URL,
};
use crate::retry::{RetryPolicy, RetryingBackend};

const OLLAMA_BASE_URL: &str = "http://localhost:11434";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    OpenAi,
    OpenAiCompatible,
    Anthropic,
    Ollama,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::OpenAi => "open_ai",
            BackendKind::OpenAiCompatible => "open_ai_compatible",
            BackendKind::Anthropic => "anthropic",
            BackendKind::Ollama => "ollama",
        }
    }

    /// Whether the provider refuses calls without an API key.
    pub fn requires_key(&self) -> bool {
        matches!(self, BackendKind::OpenAi | BackendKind::Anthropic)
    }
}

/// Everything needed to construct one backend. The key stays a plain string
/// until the backend is built, then lives only inside a `SecretString`.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

fn secret(key: &Option<String>) -> Option<SecretString> {
    key.as_deref()
        .filter(|k| !k.is_empty())
        .map(|k| SecretString::from(k.to_string()))
}

fn build_raw(cfg: &BackendConfig) -> Result<Arc<dyn LlmBackend>, LlmError> {
    let backend: Arc<dyn LlmBackend> = match (cfg.kind, secret(&cfg.api_key)) {
        (BackendKind::OpenAi, Some(k)) => {
            Arc::new(OpenAiBackend::with_timeout(k, &cfg.model, cfg.timeout)?)
        }
        (BackendKind::Anthropic, Some(k)) => {
            Arc::new(AnthropicBackend::with_timeout(k, &cfg.model, cfg.timeout)?)
        }
        (BackendKind::OpenAiCompatible, k) => {
            let base = cfg.base_url.as_deref().unwrap_or(GROQ_BASE_URL);
            Arc::new(OpenAiCompatibleBackend::with_timeout(base, &cfg.model, k, cfg.timeout)?)
        }
        (BackendKind::Ollama, _) => {
            let base = cfg.base_url.as_deref().unwrap_or(OLLAMA_BASE_URL);
            Arc::new(OllamaBackend::with_timeout(base, &cfg.model, cfg.timeout)?)
        }
        (kind, None) => {
            return Err(LlmError::Config(format!("{} backend requires an API key", kind.as_str())))
        }
    };
    Ok(backend)
}

/// Construct the backend described by `cfg`, wrapped in its retry policy.
pub fn build_backend(cfg: &BackendConfig) -> Result<Arc<dyn LlmBackend>, LlmError> {
    let raw = build_raw(cfg)?;
    tracing::info!(
        kind = cfg.kind.as_str(),
        model = raw.model_id(),
        is_local = raw.is_local(),
        max_attempts = cfg.retry.max_attempts,
        "LLM backend ready"
    );
    Ok(Arc::new(RetryingBackend::new(raw, cfg.retry.clone())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(kind: BackendKind, api_key: Option<&str>) -> BackendConfig {
        BackendConfig {
            kind,
            model: "llama3-70b-8192".into(),
            api_key: api_key.map(String::from),
            base_url: None,
            timeout: Duration::from_secs(5),
            retry: RetryPolicy::none(),
        }
    }

    #[test]
    fn test_remote_kind_without_key_is_config_error() {
        let err = build_backend(&cfg(BackendKind::OpenAi, None)).err().unwrap();
        assert!(matches!(err, LlmError::Config(_)));
        let err = build_backend(&cfg(BackendKind::Anthropic, Some(""))).err().unwrap();
        assert!(matches!(err, LlmError::Config(_)));
    }

    #[test]
    fn test_compatible_backend_builds_without_key() {
        let b = build_backend(&cfg(BackendKind::OpenAiCompatible, None)).unwrap();
        assert_eq!(b.model_id(), "llama3-70b-8192");
        assert!(!b.is_local());
    }

    #[test]
    fn test_ollama_backend_is_local() {
        let b = build_backend(&cfg(BackendKind::Ollama, None)).unwrap();
        assert!(b.is_local());
    }

    #[test]
    fn test_kind_deserializes_snake_case() {
        #[derive(Deserialize)]
        struct W { kind: BackendKind }
        let w: W = toml::from_str(r#"kind = "open_ai_compatible""#).unwrap();
        assert_eq!(w.kind, BackendKind::OpenAiCompatible);
    }
}
