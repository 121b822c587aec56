//! Configuration loading for Pulse.
//! Reads pulse.toml from the path given on the command line, the path in the
//! PULSE_CONFIG env var, or the current directory, in that order.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use pulse_ingestion::pipeline::DEFAULT_TICKET_COLUMN;
use pulse_ingestion::EnrichmentOptions;
use pulse_llm::{BackendConfig, BackendKind, RetryPolicy};
use pulse_sentiment::{ClassifierConfig, SentimentVocabulary, VocabularyPreset};
use secrecy::SecretString;
use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_CONFIG_FILE: &str = "pulse.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub vocabulary: VocabularyConfig,
    #[serde(default)]
    pub pipeline: EnrichmentOptions,
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub tickets: TicketsConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: BackendKind,
    #[serde(default = "default_model")]
    pub model: String,
    /// Falls back to the environment when absent.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_provider()     -> BackendKind { BackendKind::OpenAiCompatible }
fn default_model()        -> String { "llama3-70b-8192".to_string() }
fn default_timeout_secs() -> u64 { 60 }

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key: None,
            base_url: None,
            timeout_secs: default_timeout_secs(),
            retry: RetryPolicy::default(),
        }
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("retry", &self.retry)
            .finish()
    }
}

/// Provider-specific variable consulted after `PULSE_LLM_API_KEY`.
fn provider_key_var(kind: BackendKind) -> Option<&'static str> {
    match kind {
        BackendKind::OpenAiCompatible => Some("GROQ_API_KEY"),
        BackendKind::OpenAi => Some("OPENAI_API_KEY"),
        BackendKind::Anthropic => Some("ANTHROPIC_API_KEY"),
        BackendKind::Ollama => None,
    }
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}

impl LlmConfig {
    /// The file's key, else `PULSE_LLM_API_KEY`, else the provider's own variable.
    pub fn resolve_api_key(&self, env: impl Fn(&str) -> Option<String>) -> Option<String> {
        non_empty(self.api_key.clone())
            .or_else(|| non_empty(env("PULSE_LLM_API_KEY")))
            .or_else(|| provider_key_var(self.provider).and_then(|var| non_empty(env(var))))
    }

    pub fn backend_config(&self, env: impl Fn(&str) -> Option<String>) -> BackendConfig {
        BackendConfig {
            kind: self.provider,
            model: self.model.clone(),
            api_key: self.resolve_api_key(env),
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            retry: self.retry.clone(),
        }
    }
}

/// A named preset, or custom label lists that take precedence over it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VocabularyConfig {
    #[serde(default)]
    pub preset: VocabularyPreset,
    #[serde(default)]
    pub custom: Option<SentimentVocabulary>,
}

impl VocabularyConfig {
    pub fn resolve(&self) -> SentimentVocabulary {
        self.custom.clone().unwrap_or_else(|| SentimentVocabulary::preset(self.preset))
    }
}

#[derive(Clone, Deserialize)]
pub struct GitHubConfig {
    #[serde(default = "default_repo")]
    pub repo: String,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    /// Falls back to `GITHUB_TOKEN`; unauthenticated calls work at a lower rate limit.
    #[serde(default)]
    pub token: Option<String>,
}

fn default_repo()     -> String { "microsoft/vscode".to_string() }
fn default_per_page() -> u32 { 10 }

impl Default for GitHubConfig {
    fn default() -> Self {
        Self { repo: default_repo(), per_page: default_per_page(), token: None }
    }
}

impl fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("repo", &self.repo)
            .field("per_page", &self.per_page)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl GitHubConfig {
    pub fn resolve_token(&self, env: impl Fn(&str) -> Option<String>) -> Option<SecretString> {
        non_empty(self.token.clone())
            .or_else(|| non_empty(env("GITHUB_TOKEN")))
            .map(SecretString::from)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TicketsConfig {
    #[serde(default = "default_ticket_column")]
    pub column: String,
}

fn default_ticket_column() -> String { DEFAULT_TICKET_COLUMN.to_string() }

impl Default for TicketsConfig {
    fn default() -> Self {
        Self { column: default_ticket_column() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub dir: PathBuf,
}

fn default_data_dir() -> PathBuf { PathBuf::from("data") }

impl Default for DataConfig {
    fn default() -> Self {
        Self { dir: default_data_dir() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String { "127.0.0.1:5000".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

/// Process environment lookup used outside tests.
pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}


impl Config {
    /// Load configuration from `path`, `PULSE_CONFIG` or `./pulse.toml`.
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => process_env("PULSE_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE)),
        };

        if !path.exists() {
            warn!(path = %path.display(), "Config file not found; using defaults");
            let config = Config::default();
            config.validate()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("loading {}", path.display()))
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.classifier.validate().map_err(|e| anyhow::anyhow!("classifier: {e}"))?;
        if self.pipeline.concurrency < 1 {
            anyhow::bail!("pipeline: concurrency must be at least 1");
        }
        if self.pipeline.checkpoint_every < 1 {
            anyhow::bail!("pipeline: checkpoint_every must be at least 1");
        }
        if self.llm.model.trim().is_empty() {
            anyhow::bail!("llm: model must not be empty");
        }
        if self.llm.retry.max_attempts < 1 {
            anyhow::bail!("llm: retry.max_attempts must be at least 1");
        }
        if !(1..=100).contains(&self.github.per_page) {
            anyhow::bail!("github: per_page must be within 1..=100, got {}", self.github.per_page);
        }
        Ok(())
    }
}
