//! Bounded retry with exponential backoff around any [`LlmBackend`].
//!
//! Only faults classified as retryable by [`LlmError::is_retryable`] are
//! retried; fatal faults (bad credentials, malformed requests) surface on the
//! first attempt.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::backend::{LlmBackend, LlmError, LlmRequest, LlmResponse};

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BASE_BACKOFF_MS: u64 = 500;
const DEFAULT_MAX_BACKOFF_MS: u64 = 8_000;

/// How many times to try a call and how long to wait in between.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each subsequent retry.
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_max_attempts()    -> u32 { DEFAULT_MAX_ATTEMPTS }
fn default_base_backoff_ms() -> u64 { DEFAULT_BASE_BACKOFF_MS }
fn default_max_backoff_ms()  -> u64 { DEFAULT_MAX_BACKOFF_MS }

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_backoff_ms: DEFAULT_BASE_BACKOFF_MS,
            max_backoff_ms: DEFAULT_MAX_BACKOFF_MS,
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn none() -> Self {
        Self { max_attempts: 1, ..Self::default() }
    }

    /// Delay before retry number `retry` (1-based), capped at `max_backoff_ms`.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u64.checked_shl(retry.saturating_sub(1)).unwrap_or(u64::MAX);
        let ms = self.base_backoff_ms.saturating_mul(factor).min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }
}

/// Wraps a backend so transient faults are retried under a [`RetryPolicy`].
pub struct RetryingBackend<B> {
    inner: B,
    policy: RetryPolicy,
}

impl<B: LlmBackend> RetryingBackend<B> {
    pub fn new(inner: B, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl<B: LlmBackend> LlmBackend for RetryingBackend<B> {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.inner.complete(req.clone()).await {
                Ok(resp) => return Ok(resp),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let delay = self.policy.backoff(attempt);
                    warn!(
                        model = self.inner.model_id(),
                        attempt,
                        max_attempts,
                        error = %e,
                        "Transient LLM failure, retrying in {:?}",
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn model_id(&self) -> &str { self.inner.model_id() }
    fn is_local(&self) -> bool { self.inner.is_local() }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
