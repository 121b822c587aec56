//! In-memory `LlmBackend` doubles shared by the workspace's tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use pulse_llm::{LlmBackend, LlmError, LlmRequest, LlmResponse};

pub use pretty_assertions;

pub const TEST_MODEL: &str = "test-model";

type ReplyFn = Box<dyn Fn(&LlmRequest) -> Result<String, LlmError> + Send + Sync>;

/// A reply in the classifier's output grammar.
pub fn reply_for(fine_grained: &str, emotion: &str, thinking: &str) -> String {
    format!(
        "Fine-Grained Sentiment: {fine_grained}\nEmotion Sentiment: {emotion}\nThinking: {thinking}"
    )
}

/// The text of the last user message in a request.
pub fn user_prompt(req: &LlmRequest) -> &str {
    req.messages
        .iter()
        .rev()
        .find(|m| m.role == "user")
        .map(|m| m.content.as_str())
        .unwrap_or("")
}

fn response(content: String) -> LlmResponse {
    LlmResponse {
        content,
        model: TEST_MODEL.to_string(),
        prompt_tokens: 0,
        completion_tokens: 0,
    }
}

/// Answers from a script and records every request it receives.
pub struct ScriptedBackend {
    reply: ReplyFn,
    requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedBackend {
    /// Always answers with `text`.
    pub fn replying(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::from_fn(move |_| Ok(text.clone()))
    }

    /// Answers with `replies` in call order, then with an empty completion error.
    pub fn sequence<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let queue: Mutex<VecDeque<String>> =
            Mutex::new(replies.into_iter().map(Into::into).collect());
        Self::from_fn(move |_| queue.lock().unwrap().pop_front().ok_or(LlmError::EmptyCompletion))
    }

    /// Answers by calling `f` with each request.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&LlmRequest) -> Result<String, LlmError> + Send + Sync + 'static,
    {
        Self { reply: Box::new(f), requests: Mutex::new(Vec::new()) }
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let out = (self.reply)(&req);
        self.requests.lock().unwrap().push(req);
        out.map(response)
    }

    fn model_id(&self) -> &str { TEST_MODEL }
    fn is_local(&self) -> bool { true }
}

/// Fails `failures` times with an API error of `status`, then answers `reply`.
pub struct FlakyBackend {
    failures: u32,
    status: u16,
    reply: String,
    calls: AtomicU32,
}

impl FlakyBackend {
    pub fn new(failures: u32, status: u16, reply: impl Into<String>) -> Self {
        Self { failures, status, reply: reply.into(), calls: AtomicU32::new(0) }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmBackend for FlakyBackend {
    async fn complete(&self, _req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            return Err(LlmError::ApiError {
                status: self.status,
                message: format!("scripted failure {}", n + 1),
            });
        }
        Ok(response(self.reply.clone()))
    }

    fn model_id(&self) -> &str { TEST_MODEL }
    fn is_local(&self) -> bool { true }
}
