//! Bounded batch classification and retry behaviour end to end.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pulse_llm::{LlmBackend, LlmError, LlmRequest, LlmResponse, RetryPolicy, RetryingBackend};
use pulse_sentiment::{classify_batch, ClassifierConfig, SentimentClassifier, SentimentVocabulary};
use pulse_test_utils::{reply_for, user_prompt, FlakyBackend, ScriptedBackend};

/// Echoes the message text back as the rationale; rejects the text `boom`.
fn echo_backend() -> ScriptedBackend {
    ScriptedBackend::from_fn(|req| {
        let prompt = user_prompt(req);
        let text = prompt.trim_end().rsplit('\n').next().unwrap_or("").to_string();
        if text == "boom" {
            return Err(LlmError::ApiError { status: 400, message: "bad request".into() });
        }
        Ok(reply_for("Neutral", "Confused", &text))
    })
}

/// Sleeps longer for lower row numbers and tracks peak concurrency.
struct SlowBackend {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl LlmBackend for SlowBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let prompt = user_prompt(&req).to_string();
        let row: u64 = prompt.trim_end().rsplit('\n').next().and_then(|s| s.parse().ok()).unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(40u64.saturating_sub(row * 5))).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(LlmResponse {
            content: reply_for("Neutral", "Confused", &row.to_string()),
            model: "slow".into(),
            prompt_tokens: 0,
            completion_tokens: 0,
        })
    }
    fn model_id(&self) -> &str { "slow" }
    fn is_local(&self) -> bool { true }
}

#[tokio::test]
async fn test_results_follow_input_order() {
    let backend = Arc::new(SlowBackend { in_flight: AtomicUsize::new(0), peak: AtomicUsize::new(0) });
    let c = SentimentClassifier::new(backend.clone(), ClassifierConfig::default());
    let texts: Vec<String> = (0..8).map(|i| i.to_string()).collect();

    let results = classify_batch(&c, &texts[..], &SentimentVocabulary::default(), 3).await;

    let thinking: Vec<String> = results.into_iter().map(|r| r.unwrap().thinking).collect();
    assert_eq!(thinking, texts);
    assert!(backend.peak.load(Ordering::SeqCst) <= 3);
}

#[tokio::test]
async fn test_failed_row_does_not_abort_batch() {
    let c = SentimentClassifier::new(echo_backend(), ClassifierConfig::default());
    let texts = ["first", "boom", "third"];

    let results = classify_batch(&c, &texts[..], &SentimentVocabulary::default(), 2).await;

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap().thinking, "first");
    assert!(matches!(results[1], Err(LlmError::ApiError { status: 400, .. })));
    assert_eq!(results[2].as_ref().unwrap().thinking, "third");
}

#[tokio::test]
async fn test_zero_concurrency_is_treated_as_one() {
    let c = SentimentClassifier::new(echo_backend(), ClassifierConfig::default());
    let results = classify_batch(&c, &["a", "b"][..], &SentimentVocabulary::default(), 0).await;
    assert_eq!(results.len(), 2);
}

#[tokio::test]
async fn test_empty_batch() {
    let c = SentimentClassifier::new(echo_backend(), ClassifierConfig::default());
    let results = classify_batch::<_, &str>(&c, &[][..], &SentimentVocabulary::default(), 4).await;
    assert!(results.is_empty());
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy { max_attempts: 3, base_backoff_ms: 1, max_backoff_ms: 4 }
}

#[tokio::test]
async fn test_classifier_retries_rate_limits() {
    let flaky = Arc::new(FlakyBackend::new(2, 429, reply_for("Urgent", "Anxious", "outage")));
    let c = SentimentClassifier::new(
        RetryingBackend::new(flaky.clone(), fast_retry()),
        ClassifierConfig::default(),
    );
    let r = c.classify("site down", &SentimentVocabulary::default()).await.unwrap();
    assert_eq!(r.fine_grained_sentiment, "Urgent");
    assert_eq!(flaky.calls(), 3);
}

#[tokio::test]
async fn test_classifier_does_not_retry_bad_credentials() {
    let flaky = Arc::new(FlakyBackend::new(1, 401, reply_for("Urgent", "Anxious", "outage")));
    let c = SentimentClassifier::new(
        RetryingBackend::new(flaky.clone(), fast_retry()),
        ClassifierConfig::default(),
    );
    assert!(c.classify("site down", &SentimentVocabulary::default()).await.is_err());
    assert_eq!(flaky.calls(), 1);
}
