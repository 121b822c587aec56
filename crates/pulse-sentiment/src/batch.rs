//! Bounded-concurrency classification of many texts.

use futures_util::stream::{self, StreamExt};
use pulse_common::ClassificationResult;
use pulse_llm::{LlmBackend, LlmError};

use crate::classifier::SentimentClassifier;
use crate::vocabulary::SentimentVocabulary;

pub const DEFAULT_CONCURRENCY: usize = 4;

/// Classify `texts` with at most `concurrency` calls in flight.
///
/// Returns one result per input, in input order. A failed row never stops
/// the others.
pub async fn classify_batch<B, S>(
    classifier: &SentimentClassifier<B>,
    texts: &[S],
    vocab: &SentimentVocabulary,
    concurrency: usize,
) -> Vec<Result<ClassificationResult, LlmError>>
where
    B: LlmBackend,
    S: AsRef<str>,
{
    let mut indexed: Vec<(usize, Result<ClassificationResult, LlmError>)> =
        stream::iter(texts.iter().enumerate())
            .map(|(i, text)| async move { (i, classifier.classify(text.as_ref(), vocab).await) })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

    indexed.sort_by_key(|(i, _)| *i);
    indexed.into_iter().map(|(_, r)| r).collect()
}
