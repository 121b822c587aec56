//! Classification contract against scripted model replies.

use std::sync::Arc;

use pulse_sentiment::parser::NO_REASONING;
use pulse_sentiment::{
    ClassificationResult, ClassifierConfig, ParseOptions, PromptStyle, SentimentClassifier,
    SentimentVocabulary, Surface,
};
use pulse_test_utils::pretty_assertions::assert_eq;
use pulse_test_utils::{reply_for, user_prompt, ScriptedBackend};

fn classifier(reply: &str) -> SentimentClassifier<Arc<ScriptedBackend>> {
    SentimentClassifier::new(Arc::new(ScriptedBackend::replying(reply)), ClassifierConfig::default())
}

#[tokio::test]
async fn test_round_trip_support_message() {
    let c = classifier(&reply_for(
        "Negative",
        "Frustrated",
        "Customer reports unresolved delay and perceived neglect.",
    ));
    let r = c
        .classify(
            "My order never arrived and support has ignored me for a week.",
            &SentimentVocabulary::default(),
        )
        .await
        .unwrap();

    assert_eq!(
        r,
        ClassificationResult::new(
            "Frustrated",
            "Negative",
            "Customer reports unresolved delay and perceived neglect."
        )
    );
}

#[tokio::test]
async fn test_malformed_reply_falls_back_everywhere() {
    let c = classifier("I think the customer is upset.");
    let r = c.classify("anything", &SentimentVocabulary::default()).await.unwrap();
    assert_eq!(r.as_tuple(), ("Unknown", "Unknown", ""));
}

#[tokio::test]
async fn test_reasoned_variant_rationale_fallback() {
    let config = ClassifierConfig {
        parse: ParseOptions::with_thinking_fallback(NO_REASONING),
        ..ClassifierConfig::default()
    };
    let c = SentimentClassifier::new(ScriptedBackend::replying("I think the customer is upset."), config);
    let r = c.classify("anything", &SentimentVocabulary::default()).await.unwrap();
    assert_eq!(r.as_tuple(), ("Unknown", "Unknown", "No reasoning provided."));
}

#[tokio::test]
async fn test_labels_outside_vocabulary_are_kept_verbatim() {
    let vocab = SentimentVocabulary::default();
    let c = classifier(&reply_for("Ecstatic", "Bewildered", "made-up labels"));
    let r = c.classify("hi", &vocab).await.unwrap();
    assert_eq!(r.fine_grained_sentiment, "Ecstatic");
    assert_eq!(r.emotion_sentiment, "Bewildered");
    assert!(!vocab.covers(&r));
}

#[tokio::test]
async fn test_partial_reply_is_per_field() {
    let c = classifier("Emotion Sentiment: Grateful\nsome chatter");
    let r = c.classify("thanks!", &SentimentVocabulary::default()).await.unwrap();
    assert_eq!(r.as_tuple(), ("Grateful", "Unknown", ""));
}

#[tokio::test]
async fn test_out_of_order_and_duplicated_lines() {
    let reply = "Thinking: polite follow-up\n\
                 Emotion Sentiment: Hopeful\n\
                 Fine-Grained Sentiment: Informational\n\
                 Fine-Grained Sentiment: Urgent";
    let r = classifier(reply).classify("any update?", &SentimentVocabulary::default()).await.unwrap();
    assert_eq!(r.as_tuple(), ("Hopeful", "Informational", "polite follow-up"));
}

#[tokio::test]
async fn test_request_carries_settings_and_vocabulary() {
    let backend = Arc::new(ScriptedBackend::replying(reply_for("Neutral", "Confused", "-")));
    let config = ClassifierConfig {
        model: Some("llama3-70b-8192".into()),
        surface: Surface::Issue,
        ..ClassifierConfig::default()
    };
    let c = SentimentClassifier::new(backend.clone(), config);
    let vocab = SentimentVocabulary::emotion_wheel();
    c.classify("", &vocab).await.unwrap();

    let reqs = backend.requests();
    assert_eq!(reqs.len(), 1);
    let req = &reqs[0];
    assert_eq!(req.model.as_deref(), Some("llama3-70b-8192"));
    assert_eq!(req.temperature, Some(0.3));
    assert_eq!(req.max_tokens, Some(1024));
    assert_eq!(req.messages[0].content, "You classify GitHub issue sentiments accurately.");
    let prompt = user_prompt(req);
    assert!(prompt.contains(&vocab.render_emotion()));
    assert!(prompt.contains("Description:\n"));
    assert_eq!(c.model_id(), "llama3-70b-8192");
}

#[tokio::test]
async fn test_strict_style_prompt_and_parse() {
    let backend = Arc::new(ScriptedBackend::replying(
        "Fine-Grained Sentiment: Urgent\nEmotion Sentiment: Anxious",
    ));
    let config = ClassifierConfig { style: PromptStyle::Strict, surface: Surface::Ticket, ..ClassifierConfig::default() };
    let c = SentimentClassifier::new(backend.clone(), config);
    let r = c.classify("Site is down!", &SentimentVocabulary::default()).await.unwrap();

    assert_eq!(r.as_tuple(), ("Anxious", "Urgent", ""));
    let prompt = backend.requests()[0].messages[1].content.clone();
    assert!(prompt.contains("only give one word value"));
    assert!(!prompt.contains("Thinking:"));
}

#[tokio::test]
async fn test_transport_fault_is_an_error() {
    let backend = ScriptedBackend::from_fn(|_| {
        Err(pulse_llm::LlmError::ApiError { status: 401, message: "invalid api key".into() })
    });
    let c = SentimentClassifier::new(backend, ClassifierConfig::default());
    let err = c.classify("hi", &SentimentVocabulary::default()).await.unwrap_err();
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_each_call_goes_out_once() {
    let backend = Arc::new(ScriptedBackend::replying(reply_for("Positive", "Happy", "ok")));
    let c = SentimentClassifier::new(backend.clone(), ClassifierConfig::default());
    let vocab = SentimentVocabulary::default();
    c.classify("a", &vocab).await.unwrap();
    c.classify("a", &vocab).await.unwrap();
    assert_eq!(backend.call_count(), 2);
}

#[test]
fn test_result_serializes_with_column_names() {
    let json = serde_json::to_value(ClassificationResult::new("Sad", "Complaint", "late")).unwrap();
    assert_eq!(json["emotion_sentiment"], "Sad");
    assert_eq!(json["fine_grained_sentiment"], "Complaint");
    assert_eq!(json["thinking"], "late");
}

#[tokio::test]
async fn test_multibyte_text_passes_through_unchanged() {
    let backend = Arc::new(ScriptedBackend::replying(&reply_for("Complaint", "Angry", "Broken on arrival.")));
    let c = SentimentClassifier::new(backend.clone(), ClassifierConfig::default());
    let text = "Le colis est arrivé cassé 😡";
    let r = c.classify(text, &SentimentVocabulary::default()).await.unwrap();
    assert_eq!(r.emotion_sentiment, "Angry");
    assert!(user_prompt(&backend.requests()[0]).contains(text));
}
