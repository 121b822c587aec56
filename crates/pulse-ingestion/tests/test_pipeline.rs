//! Enrichment pipelines against scripted backends and a temporary dataset dir.

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use pulse_common::{EmailRecord, PulseError};
use pulse_ingestion::store::{Table, EMAILS_DATASET};
use pulse_ingestion::{DatasetStore, EnrichmentOptions, EnrichmentPipeline};
use pulse_llm::LlmError;
use pulse_sentiment::{CleanTarget, ClassifierConfig, SentimentClassifier, SentimentVocabulary, TextCleaner};
use pulse_test_utils::pretty_assertions::assert_eq;
use pulse_test_utils::{reply_for, user_prompt, ScriptedBackend};
use tokio::sync::broadcast;

/// Thinking echoes the message text; the text `boom` is rejected upstream.
fn echo_backend() -> Arc<ScriptedBackend> {
    Arc::new(ScriptedBackend::from_fn(|req| {
        let text = user_prompt(req).trim_end().rsplit('\n').next().unwrap_or("").to_string();
        if text == "boom" {
            return Err(LlmError::ApiError { status: 500, message: "upstream exploded".into() });
        }
        Ok(reply_for("Complaint", "Frustrated", &text))
    }))
}

fn pipeline(
    backend: Arc<ScriptedBackend>,
    store: DatasetStore,
    concurrency: usize,
    checkpoint_every: usize,
) -> EnrichmentPipeline<Arc<ScriptedBackend>> {
    EnrichmentPipeline::new(
        SentimentClassifier::new(backend, ClassifierConfig::default()),
        SentimentVocabulary::default(),
        store,
        EnrichmentOptions { concurrency, checkpoint_every },
    )
}

fn tickets_csv(texts: &[&str]) -> String {
    let mut out = String::from("Ticket ID,Ticket Description\n");
    for (i, t) in texts.iter().enumerate() {
        out.push_str(&format!("{},{}\n", i + 1, t));
    }
    out
}

#[tokio::test]
async fn test_tickets_enriched_in_place_and_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("tickets.csv");
    let texts = ["late delivery", "wrong size", "broken zipper", "refund please", "no reply", "thanks"];
    std::fs::write(&input, tickets_csv(&texts)).unwrap();

    let p = pipeline(echo_backend(), DatasetStore::new(dir.path()), 3, 4);
    let summary = p.tickets(&input, None, "Ticket Description").await.unwrap();
    assert_eq!(summary.rows, 6);
    assert_eq!(summary.fully_parsed, 6);

    let table = Table::from_csv(&std::fs::read_to_string(&input).unwrap()).unwrap();
    let thinking = table.require_column("thinking").unwrap();
    let emotion = table.require_column("emotion_sentiment").unwrap();
    let got: Vec<&str> = (0..table.rows.len()).map(|r| table.cell(r, thinking)).collect();
    assert_eq!(got, texts.to_vec());
    assert!((0..table.rows.len()).all(|r| table.cell(r, emotion) == "Frustrated"));
    // Existing columns are untouched.
    assert_eq!(table.cell(5, table.require_column("Ticket ID").unwrap()), "6");
}

#[tokio::test]
async fn test_tickets_written_to_separate_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.csv");
    let output = dir.path().join("out.csv");
    let original = tickets_csv(&["hello"]);
    std::fs::write(&input, &original).unwrap();

    pipeline(echo_backend(), DatasetStore::new(dir.path()), 1, 10)
        .tickets(&input, Some(&output), "Ticket Description")
        .await
        .unwrap();

    assert_eq!(std::fs::read_to_string(&input).unwrap(), original);
    assert!(std::fs::read_to_string(&output).unwrap().contains("Frustrated"));
}

#[tokio::test]
async fn test_missing_text_column_fails_before_any_call() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("tickets.csv");
    std::fs::write(&input, "id,body\n1,hi\n").unwrap();
    let backend = echo_backend();

    let err = pipeline(backend.clone(), DatasetStore::new(dir.path()), 2, 10)
        .tickets(&input, None, "Ticket Description")
        .await
        .unwrap_err();

    assert!(matches!(err, PulseError::MissingField { ref field } if field == "Ticket Description"));
    assert_eq!(backend.call_count(), 0);
    assert_eq!(std::fs::read_to_string(&input).unwrap(), "id,body\n1,hi\n");
}

#[tokio::test]
async fn test_missing_ticket_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = pipeline(echo_backend(), DatasetStore::new(dir.path()), 1, 10)
        .tickets(&dir.path().join("nope.csv"), None, "Ticket Description")
        .await
        .unwrap_err();
    assert!(matches!(err, PulseError::DatasetNotFound(_)));
}

#[tokio::test]
async fn test_failure_keeps_completed_checkpoints() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("tickets.csv");
    std::fs::write(&input, tickets_csv(&["a", "b", "boom", "d", "e"])).unwrap();
    let backend = echo_backend();

    let err = pipeline(backend.clone(), DatasetStore::new(dir.path()), 1, 2)
        .tickets(&input, None, "Ticket Description")
        .await
        .unwrap_err();
    assert!(matches!(err, PulseError::Remote { .. }));
    // The third checkpoint is never started.
    assert_eq!(backend.call_count(), 4);

    let table = Table::from_csv(&std::fs::read_to_string(&input).unwrap()).unwrap();
    let thinking = table.require_column("thinking").unwrap();
    let got: Vec<&str> = (0..table.rows.len()).map(|r| table.cell(r, thinking)).collect();
    assert_eq!(got, vec!["a", "b", "", "d", ""]);
}

#[tokio::test]
async fn test_progress_after_each_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("tickets.csv");
    std::fs::write(&input, tickets_csv(&["a", "b", "c", "d", "e"])).unwrap();
    let (tx, mut rx) = broadcast::channel(16);

    let summary = pipeline(echo_backend(), DatasetStore::new(dir.path()), 2, 2)
        .with_progress(tx)
        .tickets(&input, None, "Ticket Description")
        .await
        .unwrap();

    let mut completed = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        assert_eq!(ev.job_id, summary.job_id);
        assert_eq!(ev.total, 5);
        completed.push(ev.completed);
    }
    assert_eq!(completed, vec![2, 4, 5]);
}

#[tokio::test]
async fn test_empty_ticket_file_still_written() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("tickets.csv");
    let output = dir.path().join("out.csv");
    std::fs::write(&input, "Ticket Description\n").unwrap();
    let backend = echo_backend();

    let summary = pipeline(backend.clone(), DatasetStore::new(dir.path()), 1, 10)
        .tickets(&input, Some(&output), "Ticket Description")
        .await
        .unwrap();

    assert_eq!(summary.rows, 0);
    assert_eq!(backend.call_count(), 0);
    let header = std::fs::read_to_string(&output).unwrap();
    assert!(header.starts_with("Ticket Description,emotion_sentiment,fine_grained_sentiment,thinking"));
}

fn gmail_message(from: &str, html: &str) -> serde_json::Value {
    serde_json::json!({
        "id": from,
        "payload": {
            "mimeType": "text/html",
            "headers": [
                { "name": "From", "value": from },
                { "name": "Subject", "value": "Order" },
                { "name": "Date", "value": "Mon, 3 Mar 2025 10:00:00 +0000" }
            ],
            "body": { "data": URL_SAFE_NO_PAD.encode(html) }
        }
    })
}

#[tokio::test]
async fn test_email_export_to_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let export = dir.path().join("export.json");
    let messages = serde_json::json!([
        gmail_message("\"Ann\" <ann@example.com>", "<p>Where is my order?</p>"),
        gmail_message("bob@example.com", "<b>Package   arrived broken</b>"),
    ]);
    std::fs::write(&export, messages.to_string()).unwrap();
    let store = DatasetStore::new(dir.path());

    let summary = pipeline(echo_backend(), store.clone(), 2, 10).emails(&export, None).await.unwrap();
    assert_eq!(summary.rows, 2);

    let rows: Vec<EmailRecord> = store.read(EMAILS_DATASET).await.unwrap();
    assert_eq!(rows[0].src_name, "Ann");
    assert_eq!(rows[0].thinking, "Where is my order?");
    assert_eq!(rows[1].src_email, "bob@example.com");
    assert_eq!(rows[1].thinking, "Package arrived broken");
    assert!(rows.iter().all(|r| r.new_body.is_empty()));
}

#[tokio::test]
async fn test_email_cleaning_pass_feeds_classifier() {
    let dir = tempfile::tempdir().unwrap();
    let export = dir.path().join("export.json");
    std::fs::write(&export, gmail_message("c@example.com", "<p>hi</p> -- sent from my phone").to_string()).unwrap();
    let store = DatasetStore::new(dir.path());

    let cleaner_backend = Arc::new(ScriptedBackend::replying("hi"));
    let cleaner = TextCleaner::new(cleaner_backend.clone(), CleanTarget::EmailBody);
    pipeline(echo_backend(), store.clone(), 1, 10).emails(&export, Some(&cleaner)).await.unwrap();

    let rows: Vec<EmailRecord> = store.read(EMAILS_DATASET).await.unwrap();
    assert_eq!(cleaner_backend.call_count(), 1);
    assert!(user_prompt(&cleaner_backend.requests()[0]).contains("<p>hi</p> -- sent from my phone"));
    assert_eq!(rows[0].clean_body, "hi -- sent from my phone");
    assert_eq!(rows[0].new_body, "hi");
    assert_eq!(rows[0].thinking, "hi");
}
