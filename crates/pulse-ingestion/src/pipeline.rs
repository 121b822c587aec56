//! Enrichment pipelines: read rows, classify them, write them back.
//!
//! Rows are classified in checkpoints of `checkpoint_every`, each checkpoint
//! dispatched with bounded concurrency and persisted before the next one
//! starts. A row that fails aborts the run, but only after everything
//! classified so far has been written.
//!
//! Progress events go out on an optional broadcast channel so the CLI and
//! the web layer can follow a run.

use std::path::{Path, PathBuf};
use std::time::Instant;

use futures_util::stream::{self, StreamExt};
use pulse_common::{ClassificationResult, PulseError, Result, SentimentRecord};
use pulse_llm::LlmBackend;
use pulse_sentiment::{classify_batch, SentimentClassifier, SentimentVocabulary, Surface, TextCleaner};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::email::load_export;
use crate::sources::GitHubIssuesClient;
use crate::store::{
    records_to_csv, write_atomic, DatasetStore, Table, EMAILS_DATASET, EMOTION_COLUMN,
    FINE_GRAINED_COLUMN, ISSUES_DATASET, ISSUES_SENTIMENT_DATASET, THINKING_COLUMN,
};

pub const DEFAULT_TICKET_COLUMN: &str = "Ticket Description";

// ── Options ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentOptions {
    /// Classification calls in flight at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Rows per persisted checkpoint.
    #[serde(default = "default_checkpoint_every")]
    pub checkpoint_every: usize,
}

fn default_concurrency()     -> usize { pulse_sentiment::DEFAULT_CONCURRENCY }
fn default_checkpoint_every() -> usize { 10 }

impl Default for EnrichmentOptions {
    fn default() -> Self {
        Self { concurrency: default_concurrency(), checkpoint_every: default_checkpoint_every() }
    }
}

// ── Progress / summary ────────────────────────────────────────────────────────

/// Emitted after every checkpoint.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichmentProgress {
    pub job_id: Uuid,
    pub dataset: String,
    pub completed: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrichmentSummary {
    pub job_id: Uuid,
    pub dataset: String,
    pub rows: usize,
    /// Rows where both labels were recovered from the reply.
    pub fully_parsed: usize,
    pub duration_ms: u64,
}

// ── Targets ───────────────────────────────────────────────────────────────────

/// Rows that can receive sentiment columns and be serialized back to CSV.
pub trait Enrichable {
    fn row_count(&self) -> usize;
    fn row_text(&self, row: usize) -> &str;
    fn apply(&mut self, row: usize, result: &ClassificationResult);
    fn to_csv(&self) -> Result<Vec<u8>>;
}

impl<R: SentimentRecord + Serialize> Enrichable for Vec<R> {
    fn row_count(&self) -> usize { self.len() }
    fn row_text(&self, row: usize) -> &str { self[row].sentiment_text() }
    fn apply(&mut self, row: usize, result: &ClassificationResult) { self[row].apply_sentiment(result) }
    fn to_csv(&self) -> Result<Vec<u8>> { records_to_csv(self.as_slice()) }
}

/// An arbitrary CSV whose text lives in a named column.
pub struct TicketTable {
    table: Table,
    text_col: usize,
    emotion_col: usize,
    fine_col: usize,
    thinking_col: usize,
}

impl TicketTable {
    /// Fails with `MissingField` when `text_column` is absent.
    pub fn new(mut table: Table, text_column: &str) -> Result<Self> {
        let text_col = table.require_column(text_column)?;
        let emotion_col = table.ensure_column(EMOTION_COLUMN);
        let fine_col = table.ensure_column(FINE_GRAINED_COLUMN);
        let thinking_col = table.ensure_column(THINKING_COLUMN);
        Ok(Self { table, text_col, emotion_col, fine_col, thinking_col })
    }

    pub fn table(&self) -> &Table {
        &self.table
    }
}

impl Enrichable for TicketTable {
    fn row_count(&self) -> usize { self.table.rows.len() }
    fn row_text(&self, row: usize) -> &str { self.table.cell(row, self.text_col) }

    fn apply(&mut self, row: usize, result: &ClassificationResult) {
        self.table.set(row, self.emotion_col, result.emotion_sentiment.as_str());
        self.table.set(row, self.fine_col, result.fine_grained_sentiment.as_str());
        self.table.set(row, self.thinking_col, result.thinking.as_str());
    }

    fn to_csv(&self) -> Result<Vec<u8>> { self.table.to_csv() }
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

pub struct EnrichmentPipeline<B> {
    classifier: SentimentClassifier<B>,
    vocab: SentimentVocabulary,
    store: DatasetStore,
    options: EnrichmentOptions,
    progress_tx: Option<broadcast::Sender<EnrichmentProgress>>,
}

impl<B: LlmBackend + Clone> EnrichmentPipeline<B> {
    pub fn new(
        classifier: SentimentClassifier<B>,
        vocab: SentimentVocabulary,
        store: DatasetStore,
        options: EnrichmentOptions,
    ) -> Self {
        Self { classifier, vocab, store, options, progress_tx: None }
    }

    pub fn with_progress(mut self, tx: broadcast::Sender<EnrichmentProgress>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    pub fn store(&self) -> &DatasetStore {
        &self.store
    }

    /// Classify every row of `target`, checkpointing to `dest`.
    #[instrument(skip(self, target), fields(rows = target.row_count()))]
    pub async fn enrich<T: Enrichable>(
        &self,
        target: &mut T,
        dest: &Path,
        surface: Surface,
    ) -> Result<EnrichmentSummary> {
        let job_id = Uuid::new_v4();
        let t0 = Instant::now();
        let dataset = dest.display().to_string();
        let classifier = self.classifier.for_surface(surface);
        let total = target.row_count();
        let step = self.options.checkpoint_every.max(1);
        let mut fully_parsed = 0;

        info!(job_id = %job_id, dataset = %dataset, total, "Starting enrichment");

        for start in (0..total).step_by(step) {
            let end = (start + step).min(total);
            let texts: Vec<String> = (start..end).map(|i| target.row_text(i).to_string()).collect();
            let results = classify_batch(&classifier, &texts[..], &self.vocab, self.options.concurrency).await;

            let mut failure = None;
            for (offset, result) in results.into_iter().enumerate() {
                match result {
                    Ok(r) => {
                        if r.is_fully_parsed() {
                            fully_parsed += 1;
                        }
                        target.apply(start + offset, &r);
                    }
                    Err(e) if failure.is_none() => failure = Some((start + offset, e)),
                    Err(_) => {}
                }
            }

            write_atomic(dest, &target.to_csv()?).await?;
            if let Some(tx) = &self.progress_tx {
                let _ = tx.send(EnrichmentProgress { job_id, dataset: dataset.clone(), completed: end, total });
            }

            if let Some((row, e)) = failure {
                warn!(job_id = %job_id, row, error = %e, "Aborting enrichment after checkpoint");
                return Err(e.into());
            }
            info!(job_id = %job_id, completed = end, total, "Checkpoint written");
        }

        // Nothing to classify still leaves a well-formed output file.
        if total == 0 {
            write_atomic(dest, &target.to_csv()?).await?;
        }

        Ok(EnrichmentSummary {
            job_id,
            dataset,
            rows: total,
            fully_parsed,
            duration_ms: t0.elapsed().as_millis() as u64,
        })
    }

    /// Gmail export → `emails_cleaned.csv`, optionally model-cleaning each body first.
///
/// The cleaning pass sees the raw decoded body, markup included.
    pub async fn emails(
        &self,
        export: &Path,
        cleaner: Option<&TextCleaner<B>>,
    ) -> Result<EnrichmentSummary> {
        let mut records = load_export(export).await?;

        if let Some(cleaner) = cleaner {
            let cleaned: Vec<std::result::Result<String, pulse_llm::LlmError>> = stream::iter(records.iter())
                .map(|r| cleaner.clean(&r.body))
                .buffered(self.options.concurrency.max(1))
                .collect()
                .await;
            for (record, body) in records.iter_mut().zip(cleaned) {
                record.new_body = body?;
            }
        }

        let dest = self.store.path(EMAILS_DATASET)?;
        self.enrich(&mut records, &dest, Surface::Email).await
    }

    /// Fetch issues, keep the raw `github_issues.csv`, enrich into
    /// `github_issues_with_sentiment.csv`.
    pub async fn issues(
        &self,
        client: &GitHubIssuesClient,
        repo: &str,
        per_page: u32,
    ) -> Result<EnrichmentSummary> {
        let mut issues = client.fetch_issues(repo, per_page).await?;
        self.store.write(ISSUES_DATASET, &issues).await?;
        let dest = self.store.path(ISSUES_SENTIMENT_DATASET)?;
        self.enrich(&mut issues, &dest, Surface::Issue).await
    }

    /// Enrich an arbitrary ticket CSV, in place unless `output` is given.
    ///
    /// The text column is checked before any model call is made.
    pub async fn tickets(
        &self,
        input: &Path,
        output: Option<&Path>,
        column: &str,
    ) -> Result<EnrichmentSummary> {
        let content = match tokio::fs::read_to_string(input).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PulseError::DatasetNotFound(input.display().to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        let mut tickets = TicketTable::new(Table::from_csv(&content)?, column)?;
        let dest: PathBuf = output.unwrap_or(input).to_path_buf();
        self.enrich(&mut tickets, &dest, Surface::Ticket).await
    }
}
