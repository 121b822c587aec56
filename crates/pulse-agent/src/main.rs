//! Pulse — LLM-driven customer sentiment classification.
//! Entry point for the `pulse` binary.

mod config;

use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use pulse_ingestion::sources::GitHubIssuesClient;
use pulse_ingestion::{analyze_dataset, DatasetStore, EnrichmentPipeline, EnrichmentProgress, EnrichmentSummary};
use pulse_llm::{build_backend, LlmBackend};
use pulse_sentiment::chat::{is_quit, session_log_file_name, QUIT_COMMAND};
use pulse_sentiment::{
    ChatSession, CleanTarget, PromptStyle, SentimentClassifier, SentimentVocabulary, TextCleaner,
    VocabularyPreset,
};
use pulse_web::{build_router, AppState};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{process_env, Config};

type Backend = Arc<dyn LlmBackend>;

#[derive(Parser)]
#[command(name = "pulse", version)]
#[command(about = "Classify customer messages into sentiment and emotion labels")]
struct Cli {
    /// Config file (default: $PULSE_CONFIG or ./pulse.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Label preset: support_triage, polarity or emotion_wheel
    #[arg(long, global = true)]
    vocabulary: Option<VocabularyPreset>,

    /// Prompt style: reasoned or strict
    #[arg(long, global = true)]
    style: Option<PromptStyle>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify one message and print the result as JSON
    Classify {
        text: Option<String>,
        /// Read the message from stdin
        #[arg(long, conflicts_with = "text")]
        stdin: bool,
    },
    /// Enrich a Gmail export into emails_cleaned.csv
    Emails {
        #[arg(long)]
        input: PathBuf,
        /// Run the model cleaning pass over each body first
        #[arg(long)]
        clean: bool,
    },
    /// Fetch GitHub issues and enrich them
    Issues {
        /// owner/name
        #[arg(long)]
        repo: Option<String>,
        #[arg(long)]
        per_page: Option<u32>,
    },
    /// Enrich a ticket CSV, in place unless --output is given
    Tickets {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
        /// Column holding the ticket text
        #[arg(long)]
        column: Option<String>,
    },
    /// Interactive customer-care chat
    Chat {
        /// Classify input as typed, without the cleaning call
        #[arg(long)]
        raw: bool,
    },
    /// Print dashboard statistics for a dataset
    Stats { dataset: String },
    /// Run the web API
    Serve {
        #[arg(long)]
        bind: Option<String>,
    },
}

struct App {
    config: Config,
    vocab: SentimentVocabulary,
    store: DatasetStore,
}

impl App {
    fn new(config: Config) -> Self {
        let vocab = config.vocabulary.resolve();
        let store = DatasetStore::new(&config.data.dir);
        Self { config, vocab, store }
    }

    fn backend(&self) -> anyhow::Result<Backend> {
        let cfg = self.config.llm.backend_config(process_env);
        build_backend(&cfg).context("building LLM backend")
    }

    fn classifier(&self) -> anyhow::Result<SentimentClassifier<Backend>> {
        Ok(SentimentClassifier::new(self.backend()?, self.config.classifier.clone()))
    }

    fn pipeline(&self) -> anyhow::Result<EnrichmentPipeline<Backend>> {
        let (tx, rx) = broadcast::channel(64);
        spawn_progress_logger(rx);
        Ok(EnrichmentPipeline::new(
            self.classifier()?,
            self.vocab.clone(),
            self.store.clone(),
            self.config.pipeline.clone(),
        )
        .with_progress(tx))
    }
}

fn spawn_progress_logger(mut rx: broadcast::Receiver<EnrichmentProgress>) {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(p) => info!(job_id = %p.job_id, completed = p.completed, total = p.total, "Enrichment progress"),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn report(summary: &EnrichmentSummary) -> anyhow::Result<()> {
    info!(
        job_id = %summary.job_id,
        dataset = %summary.dataset,
        rows = summary.rows,
        fully_parsed = summary.fully_parsed,
        duration_ms = summary.duration_ms,
        "Enrichment complete"
    );
    print_json(summary)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    // Logs go to stderr so JSON output on stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pulse=debug,info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(preset) = cli.vocabulary {
        config.vocabulary.preset = preset;
        config.vocabulary.custom = None;
    }
    if let Some(style) = cli.style {
        config.classifier.style = style;
    }
    info!(
        provider = config.llm.provider.as_str(),
        model = %config.llm.model,
        style = %config.classifier.style,
        "Configuration loaded"
    );

    let app = App::new(config);

    match cli.command {
        Command::Classify { text, stdin } => {
            let text = if stdin {
                let mut buf = String::new();
                tokio::io::stdin().read_to_string(&mut buf).await?;
                buf
            } else {
                text.context("pass the message as an argument or use --stdin")?
            };
            let result = app.classifier()?.classify(&text, &app.vocab).await?;
            print_json(&result)?;
        }

        Command::Emails { input, clean } => {
            let pipeline = app.pipeline()?;
            let cleaner = if clean {
                Some(TextCleaner::new(app.backend()?, CleanTarget::EmailBody))
            } else {
                None
            };
            let summary = pipeline.emails(&input, cleaner.as_ref()).await?;
            report(&summary)?;
        }

        Command::Issues { repo, per_page } => {
            let gh = &app.config.github;
            let repo = repo.unwrap_or_else(|| gh.repo.clone());
            let per_page = per_page.unwrap_or(gh.per_page);
            let client = GitHubIssuesClient::new(gh.resolve_token(process_env))?;
            let summary = app.pipeline()?.issues(&client, &repo, per_page).await?;
            report(&summary)?;
        }

        Command::Tickets { input, output, column } => {
            let column = column.unwrap_or_else(|| app.config.tickets.column.clone());
            let summary = app.pipeline()?.tickets(&input, output.as_deref(), &column).await?;
            report(&summary)?;
        }

        Command::Chat { raw } => run_chat(&app, raw).await?,

        Command::Stats { dataset } => {
            let analysis = analyze_dataset(&app.store, &dataset).await?;
            print_json(&analysis.stats)?;
        }

        Command::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| app.config.server.bind.clone());
            let state = AppState::new(
                app.backend()?,
                app.config.classifier.clone(),
                app.vocab.clone(),
                app.store.clone(),
            );
            let router = build_router(state);

            let listener = tokio::net::TcpListener::bind(&bind).await?;
            info!(bind = %bind, data_dir = %app.store.root().display(), "Web API listening");
            axum::serve(listener, router).await?;
        }
    }

    Ok(())
}

async fn run_chat(app: &App, raw: bool) -> anyhow::Result<()> {
    let mut session = ChatSession::new(app.backend()?, app.config.classifier.clone(), app.vocab.clone())
        .with_clean_input(!raw);

    println!("Customer Care Bot (model: {}). Type '{QUIT_COMMAND}' to end the session.", session.model_id());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("You: ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else { break };
        if is_quit(&line) {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }
        match session.handle_turn(&line).await {
            Ok(entry) => {
                println!("Bot: {}", entry.bot_response);
                println!(
                    "     [{} / {}] {}",
                    entry.emotion_sentiment, entry.fine_grained_sentiment, entry.thinking
                );
            }
            Err(e) => warn!(error = %e, "Chat turn failed"),
        }
    }

    let log = session.take_log();
    if log.is_empty() {
        return Ok(());
    }
    let name = session_log_file_name(chrono::Local::now());
    app.store.write(&name, &log).await?;
    println!("Session saved to {}", app.store.path(&name)?.display());
    Ok(())
}
