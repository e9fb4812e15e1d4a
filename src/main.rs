//! # Doc Distill CLI (`distill`)
//!
//! The `distill` binary drives the acquisition-and-summarization service.
//!
//! ## Usage
//!
//! ```bash
//! distill --config ./config/distill.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `distill init` | Create the SQLite database and run schema migrations |
//! | `distill serve` | Start the JSON HTTP API server |
//! | `distill run <url>` | Acquire and summarize one URL in the foreground |
//! | `distill stats` | Print job and summary counts |
//!
//! API credentials are read from the environment (variable names are
//! configurable): `SCRAPER_API_KEY` for the scraping provider and
//! `INFERENCE_API_KEY` for the summarizer's remote tier. A missing key
//! degrades the corresponding tier instead of aborting.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

use doc_distill::acquire::ScrapeClient;
use doc_distill::artifact::ArtifactWriter;
use doc_distill::config::{self, Config};
use doc_distill::fetch::FallbackFetcher;
use doc_distill::models::JobState;
use doc_distill::pipeline::Pipeline;
use doc_distill::store::Store;
use doc_distill::summarize::Summarizer;
use doc_distill::{db, migrate, server};

/// Doc Distill — a resilient documentation acquisition and summarization
/// service.
#[derive(Parser)]
#[command(
    name = "distill",
    about = "Doc Distill — acquire, summarize, and archive documentation pages",
    version,
    long_about = "Doc Distill scrapes documentation pages through an upstream provider \
    (with a direct-fetch fallback), extracts their text, produces a Markdown summary through \
    a tiered summarizer, and persists everything to SQLite plus on-disk artifacts. \
    It runs as a one-shot CLI or as a JSON HTTP API server."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/distill.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the jobs/summaries tables.
    /// Idempotent — running it multiple times is safe.
    Init,

    /// Start the JSON HTTP API server.
    ///
    /// Binds to the address configured in `[server].bind` and serves
    /// job submission, summary retrieval, and stats endpoints.
    Serve,

    /// Acquire and summarize one URL in the foreground.
    ///
    /// Runs the full pipeline for a single URL and prints the resulting
    /// job state. Useful for smoke-testing configuration and credentials.
    Run {
        /// The documentation URL to acquire.
        url: String,

        /// Maximum pages the provider may crawl (overrides config).
        #[arg(long)]
        max_pages: Option<u32>,

        /// Maximum crawl depth (overrides config).
        #[arg(long)]
        max_depth: Option<u32>,
    },

    /// Print job and summary counts.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "doc_distill=info,distill=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg.db.path).await?;
            migrate::run_migrations(&pool).await?;
            println!("Database initialized at {}", cfg.db.path.display());
        }
        Commands::Serve => {
            let pool = db::connect(&cfg.db.path).await?;
            migrate::run_migrations(&pool).await?;
            let store = Store::new(pool);
            let pipeline = Arc::new(build_pipeline(&cfg, store.clone())?);
            server::run_server(
                &cfg.server.bind,
                store,
                pipeline,
                cfg.scraper.max_pages,
                cfg.scraper.max_depth,
            )
            .await?;
        }
        Commands::Run {
            url,
            max_pages,
            max_depth,
        } => {
            let pool = db::connect(&cfg.db.path).await?;
            migrate::run_migrations(&pool).await?;
            let store = Store::new(pool);
            let pipeline = build_pipeline(&cfg, store.clone())?;

            let max_pages = max_pages.unwrap_or(cfg.scraper.max_pages);
            let max_depth = max_depth.unwrap_or(cfg.scraper.max_depth);

            let job_id = store.create_job(&url).await?;
            pipeline.run(&job_id, &url, max_pages, max_depth).await;

            match store.get_job(&job_id).await? {
                Some(job) if job.status == JobState::Completed => {
                    println!("Completed: job {}", job.id);
                    if let Some(summary) = store.get_summary_for_job(&job.id).await? {
                        println!("Artifact: {}", summary.filename);
                    }
                }
                Some(job) => {
                    println!(
                        "{}: job {} ({})",
                        job.status,
                        job.id,
                        job.error.as_deref().unwrap_or("no error recorded")
                    );
                }
                None => anyhow::bail!("job {} disappeared from the store", job_id),
            }
        }
        Commands::Stats => {
            let pool = db::connect(&cfg.db.path).await?;
            migrate::run_migrations(&pool).await?;
            let stats = Store::new(pool).stats().await?;
            println!("Summaries: {}", stats.total_summaries);
            println!(
                "Jobs: {} total, {} completed, {} failed",
                stats.total_jobs, stats.completed_jobs, stats.failed_jobs
            );
        }
    }

    Ok(())
}

/// Wires the pipeline from configuration. Missing API keys degrade their
/// tier (provider submission still runs unauthenticated; the summarizer
/// drops to its local tier sooner) rather than aborting startup.
fn build_pipeline(cfg: &Config, store: Store) -> anyhow::Result<Pipeline> {
    let scraper_key = api_key(&cfg.scraper.api_key_env);
    let inference_key = api_key(&cfg.summarizer.api_key_env);

    Ok(Pipeline::new(
        store,
        ScrapeClient::new(&cfg.scraper, scraper_key)?,
        FallbackFetcher::new(&cfg.fallback)?,
        Summarizer::new(&cfg.summarizer, inference_key)?,
        ArtifactWriter::new(&cfg.artifacts.dir)?,
    ))
}

fn api_key(env_name: &str) -> Option<String> {
    match std::env::var(env_name) {
        Ok(key) if !key.trim().is_empty() => Some(key),
        _ => {
            warn!(var = env_name, "API key not set, requests will be unauthenticated");
            None
        }
    }
}
