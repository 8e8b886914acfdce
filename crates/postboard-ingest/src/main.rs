//! Postboard ingestion daemon.
//!
//! Listens for announcements (a Telegram channel, or a JSONL replay), parses
//! them into records and writes them to ClickHouse.
//!
//! # Usage
//!
//! ```bash
//! # Listen to a Telegram channel (token and chat id from env or .env)
//! postboard-ingest --source telegram
//!
//! # Replay a backfill file
//! postboard-ingest --source jsonl --input ./backfill.jsonl
//!
//! # Custom store location
//! postboard-ingest \
//!     --clickhouse-url http://clickhouse:8123 \
//!     --clickhouse-db postboard \
//!     --clickhouse-table posts
//! ```
//!
//! # Graceful Shutdown
//!
//! The daemon handles SIGINT (Ctrl+C) and SIGTERM:
//! 1. Stops taking new events from the source
//! 2. Lets the parser and persister drain what is already in flight
//! 3. Prints a summary and exits

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use postboard_core::metrics::{init_metrics, start_metrics_server};
use postboard_core::RawEvent;
use postboard_ingest::{
    EventSource, JsonlConfig, JsonlSource, Persister, Pipeline, PipelineConfig, Relay, Shutdown,
    SourceStats, TelegramConfig, TelegramSource,
};
use postboard_store::{ClickHouseConfig, ClickHouseStore, Store, StoreTimeouts};
use tracing_subscriber::EnvFilter;

/// Where raw announcements come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SourceKind {
    /// Long-poll a Telegram channel
    Telegram,
    /// Replay RawEvent JSON lines from a file, directory or stdin
    Jsonl,
}

/// Postboard ingestion daemon.
#[derive(Parser, Debug)]
#[command(name = "postboard-ingest")]
#[command(about = "Parse channel announcements into searchable records")]
#[command(version)]
struct Args {
    /// Event source
    #[arg(long, value_enum, default_value = "telegram", env = "POSTBOARD_SOURCE")]
    source: SourceKind,

    /// Telegram bot token
    #[arg(long, env = "TELEGRAM_TOKEN", hide_env_values = true)]
    telegram_token: Option<String>,

    /// Telegram channel id to accept posts from
    #[arg(long, env = "TELEGRAM_CHAT_ID", allow_hyphen_values = true)]
    telegram_chat_id: Option<i64>,

    /// JSONL input file or directory (`-` for stdin)
    #[arg(long, short, default_value = "-")]
    input: PathBuf,

    /// ClickHouse URL
    #[arg(long, env = "CLICKHOUSE_URL", default_value = "http://localhost:8123")]
    clickhouse_url: String,

    /// ClickHouse database name
    #[arg(long, env = "CLICKHOUSE_DATABASE", default_value = "postboard")]
    clickhouse_db: String,

    /// ClickHouse table name
    #[arg(long, env = "CLICKHOUSE_TABLE", default_value = "posts")]
    clickhouse_table: String,

    /// Capacity of each pipeline relay
    #[arg(long, default_value = "100")]
    relay_capacity: usize,

    /// Metrics HTTP server port (0 to disable)
    #[arg(long, env = "POSTBOARD_METRICS_PORT", default_value = "9090")]
    metrics_port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Optional .env file; real environment variables win.
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,postboard_ingest=debug")),
        )
        .init();

    let args = Args::parse();

    tracing::info!("Postboard ingestion daemon starting...");

    // Initialize metrics
    if args.metrics_port > 0 {
        let metrics_handle = init_metrics();
        start_metrics_server(args.metrics_port, metrics_handle)
            .await
            .context("Failed to start metrics server")?;
    }

    // Set up graceful shutdown
    let shutdown = Shutdown::new();
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || {
            tracing::info!("Shutdown signal received, stopping gracefully...");
            shutdown.trigger();
        })
        .context("Failed to set Ctrl+C handler")?;
    }

    tracing::info!("Configuration:");
    tracing::info!("  Source: {:?}", args.source);
    tracing::info!("  ClickHouse: {}", args.clickhouse_url);
    tracing::info!("  Database: {}", args.clickhouse_db);
    tracing::info!("  Table: {}", args.clickhouse_table);
    tracing::info!("  Relay capacity: {}", args.relay_capacity);

    // Connect to the store and make sure the indexes exist
    let store = Store::new(
        std::sync::Arc::new(ClickHouseStore::new(ClickHouseConfig {
            url: args.clickhouse_url.clone(),
            database: args.clickhouse_db.clone(),
            table: args.clickhouse_table.clone(),
        })),
        StoreTimeouts::default(),
    );
    store
        .ping()
        .await
        .with_context(|| format!("Failed to reach ClickHouse at {}", args.clickhouse_url))?;
    Persister::new(store.clone())
        .ensure_indexes()
        .await
        .context("Failed to create indexes")?;

    // Start the parser and persister
    let pipeline = Pipeline::start(
        store,
        &PipelineConfig {
            relay_capacity: args.relay_capacity,
        },
    );

    // Run the listener until the source is exhausted or we are asked to stop
    let source_stats = match args.source {
        SourceKind::Telegram => {
            let config = TelegramConfig::new(
                args.telegram_token.clone().unwrap_or_default(),
                args.telegram_chat_id.unwrap_or_default(),
            );
            let source = TelegramSource::connect(config)
                .await
                .context("Failed to create bot")?;
            run_source(source, pipeline.intake(), shutdown.clone()).await
        }
        SourceKind::Jsonl => {
            let source = JsonlSource::new(JsonlConfig {
                input: args.input.clone(),
                ..Default::default()
            });
            run_source(source, pipeline.intake(), shutdown.clone()).await
        }
    };

    // Drain whatever is already in flight
    tracing::info!("Shutting down...");
    let pipeline_stats = pipeline.shutdown().await?;
    let source_stats = source_stats?;

    // Print summary
    tracing::info!("═══════════════════════════════════════════════════════");
    tracing::info!("SHUTDOWN COMPLETE");
    tracing::info!("═══════════════════════════════════════════════════════");
    tracing::info!("Events received:      {}", source_stats.total_events);
    tracing::info!("Events skipped:       {}", source_stats.skipped);
    tracing::info!("Events dropped:       {}", source_stats.dropped);
    tracing::info!("Records parsed:       {}", pipeline_stats.parser.forwarded);
    tracing::info!("Parse failures:       {}", pipeline_stats.parser.rejected);
    tracing::info!("Records dropped:      {}", pipeline_stats.parser.dropped);
    tracing::info!("Records saved:        {}", pipeline_stats.persister.saved);
    tracing::info!("Save failures:        {}", pipeline_stats.persister.failed);

    Ok(())
}

async fn run_source<S: EventSource>(
    mut source: S,
    relay: Relay<RawEvent>,
    shutdown: Shutdown,
) -> Result<SourceStats> {
    tracing::info!("Starting {} source...", source.name());
    source
        .run(relay, shutdown)
        .await
        .with_context(|| format!("{} source failed", source.name()))
}
