use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use youtube_feed_sync::config::{Config, LogFormat};
use youtube_feed_sync::{
    Aggregator, DailyScheduler, FeedSink, Fetcher, NotionStore, Pipeline, RecordNormalizer,
};

#[derive(Parser)]
#[command(name = "youtube-feed-sync", about = "Collects YouTube channel videos into JSON, RSS and Notion")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Comma-separated channel ids, overriding YOUTUBE_CHANNELS
    #[arg(long, global = true)]
    channels: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a single sync and exit
    RunOnce,
    /// Sync daily at SCHEDULE_TIME (default)
    Schedule {
        /// Skip the sync that normally runs at startup
        #[arg(long)]
        no_initial_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::from_env().context("Invalid configuration")?;
    if let Some(channels) = &cli.channels {
        config = config.with_channels(channels);
    }

    init_logging(&config);
    config.validate().context("Invalid configuration")?;

    info!(
        "Starting youtube-feed-sync with {} channels (timezone {}, notion {})",
        config.sources.len(),
        config.timezone,
        if config.notion.is_some() { "enabled" } else { "disabled" }
    );

    let pipeline = build_pipeline(&config)?;

    match cli.command.unwrap_or(Command::Schedule { no_initial_run: false }) {
        Command::RunOnce => {
            let report = pipeline.run_once(&config.sources).await;
            if report.exit_code() != 0 {
                error!("Every source failed");
                std::process::exit(report.exit_code());
            }
        }
        Command::Schedule { no_initial_run } => {
            let scheduler = DailyScheduler::new(config.schedule_time, config.timezone);
            let pipeline = &pipeline;
            let sources = &config.sources;
            scheduler
                .run(!no_initial_run, move || async move {
                    pipeline.run_once(sources).await;
                })
                .await;
        }
    }

    info!("youtube-feed-sync finished");
    Ok(())
}

fn build_pipeline(config: &Config) -> Result<Pipeline> {
    let fetcher = Fetcher::new(config.fetch.clone())
        .context("Failed to build HTTP client")?
        .with_timezone(config.timezone);
    let normalizer = RecordNormalizer::new(config.timezone, config.summary_max_words);
    let aggregator = Aggregator::new(Arc::new(fetcher), normalizer, config.fetch.concurrency);

    let mut pipeline = Pipeline::new(
        aggregator,
        config.output_file.clone(),
        config.rss_output_file.clone(),
        FeedSink::new(&config.rss_feed_title),
    )
    .with_timezone(config.timezone);

    if let Some(notion) = &config.notion {
        let mut store = NotionStore::new(&notion.api_key, &notion.database_id)
            .context("Failed to build Notion client")?;
        if let Some(property) = &notion.date_property {
            store = store.with_date_property(property);
        }
        pipeline = pipeline.with_store(Arc::new(store));
        if notion.daily_digest {
            pipeline = pipeline.with_daily_digest(&notion.page_title_prefix);
        }
    }

    Ok(pipeline)
}

fn init_logging(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "youtube_feed_sync=info".into());

    if config.log_format == LogFormat::Json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}
