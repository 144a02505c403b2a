mod analyze;
mod api_types;
mod config;
mod dashboard;
mod fetch;
mod forecast;
mod graph;
mod models;
mod orchestrator;
mod out_models;
mod render;
mod store;
mod timeseries;
mod tokens;
mod viz_export;

use anyhow::Result;
use chrono::Utc;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::analyze::TextAnalyticsClient;
use crate::config::{parse_bucket_width, parse_timezone, DashboardConfig, IngestCredentials};
use crate::dashboard::DashboardState;
use crate::forecast::TrendForecaster;
use crate::orchestrator::{run_ingest, run_refresh};
use crate::store::CsvFolder;

/// Opinion Vibes - page post sentiment ingestion and dashboard generator
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Folder holding the timestamped CSV snapshots
    #[arg(long, global = true, env = "CSV_FOLDER", default_value = "datos")]
    csv_folder: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch page posts, score their sentiment and store a CSV snapshot
    Ingest(IngestArgs),
    /// Rebuild the dashboard outputs from the newest CSV snapshot
    Render(RenderArgs),
}

#[derive(ClapArgs, Debug)]
struct IngestArgs {
    #[arg(long, env = "FACEBOOK_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    #[arg(long, env = "META_PAGE_ID")]
    page_id: Option<String>,

    #[arg(long, env = "AZURE_TEXT_KEY", hide_env_values = true)]
    text_key: Option<String>,

    #[arg(long, env = "AZURE_TEXT_ENDPOINT")]
    text_endpoint: Option<String>,

    /// Language hint sent with each document; omitted when unset
    #[arg(long, env = "AZURE_TEXT_LANGUAGE")]
    language: Option<String>,

    #[arg(long, env = "GRAPH_API_VERSION", default_value = "v19.0")]
    graph_version: String,

    /// Documents per sentiment request
    #[arg(long, env = "SENTIMENT_BATCH_SIZE", default_value_t = 10)]
    batch_size: usize,

    /// Feed pages to follow per run
    #[arg(long, env = "FEED_MAX_PAGES", default_value_t = 1)]
    max_pages: usize,

    /// Repeat every N seconds instead of running once
    #[arg(long)]
    interval_secs: Option<u64>,
}

#[derive(ClapArgs, Debug)]
struct RenderArgs {
    /// Output directory for generated files
    #[arg(short, long, env = "OUTPUT_DIR", default_value = "out")]
    output_dir: PathBuf,

    /// Most frequent words kept as graph nodes
    #[arg(long, env = "TOP_WORDS", default_value_t = 25)]
    top_words: usize,

    /// Buckets to forecast past the last observation
    #[arg(long, env = "FORECAST_HORIZON", default_value_t = 8)]
    forecast_horizon: usize,

    /// Resampling bucket, e.g. 1h, 30min, 1d
    #[arg(long, env = "BUCKET_WIDTH", default_value = "1h")]
    bucket_width: String,

    /// Coverage of the forecast band
    #[arg(long, env = "FORECAST_INTERVAL", default_value_t = 0.95)]
    interval_width: f64,

    /// Timezone for the "last update" stamp
    #[arg(long, env = "DASHBOARD_TZ", default_value = "UTC")]
    timezone: String,

    /// Repeat every N seconds instead of running once
    #[arg(long)]
    interval_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(true)
        .init();

    info!("Starting opinion_vibes");

    let args = Args::parse();
    debug!("CSV folder - path={}", args.csv_folder.display());

    match args.command {
        Command::Ingest(a) => {
            let cfg = IngestCredentials::from_parts(a.access_token, a.page_id, a.text_key, a.text_endpoint)?
                .into_config(a.language, a.graph_version, a.batch_size, a.max_pages);
            let client = reqwest::Client::new();
            let classifier = TextAnalyticsClient::new(client.clone(), &cfg);
            let store = CsvFolder::new(&args.csv_folder);

            match a.interval_secs {
                None => {
                    run_ingest(&client, &cfg, &classifier, &store).await?;
                }
                Some(secs) => {
                    info!("Ingestion loop - interval={}s", secs);
                    let mut tick = tokio::time::interval(Duration::from_secs(secs.max(1)));
                    loop {
                        tick.tick().await;
                        if let Err(e) = run_ingest(&client, &cfg, &classifier, &store).await {
                            error!("Ingestion failed - error={:#}", e);
                        }
                    }
                }
            }
        }
        Command::Render(a) => {
            let cfg = DashboardConfig {
                csv_folder: args.csv_folder.clone(),
                top_words: a.top_words,
                forecast_horizon: a.forecast_horizon,
                bucket_width: parse_bucket_width(&a.bucket_width)?,
                interval_width: a.interval_width,
                timezone: parse_timezone(&a.timezone)?,
            };
            let source = CsvFolder::new(&cfg.csv_folder);
            let forecaster = TrendForecaster::new(cfg.interval_width);
            let mut state = DashboardState::new();

            match a.interval_secs {
                None => {
                    run_refresh(&mut state, &source, &cfg, &forecaster, &a.output_dir, Utc::now())?;
                }
                Some(secs) => {
                    info!("Dashboard loop - interval={}s, output_dir={}", secs, a.output_dir.display());
                    let mut tick = tokio::time::interval(Duration::from_secs(secs.max(1)));
                    loop {
                        tick.tick().await;
                        if let Err(e) = run_refresh(&mut state, &source, &cfg, &forecaster, &a.output_dir, Utc::now()) {
                            error!("Dashboard refresh failed - error={:#}", e);
                        }
                    }
                }
            }
        }
    }

    Ok(())
}
