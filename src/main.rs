//! CLI entry point for the Amana transportation tracker.
//!
//! Provides subcommands for taking a single snapshot of the live transit
//! feed, normalizing a saved payload, and running the polling dashboard.

mod config;

use crate::config::TrackerConfig;
use amana_transit::{
    fetch::BasicClient,
    output::{log_dashboard, print_pretty, render_json},
    pipeline::{RefreshOutcome, fetch_snapshot, fetch_snapshot_at, snapshot_from_bytes},
    poller::Poller,
    schedule::parse_hhmm,
    stats::SnapshotStats,
};
use anyhow::Result;
use chrono::{Local, NaiveTime};
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "amana_transit")]
#[command(about = "Live bus tracking and schedule dashboard for the Amana transit feed", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the live feed once and print the normalized snapshot as JSON
    Snapshot {
        /// Override the transit API URL
        #[arg(long)]
        url: Option<String>,

        /// Pretty-print the JSON
        #[arg(short, long, default_value_t = false)]
        pretty: bool,
    },
    /// Normalize a payload from a file or URL
    Normalize {
        /// Path to a JSON file or URL to fetch
        #[arg(value_name = "FILE_OR_URL")]
        source: String,

        /// Reference time of day (HH:MM) for next-stop resolution; defaults to now
        #[arg(long, value_name = "HH:MM")]
        at: Option<String>,
    },
    /// Poll the live feed and log the dashboard after every refresh
    Watch {
        /// Override the transit API URL
        #[arg(long)]
        url: Option<String>,

        /// Refresh interval in seconds
        #[arg(short, long)]
        interval: Option<u64>,

        /// Number of refreshes to show (0 = infinite)
        #[arg(short = 'n', long, default_value_t = 0)]
        num_refreshes: u64,

        /// Bus display id to select once data is loaded (e.g. "Bus 2")
        #[arg(short, long)]
        select: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/amana_transit.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("amana_transit.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let mut config = TrackerConfig::from_env()?;

    match cli.command {
        Commands::Snapshot { url, pretty } => {
            if let Some(url) = url {
                config.api_url = url;
            }
            let client = BasicClient::with_timeout(config.request_timeout)?;
            let outcome = fetch_snapshot(&client, &config.api_url).await;
            report(&outcome);
            println!("{}", render_json(outcome.snapshot(), pretty)?);
        }
        Commands::Normalize { source, at } => {
            let now = match at {
                Some(at) => parse_hhmm(&at)?,
                None => Local::now().time(),
            };
            let outcome = normalizer(&source, now, config.request_timeout).await?;
            report(&outcome);
            print_pretty(outcome.snapshot());
            println!("{}", render_json(outcome.snapshot(), true)?);
        }
        Commands::Watch {
            url,
            interval,
            num_refreshes,
            select,
        } => {
            if let Some(url) = url {
                config.api_url = url;
            }
            if let Some(secs) = interval {
                anyhow::ensure!(secs > 0, "--interval must be greater than zero");
                config.refresh_interval = Duration::from_secs(secs);
            }
            watch(&config, num_refreshes, select).await?;
        }
    }

    Ok(())
}

/// Loads a payload from a local file path or fetches it over HTTP, then normalizes it.
#[tracing::instrument(skip_all, fields(source = %source))]
async fn normalizer(source: &str, now: NaiveTime, timeout: Duration) -> Result<RefreshOutcome> {
    let outcome = if source.starts_with("http") {
        let client = BasicClient::with_timeout(timeout)?;
        fetch_snapshot_at(&client, source, now).await
    } else {
        let bytes = std::fs::read(source)?;
        snapshot_from_bytes(&bytes, &now)
    };
    Ok(outcome)
}

fn report(outcome: &RefreshOutcome) {
    let stats = SnapshotStats::from_snapshot(outcome.snapshot());
    match outcome.fallback_reason() {
        Some(reason) => warn!(%reason, "Serving empty snapshot"),
        None => info!(
            buses = stats.buses,
            active_pct = stats.active_pct(),
            incidents = stats.incidents,
            high_priority = stats.high_priority_incidents,
            "Snapshot ready"
        ),
    }
}

/// Runs the polling dashboard until `num_refreshes` refreshes have been shown
/// (forever when 0) or Ctrl+C is pressed.
#[tracing::instrument(skip(config, select), fields(source = %config.api_url))]
async fn watch(config: &TrackerConfig, num_refreshes: u64, select: Option<String>) -> Result<()> {
    let client = BasicClient::with_timeout(config.request_timeout)?;
    let handle = Poller::new(client, config.api_url.clone())
        .with_interval(config.refresh_interval)
        .spawn();
    let mut rx = handle.subscribe();

    if num_refreshes == 0 {
        info!(
            interval_secs = config.refresh_interval.as_secs(),
            "Polling indefinitely. Press Ctrl+C to stop."
        );
    }

    let mut pending_select = select;
    let mut shown = 0u64;

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }

        let state = rx.borrow_and_update().clone();
        if state.is_loading() || state.refresh_count <= shown {
            continue;
        }
        shown = state.refresh_count;

        if let Some(bus_id) = pending_select.take() {
            if let Err(e) = handle.select(&bus_id) {
                warn!(error = %e, "Could not select bus");
            }
        }

        log_dashboard(&handle.current(), &Local::now())?;

        if num_refreshes > 0 && shown >= num_refreshes {
            break;
        }
    }

    handle.stop();
    info!(refreshes = shown, "Finished watching transportation data");
    Ok(())
}
