use crate::config::AppConfig;
use crate::errors::{AppError, AppResult};
use crate::source::{
    discover_streams, CsvDumpSource, FetchOptions, FetchStrategy, MessageFetcher, TimeWindow,
};
use crate::types::{MessageRecord, StreamInfo};
use crate::utils::time::{parse_duration, parse_timestamp};
use chrono::{DateTime, TimeDelta, Utc};
use clap::Args;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

// ===== Helper Functions =====

/// Load config.toml/env settings, falling back to built-in defaults
pub fn load_config() -> AppResult<AppConfig> {
    match AppConfig::load() {
        Ok(config) => {
            info!("Configuration loaded successfully");
            Ok(config)
        }
        Err(e) => {
            warn!("Failed to load configuration: {}", e);
            info!("Using defaults and CLI arguments");
            AppConfig::get_defaults().map_err(|e| AppError::Config(e.to_string()))
        }
    }
}

/// Write output to file with safe directory creation
pub fn write_output_to_file(path: &Path, content: &str, description: &str) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    println!("{} written to: {}", description, path.display());
    Ok(())
}

/// Graph width: explicit flag, then config, then `COLUMNS`, then 120
pub fn resolve_width(flag: Option<usize>, config: &AppConfig) -> usize {
    flag.filter(|w| *w > 0)
        .or(Some(config.analysis.width).filter(|w| *w > 0))
        .or_else(|| {
            std::env::var("COLUMNS")
                .ok()
                .and_then(|c| c.trim().parse::<usize>().ok())
                .filter(|w| *w > 0)
        })
        .unwrap_or(120)
}

fn parse_granularity(raw: &str) -> AppResult<TimeDelta> {
    let granularity = parse_duration(raw)
        .map_err(|_| AppError::InvalidGranularity(format!("cannot parse {:?}", raw)))?;
    if granularity <= TimeDelta::zero() {
        return Err(AppError::InvalidGranularity(format!(
            "{} must be positive",
            raw
        )));
    }
    Ok(granularity)
}

// ===== Shared Arguments =====

/// Where messages come from
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Stream dump CSV (stream,sequence,timestamp,size) (overrides config.toml)
    #[arg(long)]
    pub dump: Option<PathBuf>,

    /// Stream to analyse; repeat for several (default: all limits-retention streams)
    #[arg(long = "stream", short = 's')]
    pub streams: Vec<String>,
}

impl SourceArgs {
    pub fn open(&self, config: &AppConfig) -> AppResult<CsvDumpSource> {
        let path = self
            .dump
            .clone()
            .or_else(|| config.source.dump.clone())
            .ok_or_else(|| {
                AppError::Config(
                    "No dump file provided. Use --dump or set TRAFFIC_DUMP / source.dump in config.toml"
                        .to_string(),
                )
            })?;
        CsvDumpSource::open(&path)
    }

    pub fn stream_filters(&self, config: &AppConfig) -> Vec<String> {
        if self.streams.is_empty() {
            config.source.streams.clone()
        } else {
            self.streams.clone()
        }
    }
}

/// How messages are fetched and bucketed
#[derive(Args, Debug, Clone, Default)]
pub struct FetchArgs {
    /// Bucket width, e.g. 1s, 500ms, 1h30m (overrides config.toml)
    #[arg(long, short = 'g')]
    pub granularity: Option<String>,

    /// Messages requested per batch (overrides config.toml)
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Maximum messages kept per stream
    #[arg(long)]
    pub limit: Option<usize>,

    /// Only messages at or after this time (RFC3339 or YYYY-MM-DD HH:MM:SS)
    #[arg(long)]
    pub start: Option<String>,

    /// Only messages before this time
    #[arg(long)]
    pub end: Option<String>,

    /// Only messages from the last duration, e.g. 1h (cannot be combined with --start)
    #[arg(long, conflicts_with = "start")]
    pub since: Option<String>,

    /// Fetch strategy: sequential or concurrent (overrides config.toml)
    #[arg(long)]
    pub strategy: Option<String>,

    /// In-flight batch requests for the concurrent strategy
    #[arg(long)]
    pub concurrency: Option<usize>,
}

impl FetchArgs {
    pub fn granularity(&self, config: &AppConfig) -> AppResult<TimeDelta> {
        parse_granularity(
            self.granularity
                .as_deref()
                .unwrap_or(&config.analysis.granularity),
        )
    }

    pub fn window(&self, now: DateTime<Utc>) -> AppResult<TimeWindow> {
        let start = self.start.as_deref().map(parse_timestamp).transpose()?;
        let end = self.end.as_deref().map(parse_timestamp).transpose()?;
        let since = self.since.as_deref().map(parse_duration).transpose()?;
        TimeWindow::resolve(start, end, since, now)
    }

    pub fn fetch_options(&self, config: &AppConfig, now: DateTime<Utc>) -> AppResult<FetchOptions> {
        let strategy = match &self.strategy {
            Some(s) => s.parse::<FetchStrategy>()?,
            None => config.fetch.strategy,
        };
        let limit = self
            .limit
            .or(Some(config.fetch.limit))
            .filter(|l| *l > 0);
        let options = FetchOptions {
            batch_size: self.batch_size.unwrap_or(config.fetch.batch_size),
            limit,
            window: self.window(now)?,
            strategy,
            concurrency: self.concurrency.unwrap_or(config.fetch.concurrency),
            retry: config.fetch.retry(),
        };
        options.validate()?;
        Ok(options)
    }
}

/// Everything a command needs after discovery and fetching
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub streams: Vec<StreamInfo>,
    pub messages: Vec<MessageRecord>,
    pub skipped: Vec<String>,
    pub granularity: TimeDelta,
    pub window: TimeWindow,
}

impl LoadedData {
    /// Streams that were fetched successfully
    pub fn fetched_streams(&self) -> Vec<StreamInfo> {
        self.streams
            .iter()
            .filter(|s| !self.skipped.contains(&s.name))
            .cloned()
            .collect()
    }
}

/// Validate options, discover streams and fetch their messages
pub async fn load_messages(
    source_args: &SourceArgs,
    fetch_args: &FetchArgs,
    config: &AppConfig,
) -> AppResult<LoadedData> {
    // Configuration errors surface before any I/O
    let granularity = fetch_args.granularity(config)?;
    let options = fetch_args.fetch_options(config, Utc::now())?;
    let window = options.window;

    let source = source_args.open(config)?;
    let streams = discover_streams(&source, &source_args.stream_filters(config)).await?;

    info!("Configuration:");
    info!("  Dump: {}", source.path().display());
    info!("  Streams: {}", streams.len());
    info!("  Granularity: {}s", granularity.num_milliseconds() as f64 / 1000.0);
    info!("  Batch size: {}", options.batch_size);
    info!("  Strategy: {}", options.strategy);

    let fetcher = MessageFetcher::new(&source, options)?;
    let outcome = fetcher.fetch_all(&streams).await;

    Ok(LoadedData {
        streams,
        messages: outcome.messages,
        skipped: outcome.skipped_streams,
        granularity,
        window,
    })
}
