use crate::source::{FetchStrategy, RetryConfig};
use config::{Config, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Application configuration loaded from config.toml or environment variables
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub source: SourceConfig,
    pub fetch: FetchConfig,
    pub analysis: AnalysisConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Dump file read by every command unless `--dump` is given
    #[serde(default)]
    pub dump: Option<PathBuf>,
    /// Streams to analyse; empty means all limits-retention streams
    #[serde(default)]
    pub streams: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    pub batch_size: usize,
    /// 0 keeps every message
    pub limit: usize,
    pub strategy: FetchStrategy,
    pub concurrency: usize,
    pub timeout_seconds: u64,
    pub max_retries: usize,
    pub initial_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub max_backoff_seconds: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        let retry = RetryConfig::default();
        Self {
            batch_size: 1000,
            limit: 0,
            strategy: FetchStrategy::Sequential,
            concurrency: 8,
            timeout_seconds: retry.timeout_seconds,
            max_retries: retry.max_retries,
            initial_backoff_ms: retry.initial_backoff_ms,
            backoff_multiplier: retry.backoff_multiplier,
            max_backoff_seconds: retry.max_backoff_seconds,
        }
    }
}

impl FetchConfig {
    pub fn retry(&self) -> RetryConfig {
        RetryConfig {
            timeout_seconds: self.timeout_seconds,
            max_retries: self.max_retries,
            initial_backoff_ms: self.initial_backoff_ms,
            backoff_multiplier: self.backoff_multiplier,
            max_backoff_seconds: self.max_backoff_seconds,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Bucket width, e.g. `1s`, `500ms`, `1h30m`
    pub granularity: String,
    /// Terminal width for graphs; 0 means detect from `COLUMNS`
    pub width: usize,
    /// Buckets shown per view in the interactive explorer
    pub max_buckets: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            granularity: "1s".to_string(),
            width: 0,
            max_buckets: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: String,
    /// Upper bound on buckets returned by `/api/histogram`
    pub max_buckets: usize,
    pub concurrency_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            max_buckets: 3000,
            concurrency_limit: 64,
        }
    }
}

impl AppConfig {
    /// Load configuration from config.toml file and environment variables
    /// Environment variables take precedence over file configuration
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = AppConfig::default();
        let config = Config::builder()
            // Fetch defaults
            .set_default("fetch.batch_size", defaults.fetch.batch_size as i64)?
            .set_default("fetch.limit", defaults.fetch.limit as i64)?
            .set_default("fetch.strategy", defaults.fetch.strategy.to_string())?
            .set_default("fetch.concurrency", defaults.fetch.concurrency as i64)?
            .set_default("fetch.timeout_seconds", defaults.fetch.timeout_seconds)?
            .set_default("fetch.max_retries", defaults.fetch.max_retries as i64)?
            .set_default("fetch.initial_backoff_ms", defaults.fetch.initial_backoff_ms)?
            .set_default("fetch.backoff_multiplier", defaults.fetch.backoff_multiplier)?
            .set_default(
                "fetch.max_backoff_seconds",
                defaults.fetch.max_backoff_seconds,
            )?
            // Analysis defaults
            .set_default("analysis.granularity", defaults.analysis.granularity)?
            .set_default("analysis.width", defaults.analysis.width as i64)?
            .set_default("analysis.max_buckets", defaults.analysis.max_buckets as i64)?
            // Server defaults
            .set_default("server.bind", defaults.server.bind)?
            .set_default("server.max_buckets", defaults.server.max_buckets as i64)?
            .set_default(
                "server.concurrency_limit",
                defaults.server.concurrency_limit as i64,
            )?
            // Load from config.toml if it exists
            .add_source(File::with_name("config").required(false))
            // TRAFFIC_<SECTION>__<KEY> env variables override file settings
            .add_source(
                config::Environment::with_prefix("TRAFFIC")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut app_config: AppConfig = config.try_deserialize()?;

        // TRAFFIC_DUMP is a shorthand for the dump path
        if let Ok(dump) = env::var("TRAFFIC_DUMP") {
            app_config.source.dump = Some(PathBuf::from(dump));
        }

        if app_config.fetch.batch_size == 0 {
            return Err(ConfigError::Message(
                "fetch.batch_size must be positive".to_string(),
            ));
        }

        Ok(app_config)
    }

    /// Get default config values for CLI argument defaults
    pub fn get_defaults() -> Result<Self, ConfigError> {
        // Try to load config for defaults, but don't fail if not found
        match Self::load() {
            Ok(config) => Ok(config),
            Err(_) => Ok(Self::default()),
        }
    }
}
