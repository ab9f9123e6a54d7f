use super::args::{load_config, load_messages, FetchArgs, SourceArgs};
use crate::analysis::{build_histogram, build_summary_with_info};
use crate::errors::{AppError, AppResult};
use crate::server::{serve, ApiState};
use clap::Args;
use std::net::SocketAddr;
use tracing::info;

#[derive(Args, Debug)]
pub struct ServeCommand {
    #[command(flatten)]
    source: SourceArgs,

    #[command(flatten)]
    fetch: FetchArgs,

    /// Listen address, e.g. 127.0.0.1:8080 (overrides config.toml)
    #[arg(long)]
    bind: Option<String>,

    /// Maximum buckets per /api/histogram response (overrides config.toml)
    #[arg(long)]
    max_buckets: Option<usize>,
}

impl ServeCommand {
    pub async fn run(&self) -> AppResult<()> {
        info!("=== Traffic History - Query API ===");
        let app_config = load_config()?;

        let bind = self.bind.clone().unwrap_or(app_config.server.bind.clone());
        let addr: SocketAddr = bind
            .parse()
            .map_err(|e| AppError::Config(format!("invalid bind address {:?}: {}", bind, e)))?;
        let max_buckets = self.max_buckets.unwrap_or(app_config.server.max_buckets);
        if max_buckets == 0 {
            return Err(AppError::InvalidArgument(
                "max buckets must be positive".to_string(),
            ));
        }

        let data = load_messages(&self.source, &self.fetch, &app_config).await?;
        let combined = build_histogram(&data.messages, data.granularity)?;
        let summary = build_summary_with_info(&data.messages, &data.fetched_streams());
        info!(
            "Serving {} buckets across {} streams",
            combined.len(),
            summary.stream_count
        );

        serve(
            addr,
            app_config.server.concurrency_limit,
            ApiState::new(combined, summary, max_buckets),
        )
        .await
    }
}
