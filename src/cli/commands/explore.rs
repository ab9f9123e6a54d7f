use super::args::{load_config, load_messages, resolve_width, FetchArgs, SourceArgs};
use crate::analysis::reports::utils::format_time;
use crate::analysis::{
    build_histogram, compute_view, DownsamplePolicy, GraphOptions, OutputFormat, ReportFormatter,
    ViewSession, ViewTicket,
};
use crate::errors::{AppError, AppResult};
use crate::types::RateHistogram;
use crate::utils::time::{parse_timestamp, unix_seconds_to_datetime};
use chrono::{DateTime, Utc};
use clap::Args;
use std::io::BufRead;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

const HELP: &str = "Commands:
  zoom <start> <end>   narrow the view (RFC3339 or Unix seconds)
  back                 previous view
  reset                full range
  avg | max            downsample policy
  show                 redraw the current view
  quit                 exit";

#[derive(Args, Debug)]
pub struct ExploreCommand {
    #[command(flatten)]
    source: SourceArgs,

    #[command(flatten)]
    fetch: FetchArgs,

    /// Buckets per view (overrides config.toml)
    #[arg(long)]
    max_buckets: Option<usize>,

    /// Start with average instead of peak downsampling
    #[arg(long)]
    average: bool,

    /// Output width in columns
    #[arg(long)]
    width: Option<usize>,
}

/// One line of interactive input
#[derive(Debug, Clone, PartialEq)]
pub enum ExploreInput {
    Zoom(DateTime<Utc>, DateTime<Utc>),
    Back,
    Reset,
    Policy(DownsamplePolicy),
    Show,
    Help,
    Quit,
}

fn parse_instant(token: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(ts) = parse_timestamp(token) {
        return Ok(ts);
    }
    token
        .parse::<f64>()
        .ok()
        .and_then(unix_seconds_to_datetime)
        .ok_or_else(|| format!("cannot parse time {:?}", token))
}

pub fn parse_input(line: &str) -> Result<ExploreInput, String> {
    let mut parts = line.split_whitespace();
    let Some(word) = parts.next() else {
        return Ok(ExploreInput::Show);
    };
    let rest: Vec<&str> = parts.collect();
    match (word.to_lowercase().as_str(), rest.as_slice()) {
        ("zoom" | "z", [start, end]) => Ok(ExploreInput::Zoom(parse_instant(start)?, parse_instant(end)?)),
        ("zoom" | "z", _) => Err("usage: zoom <start> <end>".to_string()),
        ("back" | "b", []) => Ok(ExploreInput::Back),
        ("reset" | "r", []) => Ok(ExploreInput::Reset),
        ("avg" | "average", []) => Ok(ExploreInput::Policy(DownsamplePolicy::Average)),
        ("max" | "peak", []) => Ok(ExploreInput::Policy(DownsamplePolicy::Peak)),
        ("show" | "s", []) => Ok(ExploreInput::Show),
        ("help" | "h" | "?", _) => Ok(ExploreInput::Help),
        ("quit" | "q" | "exit", _) => Ok(ExploreInput::Quit),
        (other, _) => Err(format!("unknown command {:?} (type help)", other)),
    }
}

type ViewResult = (ViewTicket, AppResult<RateHistogram>);

fn request_view(
    hist: &Arc<RateHistogram>,
    ticket: ViewTicket,
    max_buckets: usize,
    tx: &mpsc::Sender<ViewResult>,
) {
    let hist = Arc::clone(hist);
    let tx = tx.clone();
    tokio::spawn(async move {
        let result = tokio::task::spawn_blocking(move || compute_view(&hist, &ticket, max_buckets))
            .await
            .unwrap_or_else(|e| Err(AppError::InvalidData(format!("view task failed: {}", e))));
        if tx.send((ticket, result)).await.is_err() {
            debug!("Explorer closed before view v{} finished", ticket.version);
        }
    });
}

impl ExploreCommand {
    pub async fn run(&self) -> AppResult<()> {
        info!("=== Traffic History - Explore ===");
        let app_config = load_config()?;
        let width = resolve_width(self.width, &app_config);
        let max_buckets = self.max_buckets.unwrap_or(app_config.analysis.max_buckets);
        if max_buckets == 0 {
            return Err(AppError::InvalidArgument(
                "max buckets must be positive".to_string(),
            ));
        }

        let data = load_messages(&self.source, &self.fetch, &app_config).await?;
        let hist = Arc::new(build_histogram(&data.messages, data.granularity)?);
        if hist.is_empty() {
            println!("No messages found");
            return Ok(());
        }

        let opts = GraphOptions {
            width,
            ..GraphOptions::default()
        };
        let policy = if self.average {
            DownsamplePolicy::Average
        } else {
            DownsamplePolicy::Peak
        };
        let mut session = ViewSession::new(policy);

        // Stdin is read on a plain thread so an idle prompt never blocks shutdown
        let (line_tx, mut line_rx) = mpsc::channel::<String>(16);
        std::thread::spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(l) => {
                        if line_tx.blocking_send(l).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        });

        let (view_tx, mut view_rx) = mpsc::channel::<ViewResult>(16);
        println!("{}", HELP);
        request_view(&hist, session.refresh(), max_buckets, &view_tx);

        loop {
            tokio::select! {
                line = line_rx.recv() => {
                    let Some(line) = line else { break };
                    let ticket = match parse_input(&line) {
                        Ok(ExploreInput::Quit) => break,
                        Ok(ExploreInput::Help) => {
                            println!("{}", HELP);
                            None
                        }
                        Ok(ExploreInput::Zoom(start, end)) => match session.zoom(start, end) {
                            Ok(t) => Some(t),
                            Err(e) => {
                                println!("Error: {}", e);
                                None
                            }
                        },
                        Ok(ExploreInput::Back) => {
                            let t = session.back();
                            if t.is_none() {
                                println!("Already at the outermost view");
                            }
                            t
                        }
                        Ok(ExploreInput::Reset) => Some(session.reset()),
                        Ok(ExploreInput::Policy(p)) => Some(session.set_policy(p)),
                        Ok(ExploreInput::Show) => Some(session.refresh()),
                        Err(msg) => {
                            println!("{}", msg);
                            None
                        }
                    };
                    if let Some(ticket) = ticket {
                        request_view(&hist, ticket, max_buckets, &view_tx);
                    }
                }
                Some((ticket, result)) = view_rx.recv() => {
                    let Some(result) = session.complete(&ticket, result) else {
                        continue;
                    };
                    match result {
                        Ok(view) => {
                            println!(
                                "\n[view {}] {} to {} | policy {} | zoom depth {}",
                                ticket.version,
                                format_time(ticket.window.start.or(hist.start())),
                                format_time(ticket.window.end.or(hist.end())),
                                ticket.policy,
                                session.zoom_depth()
                            );
                            print!(
                                "{}",
                                ReportFormatter::format_rate_histogram(&view, &opts, &OutputFormat::Console)?
                            );
                        }
                        Err(e) => println!("Error: {}", e),
                    }
                }
            }
        }
        Ok(())
    }
}
