use super::args::{load_config, SourceArgs};
use crate::analysis::{OutputFormat, ReportFormatter};
use crate::errors::AppResult;
use crate::source::discover_streams;
use clap::Args;

#[derive(Args, Debug)]
pub struct StreamsCommand {
    #[command(flatten)]
    source: SourceArgs,

    /// Output format: console or json
    #[arg(long, default_value = "console")]
    format: String,
}

impl StreamsCommand {
    pub async fn run(&self) -> AppResult<()> {
        let app_config = load_config()?;
        let source = self.source.open(&app_config)?;
        let streams =
            discover_streams(&source, &self.source.stream_filters(&app_config)).await?;

        let output =
            ReportFormatter::format_stream_list(&streams, &OutputFormat::parse(&self.format))?;
        print!("{}", output);
        Ok(())
    }
}
