mod report;
mod run;

use chrono::NaiveDate;
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "tablewatch")]
#[command(about = "Check table-service dining availability across venues")]
struct Cli {
    /// Party size
    guests: u32,

    /// First date to check (YYYY-MM-DD)
    date: NaiveDate,

    /// Also check this many following days
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    extra_days: i64,

    /// Run the browser without a window
    #[arg(
        long,
        num_args = 0..=1,
        default_value_t = true,
        default_missing_value = "true",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new(),
    )]
    headless: bool,

    /// Delete the stored session first, forcing a fresh login
    #[arg(long)]
    reset_session: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = tablewatch_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    run::run(&cli, &config).await
}
