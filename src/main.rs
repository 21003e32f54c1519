use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use epg_merge::{
    app::{self, RunOptions},
    config::defaults::{DEFAULT_CONFIG_PATH, DEFAULT_MAPPING_PATH},
};

#[derive(Parser)]
#[command(name = "epg-merge")]
#[command(version)]
#[command(about = "Merge XMLTV and JSON EPG sources into a single XMLTV guide")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "CONFIG_PATH", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Channel id mapping file path
    #[arg(short, long, env = "MAPPING_PATH", default_value = DEFAULT_MAPPING_PATH)]
    mappings: PathBuf,

    /// Output file (overrides config file)
    #[arg(short, long, env = "OUTPUT_FILE", value_name = "PATH")]
    output: Option<PathBuf>,

    /// Per-request fetch timeout, e.g. "30s" (overrides config file)
    #[arg(short, long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging with specified level
    let log_filter = format!("epg_merge={}", cli.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting EPG merge v{}", env!("CARGO_PKG_VERSION"));

    let options = RunOptions {
        config_path: cli.config,
        mapping_path: cli.mappings,
        output: cli.output,
        timeout: cli.timeout,
    };
    app::run(&options).await?;
    Ok(())
}
