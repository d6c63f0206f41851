use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use feedloom_core::AppConfig;

mod commands;
mod render;

#[derive(Parser)]
#[command(name = "feedloom")]
#[command(author, version, about = "Aggregate feeds and watch them for new entries")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Seconds between poll cycles (overrides sync.poll_interval_secs)
    #[arg(long, global = true)]
    interval: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a feed once and print its entries
    Add {
        /// Feed URL
        url: String,
        /// Show the detail of the n-th entry (1-based)
        #[arg(long)]
        show: Option<usize>,
    },
    /// Register feeds and keep polling them for new entries
    Watch {
        /// Feed URLs, in addition to those in the config file
        urls: Vec<String>,
    },
    /// Print the effective configuration
    Config {
        /// Write the configuration file if it does not exist yet
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = AppConfig::load()?;
    if let Some(interval) = cli.interval {
        config.sync.poll_interval_secs = interval;
    }

    // Logs go to stderr so rendered feeds stay on stdout
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.general.log_level.clone()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match cli.command {
        Commands::Add { url, show } => commands::add::run(config, &url, show).await,
        Commands::Watch { urls } => {
            commands::watch::run(config, &urls).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config { init } => {
            commands::config::run(&config, init)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
