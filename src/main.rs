//! feedhits - Blocklist feed normalization and per-IP hit aggregation
//!
//! Scans a synced directory of blocklist feeds and reports, for every public
//! IPv4 address, which feeds listed it and when.

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use feedhits::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::ERROR
    } else {
        Level::INFO
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false);

    match cli.log_file {
        Some(ref path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            let subscriber = builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        None => {
            let subscriber = builder
                .without_time()
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    // Execute command
    match cli.command {
        Commands::Run { feeds_dir, output } => {
            feedhits::commands::run::run(feeds_dir, output, &cli.config).await
        }
        Commands::Check { token } => feedhits::commands::check::run(&token),
        Commands::Expand { network, limit } => feedhits::commands::expand::run(&network, limit),
        Commands::Version => {
            println!("feedhits {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
