//! `blogdesk` command-line entry point.

use anyhow::Result;
use blogdesk_cli::{cli::Cli, commands};
use blogdesk_runtime::{init_logging, LogOptions};
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    // Default to info-level logs; override via RUST_LOG if needed.
    let _guard = init_logging(LogOptions {
        log_dir: cli.log_dir.clone(),
        default_filter: None,
    })?;

    commands::run(cli).await
}
