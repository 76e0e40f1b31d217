#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod commands;
mod config;
mod telemetry;

use std::process;

use anyhow::Context;
use stow_container::BlobContainer;

use crate::config::Cli;

// Tracing target constants
pub const TRACING_TARGET_STARTUP: &str = "stow_cli::startup";
pub const TRACING_TARGET_SHUTDOWN: &str = "stow_cli::shutdown";
pub const TRACING_TARGET_CONFIG: &str = "stow_cli::config";
pub const TRACING_TARGET_COMMAND: &str = "stow_cli::command";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        tracing::debug!(
            target: TRACING_TARGET_SHUTDOWN,
            "command finished successfully"
        );
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_SHUTDOWN,
            error = format!("{error:#}"),
            "command failed"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();

    telemetry::init_tracing()?;
    cli.log();

    let container = BlobContainer::connect(cli.container.clone())
        .context("invalid container configuration")?;

    let mut stdout = tokio::io::stdout();
    cli.command
        .execute(&cli.container, &container, &mut stdout)
        .await
}
