#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

mod commands;
mod config;
mod telemetry;

use std::process;

use clap::Parser;

use crate::config::{Cli, Command};

pub const TRACING_TARGET_STARTUP: &str = "concur_cli::startup";
pub const TRACING_TARGET_SHUTDOWN: &str = "concur_cli::shutdown";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        tracing::info!(target: TRACING_TARGET_SHUTDOWN, "command completed successfully");
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(target: TRACING_TARGET_SHUTDOWN, error = %error, "command failed");
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    telemetry::init_tracing();
    tracing::info!(target: TRACING_TARGET_STARTUP, version = env!("CARGO_PKG_VERSION"), "starting concur-cli");

    match cli.command {
        Command::Run(args) => commands::run(args).await,
        Command::Bench(args) => commands::bench(args).await,
    }
}
