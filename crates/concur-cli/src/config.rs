//! CLI configuration: a top-level `Cli` with one subcommand per
//! operation this shell exposes.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line entry point for `concur-cli`.
#[derive(Debug, Parser)]
#[command(name = "concur-cli")]
#[command(about = "Concurrency-core CSV import and benchmarking shell")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// The two subcommands this shell exposes.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Imports a directory of CSV files through `concur-csv`.
    Run(RunArgs),
    /// Drives the bounded-concurrency driver over a synthetic task
    /// source and prints throughput.
    Bench(BenchArgs),
}

/// Arguments for the `run` subcommand.
#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Directory containing one `*header*.csv` file and zero or more
    /// data files.
    #[arg(long, env = "CONCUR_IMPORT_DIR")]
    pub dir: PathBuf,

    /// How many data files may be processed at once.
    #[arg(long, env = "CONCUR_CONCURRENCY", default_value_t = 4)]
    pub concurrency: u32,

    /// Worker-pool size backing the import (`core == max`).
    #[arg(long, env = "CONCUR_POOL_SIZE", default_value_t = 4)]
    pub pool_size: u32,
}

/// Arguments for the `bench` subcommand.
#[derive(Debug, Clone, Args)]
pub struct BenchArgs {
    /// Number of synthetic tasks to run through the driver.
    #[arg(long, env = "CONCUR_BENCH_TASKS", default_value_t = 100_000)]
    pub tasks: u64,

    /// Concurrency bound passed to the driver.
    #[arg(long, env = "CONCUR_BENCH_CONCURRENCY", default_value_t = 8)]
    pub concurrency: u32,

    /// Worker-pool size backing the benchmark (`core == max`).
    #[arg(long, env = "CONCUR_BENCH_POOL_SIZE", default_value_t = 8)]
    pub pool_size: u32,
}
