//! `bench` subcommand: drives a synthetic task source through the
//! bounded-concurrency driver and reports throughput.

use std::time::Instant;

use anyhow::Context;
use concur_core::{Concurrency, Task};
use concur_driver::{run_with_concurrency, DriverConfig};
use concur_pool::{PoolSizes, WorkerPool};

use crate::config::BenchArgs;

const TRACING_TARGET: &str = "concur_cli::commands::bench";

/// Runs `args.tasks` no-op tasks through the driver at `args.concurrency`,
/// timing the whole batch and printing tasks/sec.
pub async fn run(args: BenchArgs) -> anyhow::Result<()> {
    let concurrency = Concurrency::new(i64::from(args.concurrency)).context("invalid --concurrency")?;
    let pool_sizes = PoolSizes::fixed(args.pool_size).context("invalid --pool-size")?;
    let pool = WorkerPool::new(pool_sizes, "concur-cli-bench");

    let config = DriverConfig::new(concurrency, Some(pool));
    let tasks: Vec<Task<()>> = (0..args.tasks).map(|_| -> Task<()> { Box::new(|| ()) }).collect();

    let started = Instant::now();
    run_with_concurrency(&config, tasks.into_iter())
        .await
        .context("benchmark run failed")?;
    let elapsed = started.elapsed();

    let tasks_per_sec = if elapsed.as_secs_f64() > 0.0 {
        args.tasks as f64 / elapsed.as_secs_f64()
    } else {
        f64::INFINITY
    };

    tracing::info!(
        target: TRACING_TARGET,
        tasks = args.tasks,
        concurrency = args.concurrency,
        elapsed_ms = elapsed.as_millis() as u64,
        tasks_per_sec,
        "benchmark finished"
    );
    println!(
        "ran {} tasks at concurrency {} in {:.3}s ({:.0} tasks/sec)",
        args.tasks,
        args.concurrency,
        elapsed.as_secs_f64(),
        tasks_per_sec
    );
    Ok(())
}
