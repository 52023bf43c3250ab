//! `run` subcommand: imports a CSV directory through `concur-csv`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Context;
use concur_core::Concurrency;
use concur_csv::{ImportPipeline, Row};
use concur_pool::{PoolSizes, WorkerPool};

use crate::config::RunArgs;

const TRACING_TARGET: &str = "concur_cli::commands::run";

/// Imports every CSV file under `args.dir`, counting rows with a
/// minimal visitor, and logs the total.
pub async fn run(args: RunArgs) -> anyhow::Result<()> {
    let concurrency = Concurrency::new(i64::from(args.concurrency)).context("invalid --concurrency")?;
    let pool_sizes = PoolSizes::fixed(args.pool_size).context("invalid --pool-size")?;
    let pool = WorkerPool::new(pool_sizes, "concur-cli-import");

    let pipeline = ImportPipeline::new(concurrency).with_pool(pool);
    let rows = Arc::new(AtomicU64::new(0));
    let rows_clone = Arc::clone(&rows);

    let total = pipeline
        .run(&args.dir, move || {
            let rows = Arc::clone(&rows_clone);
            move |_line_no: u64, _row: &Row| {
                rows.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
        })
        .await
        .with_context(|| format!("import failed under {}", args.dir.display()))?;

    tracing::info!(target: TRACING_TARGET, rows = total, dir = %args.dir.display(), "import finished");
    println!("imported {total} rows from {}", args.dir.display());
    Ok(())
}
