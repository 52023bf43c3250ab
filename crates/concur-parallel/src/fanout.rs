//! Range fan-out helpers: `parallel_for_each_node` and `read_parallel`.

use std::sync::Arc;

use concur_core::{Concurrency, Error, Result, Task, TerminationFlag};
use concur_pool::WorkerPool;

const TRACING_TARGET: &str = "concur_parallel::fanout";

/// Splits `[0, node_count)` into at most `concurrency.value()` contiguous,
/// non-overlapping ranges.
fn partition_ranges(node_count: u64, concurrency: Concurrency) -> Vec<(u64, u64)> {
    let parts = u64::from(concurrency.value());
    if node_count == 0 || parts == 0 {
        return Vec::new();
    }
    let batch = node_count.div_ceil(parts);
    let mut ranges = Vec::new();
    let mut start = 0;
    while start < node_count {
        let end = (start + batch).min(node_count);
        ranges.push((start, end));
        start = end;
    }
    ranges
}

fn pool_usable<T>(pool: Option<&WorkerPool<T>>) -> bool {
    pool.map(|p| !p.is_shutdown() && !p.is_terminated()).unwrap_or(false)
}

/// Partitions `[0, node_count)` into `concurrency` contiguous ranges and
/// invokes `consumer(id)` once per id, in parallel across ranges; blocks
/// until every range finishes. `termination.assert_running()` is polled
/// once at the start of each range (spec §4.5).
pub async fn parallel_for_each_node<F>(
    node_count: u64,
    concurrency: Concurrency,
    termination: Arc<dyn TerminationFlag>,
    consumer: F,
) -> Result<()>
where
    F: Fn(u64) + Send + Sync + 'static,
{
    let ranges = partition_ranges(node_count, concurrency);
    tracing::debug!(
        target: TRACING_TARGET,
        node_count,
        ranges = ranges.len(),
        "fanning out parallel_for_each_node"
    );
    let consumer = Arc::new(consumer);

    let mut handles = Vec::with_capacity(ranges.len());
    for (start, end) in ranges {
        let termination = Arc::clone(&termination);
        let consumer = Arc::clone(&consumer);
        handles.push(tokio::spawn(async move {
            termination.assert_running()?;
            for id in start..end {
                consumer(id);
            }
            Ok::<(), Error>(())
        }));
    }

    for handle in handles {
        handle
            .await
            .map_err(|err| Error::task_failure(format!("parallel_for_each_node range task panicked: {err}")))??;
    }
    Ok(())
}

/// Splits `[0, size)` into `ceil(size / concurrency)`-sized ranges and
/// invokes `bi_consumer(start, end)` once per range.
///
/// Runs sequentially (`allowSynchronousRun`) when `pool` is unusable or
/// `concurrency.value() == 1`; otherwise dispatches one task per range
/// through `pool` and awaits all of them.
pub async fn read_parallel<F>(
    concurrency: Concurrency,
    size: u64,
    pool: Option<&WorkerPool<()>>,
    bi_consumer: F,
) -> Result<()>
where
    F: Fn(u64, u64) + Send + Sync + 'static,
{
    let ranges = partition_ranges(size, concurrency);

    if !pool_usable(pool) || concurrency.value() == 1 {
        for (start, end) in ranges {
            bi_consumer(start, end);
        }
        return Ok(());
    }

    let pool = pool.expect("pool_usable(pool) implies Some");
    let consumer = Arc::new(bi_consumer);
    let tasks: Vec<Task<()>> = ranges
        .into_iter()
        .map(|(start, end)| {
            let consumer = Arc::clone(&consumer);
            Box::new(move || consumer(start, end)) as Task<()>
        })
        .collect();

    pool.invoke_all(tasks).get().await?;
    Ok(())
}
