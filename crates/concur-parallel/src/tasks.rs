//! Task-factory and submit/await helpers.

use concur_core::{Result, Task};
use concur_pool::WorkerPool;

/// Produces `concurrency.value()` tasks from a zero-argument factory.
pub fn tasks<T, F>(concurrency: concur_core::Concurrency, mut factory: F) -> Vec<Task<T>>
where
    T: Send + 'static,
    F: FnMut() -> Task<T>,
{
    (0..concurrency.value()).map(|_| factory()).collect()
}

/// Produces `concurrency.value()` tasks, passing each task's index to the
/// factory.
pub fn tasks_with_index<T, F>(concurrency: concur_core::Concurrency, factory: F) -> Vec<Task<T>>
where
    T: Send + 'static,
    F: FnMut(u32) -> Task<T>,
{
    (0..concurrency.value()).map(factory).collect()
}

fn pool_usable<T>(pool: Option<&WorkerPool<T>>) -> bool {
    pool.map(|p| !p.is_shutdown() && !p.is_terminated()).unwrap_or(false)
}

/// Submits every task and awaits all of them, preserving input order.
///
/// `allowSynchronousRun`: falls back to running every task inline, in
/// order, when the pool is unusable or there is at most one task (not
/// worth the dispatch overhead).
pub async fn run<T: Clone + Send + 'static>(tasks: Vec<Task<T>>, pool: Option<&WorkerPool<T>>) -> Result<Vec<T>> {
    if !pool_usable(pool) || tasks.len() <= 1 {
        return Ok(tasks.into_iter().map(|task| task()).collect());
    }
    let pool = pool.expect("pool_usable(pool) implies Some");
    pool.invoke_all(tasks).get().await
}

/// Submits one task and awaits it; falls back to running it inline when
/// the pool is unusable.
pub async fn run_single<T: Clone + Send + 'static>(task: Task<T>, pool: Option<&WorkerPool<T>>) -> Result<T> {
    if !pool_usable(pool) {
        return Ok(task());
    }
    pool.expect("pool_usable(pool) implies Some").submit(task).get().await
}

#[cfg(test)]
mod tests {
    use concur_core::Concurrency;
    use concur_pool::PoolSizes;

    use super::*;

    #[test]
    fn tasks_produces_one_per_concurrency_unit() {
        let factory_calls = std::cell::Cell::new(0);
        let produced = tasks(Concurrency::new(5).unwrap(), || {
            factory_calls.set(factory_calls.get() + 1);
            Box::new(|| 1) as Task<i32>
        });
        assert_eq!(produced.len(), 5);
        assert_eq!(factory_calls.get(), 5);
    }

    #[test]
    fn tasks_with_index_passes_the_index_through() {
        let produced = tasks_with_index(Concurrency::new(3).unwrap(), |i| Box::new(move || i) as Task<u32>);
        let results: Vec<u32> = produced.into_iter().map(|task| task()).collect();
        assert_eq!(results, vec![0, 1, 2]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn run_dispatches_through_the_pool_and_preserves_order() {
        let pool = WorkerPool::new(PoolSizes::fixed(4).unwrap(), "tasks-run");
        let produced: Vec<Task<i32>> = (0..8).map(|i| Box::new(move || i) as Task<i32>).collect();
        let results = run(produced, Some(&pool)).await.unwrap();
        assert_eq!(results, (0..8).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn run_falls_back_to_inline_with_no_pool() {
        let produced: Vec<Task<i32>> = (0..3).map(|i| Box::new(move || i) as Task<i32>).collect();
        let results = run(produced, None).await.unwrap();
        assert_eq!(results, vec![0, 1, 2]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn run_single_dispatches_through_the_pool() {
        let pool = WorkerPool::new(PoolSizes::fixed(1).unwrap(), "tasks-run-single");
        let result = run_single(Box::new(|| 42), Some(&pool)).await.unwrap();
        assert_eq!(result, 42);
    }
}
