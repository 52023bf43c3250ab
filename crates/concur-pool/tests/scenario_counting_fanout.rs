//! End-to-end scenario: a pool at `(core = 4, max = 4)` runs 1000
//! counter-incrementing tasks through `invoke_all`; every future resolves
//! and the shared counter lands on exactly 1000.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use concur_core::Task;
use concur_pool::{PoolSizes, WorkerPool};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn counting_fan_out_settles_every_future_at_exactly_one_thousand() {
    let pool = WorkerPool::new(PoolSizes::fixed(4).unwrap(), "scenario-counting-fanout");
    let counter = Arc::new(AtomicI64::new(0));

    let tasks: Vec<Task<()>> = (0..1000)
        .map(|_| {
            let counter = Arc::clone(&counter);
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }) as Task<()>
        })
        .collect();

    let results = pool.invoke_all(tasks).get().await.unwrap();

    assert_eq!(results.len(), 1000);
    assert_eq!(counter.load(Ordering::SeqCst), 1000);
}
