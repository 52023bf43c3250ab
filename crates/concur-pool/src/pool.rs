//! Worker pool.
//!
//! Workers are Tokio tasks that hand each job to `spawn_blocking`, not
//! OS threads: a worker's own loop only awaits the job's `JoinHandle`, so
//! a synchronous, blocking task body runs on the dedicated blocking
//! thread pool rather than occupying (and stalling) an async runtime
//! worker thread — running it inline on the worker's own async task
//! would violate "one worker blocking does not stall others".
//!
//! All mutable pool state — the worker list, the pending-task queue and
//! the shutdown flag — lives behind a single `std::sync::Mutex`. A
//! worker never talks back to the pool directly; it only calls into the
//! shared `PoolInner`, which keeps the pool<->worker relationship a
//! one-directional "ask/reply" edge instead of a reference cycle.

use std::any::Any;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use concur_core::{Error, Task};
use tokio::sync::mpsc;

use crate::future::{TaskFuture, TaskResolver};
use crate::sizing::PoolSizes;

/// Tracing target for worker-pool infrastructure.
const TRACING_TARGET: &str = "concur_pool::pool";

struct Job<T> {
    task_id: u64,
    task: Task<T>,
    resolver: TaskResolver<T>,
}

struct PendingEntry<T> {
    task_id: u64,
    task: Task<T>,
    resolver: TaskResolver<T>,
}

struct WorkerHandle<T> {
    name: String,
    busy: Arc<AtomicBool>,
    tx: mpsc::UnboundedSender<Job<T>>,
}

/// A point-in-time snapshot of one worker's bookkeeping: stable
/// name, busy flag.
#[derive(Debug, Clone)]
pub struct WorkerInfo {
    /// `{prefix}-{index}`, stable for the worker's lifetime.
    pub name: String,
    /// Whether the worker currently has a task in flight.
    pub busy: bool,
}

struct PoolState<T> {
    workers: Vec<WorkerHandle<T>>,
    queue: VecDeque<PendingEntry<T>>,
    next_worker_index: u32,
    next_task_id: u64,
    shut_down: bool,
}

struct PoolInner<T> {
    sizes: PoolSizes,
    name_prefix: String,
    state: StdMutex<PoolState<T>>,
}

impl<T: Clone + Send + 'static> PoolInner<T> {
    fn spawn_worker(self: &Arc<Self>, index: u32) -> WorkerHandle<T> {
        let name = format!("{}-{index}", self.name_prefix);
        let busy = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::unbounded_channel::<Job<T>>();

        let worker_name = name.clone();
        let worker_busy = Arc::clone(&busy);
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            worker_loop(worker_name, worker_busy, rx, inner).await;
        });

        WorkerHandle { name, busy, tx }
    }

    /// Dispatch algorithm: while the queue is non-empty and an
    /// idle (or newly-creatable) worker exists, hand off the next
    /// non-cancelled entry.
    fn dispatch(self: &Arc<Self>, state: &mut PoolState<T>) {
        if state.shut_down {
            return;
        }
        loop {
            if state.queue.is_empty() {
                return;
            }

            let worker_idx = match state.workers.iter().position(|w| !w.busy.load(Ordering::SeqCst)) {
                Some(idx) => idx,
                None if (state.workers.len() as u32) < self.sizes.max() => {
                    let idx = state.next_worker_index;
                    state.next_worker_index += 1;
                    let handle = self.spawn_worker(idx);
                    state.workers.push(handle);
                    state.workers.len() - 1
                }
                None => return,
            };

            let Some(entry) = state.queue.pop_front() else {
                return;
            };
            if entry.resolver.is_cancelled() {
                tracing::trace!(target: TRACING_TARGET, task_id = entry.task_id, "skipping cancelled queued task");
                continue;
            }

            let worker = &state.workers[worker_idx];
            worker.busy.store(true, Ordering::SeqCst);
            let job = Job {
                task_id: entry.task_id,
                task: entry.task,
                resolver: entry.resolver,
            };
            if worker.tx.send(job).is_err() {
                // Worker died between the idle check and the send; give up
                // on this worker for this pass and try again.
                worker.busy.store(false, Ordering::SeqCst);
                continue;
            }
        }
    }

    fn redispatch(self: &Arc<Self>) {
        let mut state = self.state.lock().expect("pool mutex poisoned");
        self.dispatch(&mut state);
    }

    fn on_worker_crashed(self: &Arc<Self>, name: &str) {
        let mut state = self.state.lock().expect("pool mutex poisoned");
        state.workers.retain(|w| w.name != name);
        if !state.shut_down && (state.workers.len() as u32) < self.sizes.core() {
            let idx = state.next_worker_index;
            state.next_worker_index += 1;
            let handle = self.spawn_worker(idx);
            state.workers.push(handle);
        }
        self.dispatch(&mut state);
    }
}

async fn worker_loop<T: Clone + Send + 'static>(
    name: String,
    busy: Arc<AtomicBool>,
    mut rx: mpsc::UnboundedReceiver<Job<T>>,
    inner: Arc<PoolInner<T>>,
) {
    tracing::debug!(target: TRACING_TARGET, worker = %name, "worker started");
    while let Some(job) = rx.recv().await {
        let Job {
            task_id,
            task,
            resolver,
        } = job;

        let outcome = tokio::task::spawn_blocking(move || task()).await;
        match outcome {
            Ok(value) => {
                if !resolver.is_cancelled() {
                    resolver.resolve(value);
                }
                busy.store(false, Ordering::SeqCst);
                inner.redispatch();
            }
            Err(join_err) => {
                let message = if join_err.is_panic() {
                    panic_message(&join_err.into_panic())
                } else {
                    join_err.to_string()
                };
                tracing::error!(
                    target: TRACING_TARGET,
                    worker = %name,
                    task_id,
                    error = %message,
                    "worker crashed while running task"
                );
                if !resolver.is_cancelled() {
                    resolver.reject(Error::worker_crash(message));
                }
                inner.on_worker_crashed(&name);
                return;
            }
        }
    }
    tracing::debug!(target: TRACING_TARGET, worker = %name, "worker stopped");
}

fn panic_message(panic: &Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked with a non-string payload".to_string()
    }
}

/// A pool of named workers that run short tasks with bounded parallelism.
pub struct WorkerPool<T> {
    inner: Arc<PoolInner<T>>,
}

impl<T> Clone for WorkerPool<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + 'static> WorkerPool<T> {
    /// Creates a pool and eagerly starts `sizes.core()` workers.
    ///
    /// Must be called from within a running Tokio runtime: it spawns
    /// worker tasks immediately.
    #[must_use]
    pub fn new(sizes: PoolSizes, name_prefix: impl Into<String>) -> Self {
        let inner = Arc::new(PoolInner {
            sizes,
            name_prefix: name_prefix.into(),
            state: StdMutex::new(PoolState {
                workers: Vec::new(),
                queue: VecDeque::new(),
                next_worker_index: 0,
                next_task_id: 0,
                shut_down: false,
            }),
        });

        {
            let mut state = inner.state.lock().expect("pool mutex poisoned");
            for _ in 0..sizes.core() {
                let idx = state.next_worker_index;
                state.next_worker_index += 1;
                let handle = inner.spawn_worker(idx);
                state.workers.push(handle);
            }
        }

        Self { inner }
    }

    /// The pool's configured core/max sizes.
    #[must_use]
    pub const fn sizes(&self) -> PoolSizes {
        self.inner.sizes
    }

    /// Submits `task`, returning a future for its eventual result.
    ///
    /// Fails fast with a rejected future if the pool is shut down;
    /// otherwise enqueues and immediately attempts dispatch.
    pub fn submit(&self, task: Task<T>) -> TaskFuture<T> {
        let mut state = self.inner.state.lock().expect("pool mutex poisoned");
        if state.shut_down {
            return TaskFuture::rejected(Error::shutdown("pool is shut down"));
        }

        let task_id = state.next_task_id;
        state.next_task_id += 1;
        let (future, resolver) = TaskFuture::pending();
        state.queue.push_back(PendingEntry {
            task_id,
            task,
            resolver,
        });
        self.inner.dispatch(&mut state);
        future
    }

    /// Submits every task and returns a future for the vector of results
    /// in input order. Rejects on the first failure; peers are not
    /// cancelled and complete on their own.
    pub fn invoke_all(&self, tasks: Vec<Task<T>>) -> TaskFuture<Vec<T>> {
        let futures: Vec<TaskFuture<T>> = tasks.into_iter().map(|task| self.submit(task)).collect();
        TaskFuture::from_future(async move { TaskFuture::all(futures).await })
    }

    /// Idempotent graceful shutdown: rejects every queued task with a
    /// shutdown error and detaches all workers (idle workers stop
    /// immediately; busy workers finish their current task first).
    pub fn shutdown(&self) {
        let mut state = self.inner.state.lock().expect("pool mutex poisoned");
        if state.shut_down {
            return;
        }
        state.shut_down = true;
        while let Some(entry) = state.queue.pop_front() {
            entry
                .resolver
                .reject(Error::shutdown("pool shut down while task was queued"));
        }
        for worker in state.workers.drain(..) {
            drop(worker.tx);
        }
    }

    /// Like [`shutdown`](Self::shutdown), but also returns the tasks that
    /// were still queued (and not yet handed to a worker).
    pub fn shutdown_now(&self) -> Vec<Task<T>> {
        let mut state = self.inner.state.lock().expect("pool mutex poisoned");
        if state.shut_down {
            return Vec::new();
        }
        state.shut_down = true;
        let mut drained = Vec::with_capacity(state.queue.len());
        while let Some(entry) = state.queue.pop_front() {
            entry
                .resolver
                .reject(Error::shutdown("pool shut down while task was queued"));
            drained.push(entry.task);
        }
        for worker in state.workers.drain(..) {
            drop(worker.tx);
        }
        drained
    }

    /// Whether [`shutdown`](Self::shutdown)/[`shutdown_now`](Self::shutdown_now)
    /// has been called.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.inner.state.lock().expect("pool mutex poisoned").shut_down
    }

    /// `is_shutdown() && workers == [] && pendingTasks == []`.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        let state = self.inner.state.lock().expect("pool mutex poisoned");
        state.shut_down && state.workers.is_empty() && state.queue.is_empty()
    }

    /// `true` iff not shut down and either an idle worker exists or the
    /// pool can still grow toward `max`.
    #[must_use]
    pub fn can_accept_work(&self) -> bool {
        let state = self.inner.state.lock().expect("pool mutex poisoned");
        if state.shut_down {
            return false;
        }
        state.workers.iter().any(|w| !w.busy.load(Ordering::SeqCst))
            || (state.workers.len() as u32) < self.inner.sizes.max()
    }

    /// A snapshot of every currently-tracked worker's name and busy flag.
    #[must_use]
    pub fn workers_snapshot(&self) -> Vec<WorkerInfo> {
        let state = self.inner.state.lock().expect("pool mutex poisoned");
        state
            .workers
            .iter()
            .map(|w| WorkerInfo {
                name: w.name.clone(),
                busy: w.busy.load(Ordering::SeqCst),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicI64;
    use std::time::Duration;

    use concur_atomic::PaddedCounter;

    use super::*;
    use crate::sizing::PoolSizes;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn counting_fan_out_increments_exactly_once_per_task() {
        let pool: WorkerPool<()> = WorkerPool::new(PoolSizes::fixed(4).unwrap(), "count");
        let counter = Arc::new(PaddedCounter::new(0));

        let tasks: Vec<Task<()>> = (0..1000)
            .map(|_| {
                let counter = Arc::clone(&counter);
                Box::new(move || {
                    counter.increment_and_get();
                }) as Task<()>
            })
            .collect();

        let all = pool.invoke_all(tasks);
        all.get().await.unwrap();
        assert_eq!(counter.load(), 1000);
    }

    #[tokio::test]
    async fn submit_after_shutdown_is_rejected() {
        let pool: WorkerPool<i32> = WorkerPool::new(PoolSizes::fixed(2).unwrap(), "shut");
        pool.shutdown();
        let future = pool.submit(Box::new(|| 1));
        let err = future.get().await.unwrap_err();
        assert_eq!(err.kind(), concur_core::ErrorKind::Shutdown);
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let pool: WorkerPool<i32> = WorkerPool::new(PoolSizes::fixed(2).unwrap(), "idem");
        pool.shutdown();
        pool.shutdown();
        assert!(pool.is_shutdown());
    }

    #[tokio::test]
    async fn shutdown_rejects_queued_but_not_yet_dispatched_tasks() {
        let pool: WorkerPool<i32> = WorkerPool::new(PoolSizes::fixed(1).unwrap(), "queued");
        // Occupy the single worker so the next submission queues.
        let gate = Arc::new(tokio::sync::Notify::new());
        let gate_clone = Arc::clone(&gate);
        let _busy = pool.submit(Box::new(move || {
            // Block the worker synchronously until the test lets it go.
            let handle = tokio::runtime::Handle::current();
            handle.block_on(gate_clone.notified());
            1
        }));
        tokio::task::yield_now().await;
        let queued = pool.submit(Box::new(|| 2));
        pool.shutdown();
        gate.notify_waiters();
        let err = queued.get().await.unwrap_err();
        assert_eq!(err.kind(), concur_core::ErrorKind::Shutdown);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn worker_pool_self_heals_up_to_core_after_a_crash() {
        let pool: WorkerPool<i32> = WorkerPool::new(PoolSizes::fixed(2).unwrap(), "crash");
        let crashing: Task<i32> = Box::new(|| panic!("boom"));
        let future = pool.submit(crashing);
        let err = future.get().await.unwrap_err();
        assert_eq!(err.kind(), concur_core::ErrorKind::WorkerCrash);

        // Give the replacement worker a moment to spawn and register.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(pool.workers_snapshot().len(), 2);

        let ok = pool.submit(Box::new(|| 42));
        assert_eq!(ok.get().await.unwrap(), 42);
    }

    #[tokio::test]
    async fn cancel_before_dispatch_discards_the_task() {
        let pool: WorkerPool<i32> = WorkerPool::new(PoolSizes::fixed(1).unwrap(), "cancel");
        let ran = Arc::new(AtomicI64::new(0));
        let gate = Arc::new(tokio::sync::Notify::new());
        let gate_clone = Arc::clone(&gate);
        let _busy = pool.submit(Box::new(move || {
            let handle = tokio::runtime::Handle::current();
            handle.block_on(gate_clone.notified());
            1
        }));
        tokio::task::yield_now().await;

        let ran_clone = Arc::clone(&ran);
        let queued = pool.submit(Box::new(move || {
            ran_clone.store(1, Ordering::SeqCst);
            2
        }));
        queued.cancel();
        gate.notify_waiters();

        assert!(queued.get().await.is_err());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn can_accept_work_reports_false_once_shut_down() {
        let pool: WorkerPool<i32> = WorkerPool::new(PoolSizes::fixed(2).unwrap(), "accept");
        assert!(pool.can_accept_work());
        pool.shutdown();
        assert!(!pool.can_accept_work());
    }
}
