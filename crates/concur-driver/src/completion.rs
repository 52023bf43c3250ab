//! Completion service bound to a worker pool (spec §4.4).

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use concur_core::{Result, Task};
use concur_pool::{TaskFuture, WorkerPool};
use tokio::sync::{mpsc, Mutex as AsyncMutex};

use crate::pushback::PushbackIter;

/// Bound on how long [`CompletionService::await_or_fail`] blocks waiting
/// for a completion before reporting "no completion" (spec §4.4).
const AWAIT_TIMEOUT: Duration = Duration::from_millis(100);

/// Outcome of one [`CompletionService::try_submit`] attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrySubmitOutcome {
    /// The peeked task was handed to the pool.
    Dispatched,
    /// The pool cannot accept more work right now; the task is still
    /// buffered in the iterator for the next attempt.
    Backpressure,
    /// The task iterator has no more elements.
    Exhausted,
}

/// Tracks in-flight and completed futures for one bounded-concurrency run.
///
/// Must be held behind an `Arc` (dispatch spawns a supervisor task per
/// submission that needs to reach back into shared state on completion).
pub struct CompletionService<T> {
    pool: WorkerPool<T>,
    available_concurrency: i64,
    in_flight: AtomicI64,
    next_id: AtomicU64,
    running: StdMutex<HashMap<u64, TaskFuture<T>>>,
    completion_tx: mpsc::UnboundedSender<Result<T>>,
    completion_rx: AsyncMutex<mpsc::UnboundedReceiver<Result<T>>>,
}

impl<T: Clone + Send + 'static> CompletionService<T> {
    /// Creates a service bound to `pool`, allowing at most
    /// `available_concurrency` tasks in flight at once.
    #[must_use]
    pub fn new(pool: WorkerPool<T>, available_concurrency: u32) -> Arc<Self> {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            pool,
            available_concurrency: i64::from(available_concurrency),
            in_flight: AtomicI64::new(0),
            next_id: AtomicU64::new(0),
            running: StdMutex::new(HashMap::new()),
            completion_tx,
            completion_rx: AsyncMutex::new(completion_rx),
        })
    }

    /// The active-count form of `canSubmit`: `inFlight < availableConcurrency`.
    ///
    /// Specified as canonical over a `pool.canAcceptWork()`-style check,
    /// which would risk over-submission once the pool has grown past
    /// `core` toward `max` (see SPEC_FULL.md's Open Question resolution).
    #[must_use]
    pub fn can_submit(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) < self.available_concurrency
    }

    /// How many dispatched tasks have not yet settled.
    #[must_use]
    pub fn in_flight(&self) -> i64 {
        self.in_flight.load(Ordering::SeqCst)
    }

    fn dispatch(self: &Arc<Self>, task: Task<T>) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let future = self.pool.submit(task);
        self.running
            .lock()
            .expect("completion service mutex poisoned")
            .insert(id, future.clone());

        let this = Arc::clone(self);
        let watched = future;
        tokio::spawn(async move {
            let result = watched.get().await;
            this.running
                .lock()
                .expect("completion service mutex poisoned")
                .remove(&id);
            this.in_flight.fetch_sub(1, Ordering::SeqCst);
            // The driver may have already stopped listening (e.g. it hit
            // its own error path); dropping the completion silently is
            // correct in that case.
            let _ = this.completion_tx.send(result);
        });
    }

    /// Peeks `iter`; if a task is available and the pool has headroom,
    /// dispatches it and reports [`TrySubmitOutcome::Dispatched`].
    pub fn try_submit<I>(self: &Arc<Self>, iter: &mut PushbackIter<I>) -> TrySubmitOutcome
    where
        I: Iterator<Item = Task<T>>,
    {
        if iter.peek().is_none() {
            return TrySubmitOutcome::Exhausted;
        }
        if !self.can_submit() {
            return TrySubmitOutcome::Backpressure;
        }
        let task = iter.take_peeked().expect("try_submit: peek just confirmed an element");
        self.dispatch(task);
        TrySubmitOutcome::Dispatched
    }

    /// Returns one completed task's result, blocking up to the short
    /// await timeout; `None` means "no completion within the timeout",
    /// not "no more work".
    pub async fn await_or_fail(&self) -> Option<Result<T>> {
        let mut rx = self.completion_rx.lock().await;
        tokio::time::timeout(AWAIT_TIMEOUT, rx.recv()).await.ok().flatten()
    }

    /// Requests cancellation of every still-outstanding future.
    /// `may_interrupt_if_running` gates whether this is even attempted, to
    /// honour the driver's `mayInterruptIfRunning` flag.
    pub fn cancel_all(&self, may_interrupt_if_running: bool) {
        if !may_interrupt_if_running {
            return;
        }
        let running = self.running.lock().expect("completion service mutex poisoned");
        for future in running.values() {
            future.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use concur_core::Task;
    use concur_pool::{PoolSizes, WorkerPool};

    use super::*;

    fn make_pool() -> WorkerPool<i32> {
        WorkerPool::new(PoolSizes::fixed(2).unwrap(), "completion-test")
    }

    #[tokio::test]
    async fn try_submit_reports_exhausted_on_an_empty_iterator() {
        let service = CompletionService::new(make_pool(), 2);
        let mut iter = PushbackIter::new(std::iter::empty::<Task<i32>>());
        assert_eq!(service.try_submit(&mut iter), TrySubmitOutcome::Exhausted);
    }

    #[tokio::test]
    async fn try_submit_respects_available_concurrency() {
        let service = CompletionService::new(make_pool(), 1);
        let gate = Arc::new(tokio::sync::Notify::new());
        let gate_clone = Arc::clone(&gate);
        let blocking: Task<i32> = Box::new(move || {
            let handle = tokio::runtime::Handle::current();
            handle.block_on(gate_clone.notified());
            1
        });
        let mut iter = PushbackIter::new(vec![blocking, Box::new(|| 2) as Task<i32>].into_iter());

        assert_eq!(service.try_submit(&mut iter), TrySubmitOutcome::Dispatched);
        tokio::task::yield_now().await;
        assert_eq!(service.try_submit(&mut iter), TrySubmitOutcome::Backpressure);

        gate.notify_waiters();
        let first = service.await_or_fail().await;
        assert_eq!(first.unwrap().unwrap(), 1);
        assert_eq!(service.try_submit(&mut iter), TrySubmitOutcome::Dispatched);
    }

    #[tokio::test]
    async fn await_or_fail_times_out_with_nothing_outstanding() {
        let service = CompletionService::new(make_pool(), 2);
        assert!(service.await_or_fail().await.is_none());
    }

    #[tokio::test]
    async fn cancel_all_cancels_still_pending_futures() {
        let service = CompletionService::new(make_pool(), 1);
        let gate = Arc::new(tokio::sync::Notify::new());
        let gate_clone = Arc::clone(&gate);
        let blocking: Task<i32> = Box::new(move || {
            let handle = tokio::runtime::Handle::current();
            handle.block_on(gate_clone.notified());
            1
        });
        let mut iter = PushbackIter::new(vec![blocking].into_iter());
        service.try_submit(&mut iter);
        tokio::task::yield_now().await;

        service.cancel_all(true);
        gate.notify_waiters();
        let completed = service.await_or_fail().await;
        assert!(completed.unwrap().is_err());
    }
}
