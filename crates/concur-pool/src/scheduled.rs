//! Scheduled pool: one-shot and fixed-rate timers.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use concur_core::{Error, Task};
use tokio_util::sync::CancellationToken;

const TRACING_TARGET: &str = "concur_pool::scheduled";

/// A handle to a scheduled (possibly still pending, possibly repeating)
/// timer, carrying the result type `T` the task itself produces (spec
/// §4.10: `schedule(task, delayMs) → ScheduledFuture<T>`,
/// `scheduleAtFixedRate(...) → ScheduledFuture<[T]>` — the latter is
/// `ScheduledPool::schedule_at_fixed_rate_with`'s `ScheduledFuture<Vec<T>>`).
/// Dropping it does not cancel the timer; call
/// [`cancel`](ScheduledFuture::cancel) explicitly.
#[derive(Clone)]
pub struct ScheduledFuture<T> {
    cancelled: CancellationToken,
    run_count: Arc<AtomicU64>,
    failure: Arc<StdMutex<Option<Error>>>,
    result: Arc<StdMutex<Option<T>>>,
}

impl<T: Clone> ScheduledFuture<T> {
    /// Requests cancellation. A one-shot timer already in flight still
    /// runs to completion; a fixed-rate timer will not be rescheduled
    /// after its current run.
    pub fn cancel(&self) {
        self.cancelled.cancel();
    }

    /// `true` once [`cancel`](Self::cancel) has been called (including
    /// as a side effect of [`rejection`](Self::rejection)).
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.is_cancelled()
    }

    /// How many times the scheduled task has started running so far.
    #[must_use]
    pub fn run_count(&self) -> u64 {
        self.run_count.load(Ordering::SeqCst)
    }

    /// The value produced by the most recently completed run, if any.
    /// For [`schedule`](ScheduledPool::schedule) this is the one-shot
    /// task's return value; for
    /// [`schedule_at_fixed_rate_with`](ScheduledPool::schedule_at_fixed_rate_with)
    /// it is the vector of every run's result so far.
    #[must_use]
    pub fn result(&self) -> Option<T> {
        self.result.lock().expect("scheduled future mutex poisoned").clone()
    }

    /// The task error that caused a fixed-rate schedule to stop, if one
    /// occurred (spec §4.10: "the periodic variant terminates and
    /// rejects on first task error").
    #[must_use]
    pub fn rejection(&self) -> Option<Error> {
        self.failure
            .lock()
            .expect("scheduled future mutex poisoned")
            .as_ref()
            .map(|err| Error::new(err.kind(), err.message().to_string()))
    }
}

/// A pool of timers built on Tokio's sleep primitives rather than a
/// dedicated worker thread, since delaying a task is I/O-bound waiting
/// and does not need a blocking-capable worker (spec §4, C12).
#[derive(Clone, Default)]
pub struct ScheduledPool {
    shut_down: Arc<AtomicBool>,
    children: Arc<std::sync::Mutex<Vec<CancellationToken>>>,
}

impl ScheduledPool {
    /// Creates an empty scheduled pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `task` once after `delay`, unless shut down or cancelled
    /// first. The produced value lands in the returned future's
    /// [`result`](ScheduledFuture::result).
    pub fn schedule<T>(&self, task: Task<T>, delay: Duration) -> ScheduledFuture<T>
    where
        T: Send + 'static,
    {
        let cancelled = CancellationToken::new();
        let run_count = Arc::new(AtomicU64::new(0));
        let failure = Arc::new(StdMutex::new(None));
        let result = Arc::new(StdMutex::new(None));
        self.track(cancelled.clone());

        if self.shut_down.load(Ordering::SeqCst) {
            cancelled.cancel();
            return ScheduledFuture {
                cancelled,
                run_count,
                failure,
                result,
            };
        }

        let token = cancelled.clone();
        let counter = Arc::clone(&run_count);
        let failure_slot = Arc::clone(&failure);
        let result_slot = Arc::clone(&result);
        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {
                    tracing::trace!(target: TRACING_TARGET, "scheduled task cancelled before it ran");
                }
                () = tokio::time::sleep(delay) => {
                    counter.fetch_add(1, Ordering::SeqCst);
                    match tokio::task::spawn_blocking(task).await {
                        Ok(value) => {
                            *result_slot.lock().expect("scheduled future mutex poisoned") = Some(value);
                        }
                        Err(join_err) => {
                            tracing::error!(target: TRACING_TARGET, "scheduled task panicked");
                            *failure_slot.lock().expect("scheduled future mutex poisoned") =
                                Some(Error::task_failure("scheduled task panicked"));
                            let _ = join_err;
                            token.cancel();
                        }
                    }
                }
            }
        });

        ScheduledFuture {
            cancelled,
            run_count,
            failure,
            result,
        }
    }

    fn track(&self, token: CancellationToken) {
        let mut children = self.children.lock().expect("scheduled pool mutex poisoned");
        children.retain(|t| !t.is_cancelled());
        children.push(token);
    }

    /// Runs `make_task()` every `period`, waiting `initial_delay` before
    /// the first run (spec §4.10's `initialDelayMs`), producing a fresh
    /// `Task<T>` for each run (since a `Task<T>` is a one-shot `FnOnce`).
    /// Stops once cancelled or the pool is shut down, or on first task
    /// error. Every successful run's value is appended to the returned
    /// future's [`result`](ScheduledFuture::result) vector.
    pub fn schedule_at_fixed_rate_with<F, T>(
        &self,
        mut make_task: F,
        initial_delay: Duration,
        period: Duration,
    ) -> ScheduledFuture<Vec<T>>
    where
        F: FnMut() -> Task<T> + Send + 'static,
        T: Send + Clone + 'static,
    {
        let cancelled = CancellationToken::new();
        let run_count = Arc::new(AtomicU64::new(0));
        let failure = Arc::new(StdMutex::new(None));
        let result: Arc<StdMutex<Option<Vec<T>>>> = Arc::new(StdMutex::new(None));
        self.track(cancelled.clone());

        if self.shut_down.load(Ordering::SeqCst) {
            cancelled.cancel();
            return ScheduledFuture {
                cancelled,
                run_count,
                failure,
                result,
            };
        }

        let token = cancelled.clone();
        let counter = Arc::clone(&run_count);
        let failure_slot = Arc::clone(&failure);
        let result_slot = Arc::clone(&result);
        tokio::spawn(async move {
            let mut first = true;
            let mut collected: Vec<T> = Vec::new();
            loop {
                let wait = if first { initial_delay } else { period };
                first = false;
                tokio::select! {
                    () = token.cancelled() => return,
                    () = tokio::time::sleep(wait) => {}
                }
                if token.is_cancelled() {
                    return;
                }
                counter.fetch_add(1, Ordering::SeqCst);
                let task = make_task();
                match tokio::task::spawn_blocking(task).await {
                    Ok(value) => {
                        collected.push(value);
                        *result_slot.lock().expect("scheduled future mutex poisoned") = Some(collected.clone());
                    }
                    Err(join_err) => {
                        tracing::error!(target: TRACING_TARGET, "scheduled task panicked; stopping this schedule");
                        *failure_slot.lock().expect("scheduled future mutex poisoned") =
                            Some(Error::task_failure("scheduled task panicked"));
                        let _ = join_err;
                        token.cancel();
                        return;
                    }
                }
            }
        });

        ScheduledFuture {
            cancelled,
            run_count,
            failure,
            result,
        }
    }

    /// Cancels every timer this pool has scheduled. Idempotent.
    pub fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
        let children = self.children.lock().expect("scheduled pool mutex poisoned");
        for token in children.iter() {
            token.cancel();
        }
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicI64;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn schedule_runs_once_after_the_delay() {
        let pool = ScheduledPool::new();
        let ran = Arc::new(AtomicI64::new(0));
        let ran_clone = Arc::clone(&ran);
        let handle = pool.schedule(Box::new(move || ran_clone.store(1, Ordering::SeqCst)), Duration::from_millis(50));
        tokio::time::advance(Duration::from_millis(60)).await;
        tokio::task::yield_now().await;
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert_eq!(handle.run_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_before_delay_elapses_prevents_the_run() {
        let pool = ScheduledPool::new();
        let ran = Arc::new(AtomicI64::new(0));
        let ran_clone = Arc::clone(&ran);
        let handle = pool.schedule(Box::new(move || ran_clone.store(1, Ordering::SeqCst)), Duration::from_millis(50));
        handle.cancel();
        tokio::time::advance(Duration::from_millis(60)).await;
        tokio::task::yield_now().await;
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn fixed_rate_runs_repeatedly_until_cancelled() {
        let pool = ScheduledPool::new();
        let count = Arc::new(AtomicI64::new(0));
        let count_clone = Arc::clone(&count);
        let handle = pool.schedule_at_fixed_rate_with(
            move || {
                let count_clone = Arc::clone(&count_clone);
                Box::new(move || {
                    count_clone.fetch_add(1, Ordering::SeqCst);
                })
            },
            Duration::from_millis(10),
            Duration::from_millis(10),
        );

        for _ in 0..3 {
            tokio::time::advance(Duration::from_millis(10)).await;
            tokio::task::yield_now().await;
        }
        handle.cancel();
        tokio::time::advance(Duration::from_millis(10)).await;
        tokio::task::yield_now().await;

        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert_eq!(handle.result().unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn fixed_rate_honors_a_distinct_initial_delay() {
        let pool = ScheduledPool::new();
        let ran = Arc::new(AtomicI64::new(0));
        let ran_clone = Arc::clone(&ran);
        let handle = pool.schedule_at_fixed_rate_with(
            move || {
                let ran_clone = Arc::clone(&ran_clone);
                Box::new(move || {
                    ran_clone.fetch_add(1, Ordering::SeqCst);
                })
            },
            Duration::from_millis(100),
            Duration::from_millis(10),
        );

        tokio::time::advance(Duration::from_millis(50)).await;
        tokio::task::yield_now().await;
        assert_eq!(ran.load(Ordering::SeqCst), 0, "first run should wait for the initial delay, not the period");

        tokio::time::advance(Duration::from_millis(60)).await;
        tokio::task::yield_now().await;
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        handle.cancel();
    }

    #[tokio::test]
    async fn shutdown_cancels_all_outstanding_timers() {
        let pool = ScheduledPool::new();
        let a = pool.schedule(Box::new(|| {}), Duration::from_secs(60));
        let b = pool.schedule(Box::new(|| {}), Duration::from_secs(60));
        pool.shutdown();
        assert!(a.is_cancelled());
        assert!(b.is_cancelled());
        assert!(pool.is_shutdown());
    }

    #[tokio::test(start_paused = true)]
    async fn fixed_rate_stops_and_rejects_on_first_task_error() {
        let pool = ScheduledPool::new();
        let count = Arc::new(AtomicI64::new(0));
        let count_clone = Arc::clone(&count);
        let handle = pool.schedule_at_fixed_rate_with(
            move || {
                let count_clone = Arc::clone(&count_clone);
                Box::new(move || {
                    let n = count_clone.fetch_add(1, Ordering::SeqCst);
                    if n == 1 {
                        panic!("third run fails");
                    }
                })
            },
            Duration::from_millis(10),
            Duration::from_millis(10),
        );

        for _ in 0..5 {
            tokio::time::advance(Duration::from_millis(10)).await;
            tokio::task::yield_now().await;
        }

        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(handle.is_cancelled());
        assert!(handle.rejection().is_some());
    }
}
