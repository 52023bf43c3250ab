//! Cancellable future / promise.

use std::future::Future as StdFuture;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use concur_core::{Error, Result};
use tokio::sync::Notify;

/// Terminal/pending state machine described in spec §3.
enum State<T> {
    Pending,
    Fulfilled(T),
    Rejected(Error),
    Cancelled,
}

struct Shared<T> {
    state: Mutex<State<T>>,
    notify: Notify,
}

/// A cancellable promise over a value of type `T`.
///
/// Mirrors spec §4.3: `{ PENDING, FULFILLED(T), REJECTED(err), CANCELLED }`
/// with terminal states final. `T` must be `Clone` because more than one
/// caller may await [`get`](TaskFuture::get) on the same future (spec:
/// "Completion observers registered before or after completion both fire
/// exactly once" — in Rust terms, every observer gets its own copy of the
/// settled value).
#[derive(Clone)]
pub struct TaskFuture<T> {
    shared: Arc<Shared<T>>,
}

/// The producer side of a [`TaskFuture`]: the executor callback that
/// settles it.
pub struct TaskResolver<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Clone + Send + 'static> TaskFuture<T> {
    /// Creates a pending future paired with its resolver.
    #[must_use]
    pub fn pending() -> (Self, TaskResolver<T>) {
        let shared = Arc::new(Shared {
            state: Mutex::new(State::Pending),
            notify: Notify::new(),
        });
        (
            Self {
                shared: Arc::clone(&shared),
            },
            TaskResolver { shared },
        )
    }

    /// A future already fulfilled with `value`.
    #[must_use]
    pub fn resolved(value: T) -> Self {
        let (future, resolver) = Self::pending();
        resolver.resolve(value);
        future
    }

    /// A future already rejected with `err`.
    #[must_use]
    pub fn rejected(err: Error) -> Self {
        let (future, resolver) = Self::pending();
        resolver.reject(err);
        future
    }

    /// Awaits settlement, returning the fulfilled value or the terminal
    /// error (`Cancelled` if [`cancel`](TaskFuture::cancel) fired first).
    ///
    /// The `Notified` future is created *before* the state check on each
    /// iteration, not after: `Notify::notify_waiters` wakes only waiters
    /// that already exist at the time it's called, so checking state and
    /// then constructing the `Notified` afterwards would miss a
    /// settlement that lands in between (a lost wakeup, hanging `get()`
    /// forever). Tokio guarantees a `Notified` created before a
    /// `notify_waiters` call observes it, even if not yet polled.
    pub async fn get(&self) -> Result<T> {
        loop {
            let notified = self.shared.notify.notified();
            {
                let state = self.shared.state.lock().expect("future mutex poisoned");
                match &*state {
                    State::Pending => {}
                    State::Fulfilled(value) => return Ok(value.clone()),
                    State::Rejected(err) => {
                        return Err(Error::new(err.kind(), err.message().to_string()));
                    }
                    State::Cancelled => return Err(Error::cancelled("task was cancelled")),
                }
            }
            notified.await;
        }
    }

    /// Idempotently requests cancellation. Returns `true` only the first
    /// time it transitions `PENDING -> CANCELLED`; has no effect on an
    /// already-settled future.
    pub fn cancel(&self) -> bool {
        let mut state = self.shared.state.lock().expect("future mutex poisoned");
        if matches!(&*state, State::Pending) {
            *state = State::Cancelled;
            drop(state);
            self.shared.notify.notify_waiters();
            true
        } else {
            false
        }
    }

    /// `true` once the future has reached any terminal state.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        !matches!(
            &*self.shared.state.lock().expect("future mutex poisoned"),
            State::Pending
        )
    }

    /// `true` once [`cancel`](TaskFuture::cancel) has won the race.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(
            &*self.shared.state.lock().expect("future mutex poisoned"),
            State::Cancelled
        )
    }

    /// Resolves with a vector in input order once every future fulfils;
    /// rejects on the first rejection without cancelling the remaining
    /// peers (spec §4.3: `all`).
    pub async fn all(futures: Vec<TaskFuture<T>>) -> Result<Vec<T>> {
        let mut out = Vec::with_capacity(futures.len());
        for future in futures {
            out.push(future.get().await?);
        }
        Ok(out)
    }

    /// Resolves or rejects with whichever future settles first (spec
    /// §4.3: `race`). Peers that lose the race are left running.
    pub async fn race(futures: Vec<TaskFuture<T>>) -> Result<T> {
        debug_assert!(!futures.is_empty(), "race() called with no futures");
        let polls = futures.into_iter().map(|future| {
            let future = future;
            Box::pin(async move { future.get().await })
                as std::pin::Pin<Box<dyn StdFuture<Output = Result<T>> + Send>>
        });
        let (result, _index, _remaining) = futures::future::select_all(polls).await;
        result
    }

    /// Resolves with `value` after `delay` elapses (spec §4.3: `delay`).
    #[must_use]
    pub fn delay(value: T, delay: Duration) -> Self {
        let (future, resolver) = Self::pending();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            resolver.resolve(value);
        });
        future
    }

    /// Bridges an arbitrary `std::future::Future` into a [`TaskFuture`]
    /// (spec §4.3: `fromPromise`): spawns a task driving `fut` to
    /// completion and forwards its result.
    pub fn from_future<F>(fut: F) -> Self
    where
        F: StdFuture<Output = Result<T>> + Send + 'static,
    {
        let (future, resolver) = Self::pending();
        tokio::spawn(async move {
            match fut.await {
                Ok(value) => resolver.resolve(value),
                Err(err) => resolver.reject(err),
            }
        });
        future
    }
}

impl<T> TaskResolver<T> {
    /// Settles the future with a fulfilled value.
    ///
    /// A no-op if the future already reached a terminal state (including
    /// `Cancelled`) — per spec, "Future `resolve`/`reject` after
    /// settlement is a no-op" and a discarded result for a cancelled
    /// entry is simply never observed.
    pub fn resolve(self, value: T) {
        let mut state = self.shared.state.lock().expect("future mutex poisoned");
        if matches!(&*state, State::Pending) {
            *state = State::Fulfilled(value);
            drop(state);
            self.shared.notify.notify_waiters();
        }
    }

    /// Settles the future with a rejection. No-op once already settled.
    pub fn reject(self, err: Error) {
        let mut state = self.shared.state.lock().expect("future mutex poisoned");
        if matches!(&*state, State::Pending) {
            *state = State::Rejected(err);
            drop(state);
            self.shared.notify.notify_waiters();
        }
    }

    /// `true` if the paired future has already been cancelled — checked by
    /// a worker before bothering to call [`resolve`](Self::resolve) /
    /// [`reject`](Self::reject), since the result would be discarded
    /// anyway (spec §4.2).
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(
            &*self.shared.state.lock().expect("future mutex poisoned"),
            State::Cancelled
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolved_future_returns_value_immediately() {
        let future = TaskFuture::resolved(42);
        assert_eq!(future.get().await.unwrap(), 42);
    }

    #[tokio::test]
    async fn rejected_future_returns_error() {
        let future: TaskFuture<i32> = TaskFuture::rejected(Error::task_failure("boom"));
        assert!(future.get().await.is_err());
    }

    #[tokio::test]
    async fn cancel_is_idempotent_and_wins_once() {
        let (future, _resolver) = TaskFuture::<i32>::pending();
        assert!(future.cancel());
        assert!(!future.cancel());
        assert!(future.get().await.is_err());
    }

    #[tokio::test]
    async fn resolve_after_cancel_is_discarded() {
        let (future, resolver) = TaskFuture::<i32>::pending();
        assert!(future.cancel());
        resolver.resolve(7);
        let err = future.get().await.unwrap_err();
        assert_eq!(err.kind(), concur_core::ErrorKind::Cancelled);
    }

    #[tokio::test]
    async fn observers_before_and_after_completion_both_see_the_value() {
        let (future, resolver) = TaskFuture::<i32>::pending();
        let before = future.clone();
        let waiter = tokio::spawn(async move { before.get().await });
        tokio::task::yield_now().await;
        resolver.resolve(99);
        assert_eq!(waiter.await.unwrap().unwrap(), 99);
        assert_eq!(future.get().await.unwrap(), 99);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn get_never_hangs_when_resolve_races_the_settlement_check() {
        // No yield_now here: the waiter and the resolver race freely, so
        // a lost-wakeup bug (Notified created only after the state check
        // finds Pending) would make this hang instead of completing.
        for _ in 0..500 {
            let (future, resolver) = TaskFuture::<i32>::pending();
            let waiter = future.clone();
            let handle = tokio::spawn(async move { waiter.get().await });
            resolver.resolve(1);
            assert_eq!(handle.await.unwrap().unwrap(), 1);
        }
    }

    #[tokio::test]
    async fn all_preserves_input_order() {
        let futures = vec![
            TaskFuture::resolved(1),
            TaskFuture::resolved(2),
            TaskFuture::resolved(3),
        ];
        assert_eq!(TaskFuture::all(futures).await.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn all_rejects_on_first_failure() {
        let futures = vec![
            TaskFuture::resolved(1),
            TaskFuture::rejected(Error::task_failure("bad")),
            TaskFuture::resolved(3),
        ];
        assert!(TaskFuture::all(futures).await.is_err());
    }

    #[tokio::test]
    async fn race_returns_first_settled() {
        let fast = TaskFuture::delay(1, Duration::from_millis(5));
        let slow = TaskFuture::delay(2, Duration::from_millis(200));
        let winner = TaskFuture::race(vec![slow, fast]).await.unwrap();
        assert_eq!(winner, 1);
    }

    #[tokio::test]
    async fn delay_settles_after_the_duration() {
        let future = TaskFuture::delay("done", Duration::from_millis(10));
        assert!(!future.is_settled());
        assert_eq!(future.get().await.unwrap(), "done");
    }

    #[tokio::test]
    async fn from_future_forwards_ok_and_err() {
        let ok_future = TaskFuture::from_future(async { Ok(10) });
        assert_eq!(ok_future.get().await.unwrap(), 10);

        let err_future: TaskFuture<i32> =
            TaskFuture::from_future(async { Err(Error::task_failure("nope")) });
        assert!(err_future.get().await.is_err());
    }
}
