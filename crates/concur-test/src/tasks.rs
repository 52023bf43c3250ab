//! Task factories shared by other crates' test suites.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use concur_core::Task;

/// A task that increments `counter` and returns `()`.
pub fn counting_task(counter: Arc<AtomicI64>) -> Task<()> {
    Box::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    })
}

/// A task that always panics with `message`, for exercising worker-crash
/// and driver error-chaining paths.
pub fn panicking_task(message: &'static str) -> Task<()> {
    Box::new(move || panic!("{message}"))
}

/// A task that blocks until `gate` is notified, for exercising
/// backpressure and timeout paths under a controlled clock.
pub fn blocking_task(gate: Arc<tokio::sync::Notify>) -> Task<()> {
    Box::new(move || {
        let handle = tokio::runtime::Handle::current();
        handle.block_on(gate.notified());
    })
}

/// A task that returns `value` unchanged, for exercising result plumbing
/// that doesn't care about side effects.
pub fn returning_task<T>(value: T) -> Task<T>
where
    T: Send + 'static,
{
    Box::new(move || value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counting_task_increments_once_per_call() {
        let counter = Arc::new(AtomicI64::new(0));
        let task = counting_task(Arc::clone(&counter));
        task();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    #[should_panic(expected = "boom")]
    fn panicking_task_panics_with_its_message() {
        let task = panicking_task("boom");
        task();
    }

    #[test]
    fn returning_task_yields_its_value() {
        let task = returning_task(42);
        assert_eq!(task(), 42);
    }
}
