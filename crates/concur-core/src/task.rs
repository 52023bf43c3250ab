//! The `Task` abstraction: a short-lived unit of work the concurrency
//! core runs to completion.

/// A short-lived unit of work with a single operation: run to completion
/// and produce `T`.
///
/// The canonical shape is a boxed closure; [`RunnableTask`] is provided
/// as a convenience for hosts that prefer object-shaped tasks with an
/// explicit `run()` method, bridged to this form via the blanket impl
/// below.
pub type Task<T> = Box<dyn FnOnce() -> T + Send + 'static>;

/// An object-shaped task: something with a single `run()` operation,
/// for hosts that model tasks as values rather than closures.
pub trait RunnableTask: Send + 'static {
    /// The value produced by running this task.
    type Output: Send + 'static;

    /// Runs the task to completion.
    fn run(self) -> Self::Output;
}

/// Bridges any [`RunnableTask`] into the canonical closure-shaped [`Task`].
#[must_use]
pub fn into_task<R>(runnable: R) -> Task<R::Output>
where
    R: RunnableTask,
{
    Box::new(move || runnable.run())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Double(i64);

    impl RunnableTask for Double {
        type Output = i64;

        fn run(self) -> i64 {
            self.0 * 2
        }
    }

    #[test]
    fn closure_task_runs_once() {
        let task: Task<i64> = Box::new(|| 21 * 2);
        assert_eq!(task(), 42);
    }

    #[test]
    fn runnable_task_bridges_to_closure_shape() {
        let task = into_task(Double(21));
        assert_eq!(task(), 42);
    }
}
