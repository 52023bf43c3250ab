//! One-shot latch flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// An at-most-once edge trigger.
///
/// `try_set()` returns `true` for exactly one caller, no matter how many
/// threads race to call it concurrently; every other caller (before or
/// after) observes `false`. `wait_until_set` blocks the calling thread, so
/// it is meant for dedicated worker threads or tests, not for use inside
/// an async task (use a `tokio::sync::Notify` there instead).
pub struct LatchFlag {
    set: AtomicBool,
    mutex: Mutex<()>,
    condvar: Condvar,
}

impl LatchFlag {
    /// Creates an unset latch.
    #[must_use]
    pub fn new() -> Self {
        Self {
            set: AtomicBool::new(false),
            mutex: Mutex::new(()),
            condvar: Condvar::new(),
        }
    }

    /// Attempts to set the latch; returns `true` only for the first caller.
    pub fn try_set(&self) -> bool {
        let won = self
            .set
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if won {
            // Hold the mutex while notifying so a concurrent
            // `wait_until_set` can't miss the wakeup between checking
            // `is_set()` and starting to wait.
            let _guard = self.mutex.lock().expect("latch mutex poisoned");
            self.condvar.notify_all();
        }
        won
    }

    /// Observes whether the latch has been set.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.set.load(Ordering::Acquire)
    }

    /// Blocks until the latch is set or `timeout` elapses; returns whether
    /// the latch was observed set.
    pub fn wait_until_set(&self, timeout: Duration) -> bool {
        if self.is_set() {
            return true;
        }
        let guard = self.mutex.lock().expect("latch mutex poisoned");
        let (_guard, result) = self
            .condvar
            .wait_timeout_while(guard, timeout, |()| !self.is_set())
            .expect("latch mutex poisoned");
        !result.timed_out() || self.is_set()
    }
}

impl Default for LatchFlag {
    fn default() -> Self {
        Self::new()
    }
}
