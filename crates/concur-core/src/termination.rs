//! Cooperative cancellation.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// Throttling interval a [`MonitorFlag`] uses between re-polls of its
/// underlying [`TerminationMonitor`], per spec §4.1.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// External collaborator polled by a [`MonitorFlag`] (spec §6): something
/// that can observe, from outside this process's task graph, whether a run
/// should stop.
pub trait TerminationMonitor: Send + Sync {
    /// Returns `true` once the run has been asked to terminate.
    fn is_terminated(&self) -> bool;
}

/// Cooperative cancellation signal.
///
/// Task bodies call [`assert_running`](TerminationFlag::assert_running) at
/// coarse-grained checkpoints (per-batch, per-N-nodes); `terminate()` never
/// returns a value, it only ever produces the error the caller should
/// propagate with `?`.
pub trait TerminationFlag: Send + Sync {
    /// Returns whether the run is still allowed to continue.
    fn running(&self) -> bool;

    /// Produces the terminated error for this flag, wrapping a
    /// caller-supplied cause if one was configured.
    fn terminate(&self) -> Error;

    /// `if !running() { Err(terminate()) } else { Ok(()) }`.
    fn assert_running(&self) -> Result<()> {
        if self.running() {
            Ok(())
        } else {
            Err(self.terminate())
        }
    }
}

/// The canonical always-running flag.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysRunning;

impl TerminationFlag for AlwaysRunning {
    fn running(&self) -> bool {
        true
    }

    fn terminate(&self) -> Error {
        Error::terminated("AlwaysRunning flag was asked to terminate")
    }
}

/// The canonical always-terminated flag.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysTerminated;

impl TerminationFlag for AlwaysTerminated {
    fn running(&self) -> bool {
        false
    }

    fn terminate(&self) -> Error {
        Error::terminated("run was cancelled before it started")
    }
}

/// A [`TerminationFlag`] backed by a [`TerminationMonitor`], with throttled
/// polling: once termination is observed, subsequent calls to `running()`
/// return `false` without touching the monitor again; until then the
/// monitor is re-polled only when more than `interval` has elapsed since
/// the last check.
pub struct MonitorFlag<M: TerminationMonitor> {
    monitor: M,
    interval: Duration,
    cause: Option<Box<dyn Fn() -> Error + Send + Sync>>,
    observed_terminated: AtomicBool,
    last_check: Mutex<Instant>,
}

impl<M: TerminationMonitor> MonitorFlag<M> {
    /// Creates a flag with the default 10s poll interval.
    pub fn new(monitor: M) -> Self {
        Self::with_interval(monitor, DEFAULT_POLL_INTERVAL)
    }

    /// Creates a flag with an explicit poll interval, mainly for tests that
    /// cannot afford to wait out the 10s default.
    pub fn with_interval(monitor: M, interval: Duration) -> Self {
        Self {
            monitor,
            interval,
            cause: None,
            observed_terminated: AtomicBool::new(false),
            last_check: Mutex::new(Instant::now() - interval),
        }
    }

    /// Attaches a cause supplier: `terminate()` will raise this error
    /// instead of the generic terminated error.
    #[must_use]
    pub fn with_cause(mut self, cause: impl Fn() -> Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }
}

impl<M: TerminationMonitor> TerminationFlag for MonitorFlag<M> {
    fn running(&self) -> bool {
        if self.observed_terminated.load(Ordering::Acquire) {
            return false;
        }

        let now = Instant::now();
        let mut last_check = self.last_check.lock().expect("last_check mutex poisoned");
        if now.duration_since(*last_check) < self.interval {
            return true;
        }
        *last_check = now;
        drop(last_check);

        if self.monitor.is_terminated() {
            self.observed_terminated.store(true, Ordering::Release);
            tracing::info!(
                target: "concur_core::termination",
                "termination monitor fired, flag latched"
            );
            false
        } else {
            true
        }
    }

    fn terminate(&self) -> Error {
        match &self.cause {
            Some(cause) => cause(),
            None => Error::terminated("termination flag fired"),
        }
    }
}
