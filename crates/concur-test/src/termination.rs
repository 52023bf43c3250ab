//! A deterministic fake [`TerminationMonitor`] for tests that need
//! precise control over exactly when a run is asked to stop, without
//! racing a real clock or external signal.

use std::sync::atomic::{AtomicUsize, Ordering};

use concur_core::TerminationMonitor;

/// Reports terminated once [`poll`](Self::poll) (or `is_terminated`) has
/// been called `fire_after` times; `0` fires immediately, and `usize::MAX`
/// never fires within any realistic test.
pub struct FakeTerminationMonitor {
    polls: AtomicUsize,
    fire_after: usize,
}

impl FakeTerminationMonitor {
    /// A monitor that never reports terminated.
    #[must_use]
    pub fn never() -> Self {
        Self {
            polls: AtomicUsize::new(0),
            fire_after: usize::MAX,
        }
    }

    /// A monitor that reports terminated starting from its `fire_after`th poll.
    #[must_use]
    pub fn firing_after(fire_after: usize) -> Self {
        Self {
            polls: AtomicUsize::new(0),
            fire_after,
        }
    }

    /// The number of times `is_terminated` has been called so far.
    #[must_use]
    pub fn poll_count(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

impl TerminationMonitor for FakeTerminationMonitor {
    fn is_terminated(&self) -> bool {
        let n = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
        n >= self.fire_after
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_firing_monitor_stays_false() {
        let monitor = FakeTerminationMonitor::never();
        for _ in 0..1000 {
            assert!(!monitor.is_terminated());
        }
    }

    #[test]
    fn fires_on_the_configured_poll() {
        let monitor = FakeTerminationMonitor::firing_after(3);
        assert!(!monitor.is_terminated());
        assert!(!monitor.is_terminated());
        assert!(monitor.is_terminated());
        assert_eq!(monitor.poll_count(), 3);
    }

    #[test]
    fn zero_fires_on_the_first_poll() {
        let monitor = FakeTerminationMonitor::firing_after(0);
        assert!(monitor.is_terminated());
    }
}
