//! Queue-backed streaming iterator.

use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

use concur_core::{Result, TerminationFlag};

const TRACING_TARGET: &str = "concur_stream::queue_iter";

/// A `tryAdvance`-style iterator over a blocking queue.
///
/// Unlike `std::sync::mpsc::Receiver` alone, end-of-stream is signalled
/// two ways: an explicit tombstone value sent by the producer, or a poll
/// that times out. Both are treated identically — the stream is over,
/// not errored — so a misbehaving producer can only ever stall an
/// advance for `timeout`, never forever.
///
/// Deliberately blocking rather than `async`: this is meant to be driven
/// from inside a synchronous [`Task`](concur_core::Task) closure the
/// same way [`WorkerPool`](concur_core)'s worker loop runs task bodies,
/// not from inside a `.await` chain.
pub struct QueueIter<T> {
    receiver: Receiver<T>,
    timeout: Duration,
    tombstone: T,
    termination: Arc<dyn TerminationFlag>,
    prefetched: Option<T>,
}

impl<T> QueueIter<T>
where
    T: PartialEq,
{
    /// Builds a new iterator over `receiver`, pre-fetching the first
    /// element immediately. `tombstone` is the sentinel value a producer
    /// sends to signal a deliberate end of stream; `timeout` bounds how
    /// long each poll waits before treating the queue as exhausted.
    #[must_use]
    pub fn new(receiver: Receiver<T>, tombstone: T, timeout: Duration, termination: Arc<dyn TerminationFlag>) -> Self {
        let mut iter = Self {
            receiver,
            timeout,
            tombstone,
            termination,
            prefetched: None,
        };
        iter.prefetched = iter.poll();
        iter
    }

    /// Whether splitting this iterator for parallel consumption is
    /// supported. Always `false`: a single-consumer blocking queue has
    /// no way to hand off a disjoint sub-range.
    #[must_use]
    pub const fn is_splittable(&self) -> bool {
        false
    }

    /// The size estimate for the remaining stream. Always `None`: the
    /// producer side may still be running.
    #[must_use]
    pub const fn size_estimate(&self) -> Option<u64> {
        None
    }

    /// If an element is pre-fetched and isn't the tombstone, asserts the
    /// termination flag, invokes `action` with it, pre-fetches the next
    /// element, and returns `Ok(true)`. Returns `Ok(false)` once the
    /// pre-fetched slot is empty or holds the tombstone — the end of the
    /// stream. Returns `Err` only if the termination flag itself fails.
    pub fn try_advance<F>(&mut self, action: F) -> Result<bool>
    where
        F: FnOnce(&T),
    {
        match &self.prefetched {
            None => return Ok(false),
            Some(entry) if *entry == self.tombstone => return Ok(false),
            Some(_) => {}
        }

        self.termination.assert_running()?;
        let entry = self.prefetched.take().expect("checked Some above");
        action(&entry);
        self.prefetched = self.poll();
        Ok(true)
    }

    fn poll(&self) -> Option<T> {
        match self.receiver.recv_timeout(self.timeout) {
            Ok(value) => Some(value),
            Err(_timeout_or_disconnected) => {
                tracing::debug!(target: TRACING_TARGET, "queue poll timed out or producer gone, ending stream");
                None
            }
        }
    }
}
