//! Bounded spin-wait.

use std::sync::atomic::{AtomicI64, Ordering};

/// Unbounded attempt count (`maxAttempts = -1` in spec §4.8).
pub const UNBOUNDED: i64 = -1;

/// Spins on `cell`, returning `true` as soon as it observes `expected`.
///
/// Each failed iteration yields the current thread so the spin does not
/// monopolise a core while waiting for the writer to make progress.
/// `max_attempts == UNBOUNDED` spins forever until a match is observed;
/// otherwise returns `false` once `max_attempts` reads have all missed.
pub fn spin_wait(cell: &AtomicI64, expected: i64, max_attempts: i64) -> bool {
    let mut attempts: i64 = 0;
    loop {
        if cell.load(Ordering::Acquire) == expected {
            return true;
        }
        if max_attempts != UNBOUNDED {
            attempts += 1;
            if attempts >= max_attempts {
                return cell.load(Ordering::Acquire) == expected;
            }
        }
        std::thread::yield_now();
    }
}
