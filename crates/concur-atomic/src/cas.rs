//! CAS-retry update loop over a 64-bit atomic cell.

use std::sync::atomic::{AtomicI64, Ordering};

/// Reads `cell`, computes `update_fn(current)`, and CASes the result in,
/// retrying on contention. Returns the value that was current immediately
/// before the successful swap.
///
/// `update_fn` must be pure and cheap: it may be invoked more than once if
/// another thread wins the race.
pub fn update_loop(cell: &AtomicI64, mut update_fn: impl FnMut(i64) -> i64) -> i64 {
    loop {
        let current = cell.load(Ordering::Acquire);
        let new = update_fn(current);
        match cell.compare_exchange_weak(current, new, Ordering::AcqRel, Ordering::Acquire) {
            Ok(previous) => return previous,
            Err(_) => continue,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn single_threaded_update_applies_function_once() {
        let cell = AtomicI64::new(10);
        let previous = update_loop(&cell, |current| current * 2);
        assert_eq!(previous, 10);
        assert_eq!(cell.load(Ordering::SeqCst), 20);
    }

    #[test]
    fn concurrent_updates_never_drop_an_increment() {
        const THREADS: i64 = 8;
        const ITERATIONS: i64 = 5_000;

        let cell = Arc::new(AtomicI64::new(0));
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let cell = Arc::clone(&cell);
                thread::spawn(move || {
                    for _ in 0..ITERATIONS {
                        update_loop(&cell, |current| current + 1);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cell.load(Ordering::SeqCst), THREADS * ITERATIONS);
    }

    #[test]
    fn update_never_observes_a_regression() {
        let cell = Arc::new(AtomicI64::new(0));
        let mut last_seen = 0;
        let cell2 = Arc::clone(&cell);
        let writer = thread::spawn(move || {
            for _ in 0..1_000 {
                update_loop(&cell2, |current| current + 1);
            }
        });
        for _ in 0..1_000 {
            let value = cell.load(Ordering::SeqCst);
            assert!(value >= last_seen);
            last_seen = value;
        }
        writer.join().unwrap();
    }
}
