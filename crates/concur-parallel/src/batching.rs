//! Batch-size math.

use concur_core::{Concurrency, Error, Result};

/// `ceil(element_count / batch_size)`, requiring `batch_size >= 1`.
pub fn thread_count(batch_size: u64, element_count: u64) -> Result<u64> {
    if batch_size < 1 {
        return Err(Error::invalid_argument(format!(
            "batch size must be >= 1, got {batch_size}"
        )));
    }
    Ok(element_count.div_ceil(batch_size))
}

/// `max(min_batch, ceil(node_count / concurrency))`.
#[must_use]
pub fn adjusted_batch_size(node_count: u64, concurrency: Concurrency, min_batch: u64) -> u64 {
    let computed = node_count.div_ceil(u64::from(concurrency.value()));
    computed.max(min_batch)
}

/// [`adjusted_batch_size`], capped at `max_batch`.
#[must_use]
pub fn adjusted_batch_size_with_cap(
    node_count: u64,
    concurrency: Concurrency,
    min_batch: u64,
    max_batch: u64,
) -> u64 {
    adjusted_batch_size(node_count, concurrency, min_batch).min(max_batch)
}

/// Rounds `batch_size` up to the next power of two (at least 1), then
/// keeps doubling until the resulting thread count — `ceil((node_count +
/// batch_size + 1) / batch_size)` — fits within an `i32`, matching the
/// bound the paged-array page count must respect.
pub fn power_of_two_batch_size(node_count: u64, batch_size: u64) -> Result<u64> {
    if batch_size < 1 {
        return Err(Error::invalid_argument(format!(
            "batch size must be >= 1, got {batch_size}"
        )));
    }

    let mut size = batch_size.next_power_of_two().max(1);
    loop {
        let count = node_count.saturating_add(size).saturating_add(1);
        let implied_threads = count.div_ceil(size);
        if implied_threads <= i64::from(i32::MAX) as u64 {
            return Ok(size);
        }
        size = size.saturating_mul(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_count_rounds_up() {
        assert_eq!(thread_count(10, 95).unwrap(), 10);
        assert_eq!(thread_count(10, 100).unwrap(), 10);
        assert_eq!(thread_count(10, 101).unwrap(), 11);
    }

    #[test]
    fn thread_count_rejects_zero_batch() {
        assert!(thread_count(0, 100).is_err());
    }

    #[test]
    fn thread_count_of_equal_or_larger_batch_is_one() {
        assert_eq!(thread_count(100, 100).unwrap(), 1);
        assert_eq!(thread_count(200, 100).unwrap(), 1);
    }

    #[test]
    fn adjusted_batch_size_respects_the_floor() {
        let concurrency = Concurrency::new(4).unwrap();
        assert_eq!(adjusted_batch_size(8, concurrency, 10), 10);
        assert_eq!(adjusted_batch_size(100, concurrency, 10), 25);
    }

    #[test]
    fn adjusted_batch_size_with_cap_respects_the_ceiling() {
        let concurrency = Concurrency::new(2).unwrap();
        assert_eq!(adjusted_batch_size_with_cap(1000, concurrency, 1, 100), 100);
    }

    #[test]
    fn power_of_two_batch_size_rounds_up_to_a_power_of_two() {
        assert_eq!(power_of_two_batch_size(1000, 3).unwrap(), 4);
        assert_eq!(power_of_two_batch_size(1000, 4).unwrap(), 4);
    }

    #[test]
    fn power_of_two_batch_size_rejects_zero() {
        assert!(power_of_two_batch_size(1000, 0).is_err());
    }
}
