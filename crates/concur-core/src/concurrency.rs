//! The `Concurrency` value type.

use std::fmt;

use crate::error::{Error, Result};

/// A validated, immutable parallelism level.
///
/// `Concurrency` always wraps a value `>= 1`; constructors that would
/// produce `0` or a negative value fail with
/// [`ErrorKind::InvalidArgument`](crate::ErrorKind::InvalidArgument)
/// instead of panicking, since the value commonly comes from user-supplied
/// configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Concurrency(u32);

impl Concurrency {
    /// A `Concurrency` of `1`, useful as a default for sequential execution.
    pub const SINGLE_THREADED: Concurrency = Concurrency(1);

    /// Creates a new `Concurrency`, failing if `n < 1`.
    pub fn new(n: i64) -> Result<Self> {
        if n < 1 {
            return Err(Error::invalid_argument(format!(
                "concurrency must be >= 1, got {n}"
            )));
        }
        Ok(Self(n as u32))
    }

    /// Creates a `Concurrency` derived from the available CPU parallelism,
    /// scaled by `factor` and floored at `1` (spec §3's "cpu-derived"
    /// `PoolSizes` variant reuses this for its core/max computation).
    #[must_use]
    pub fn of_cpus(factor: f64) -> Self {
        let cpus = std::thread::available_parallelism()
            .map(std::num::NonZeroUsize::get)
            .unwrap_or(1);
        let scaled = ((cpus as f64) * factor).floor() as u32;
        Self(scaled.max(1))
    }

    /// Returns the underlying parallelism level.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Returns the value as `usize`, the common unit for batch/index math.
    #[must_use]
    pub const fn value_as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Concurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for Concurrency {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<u32> for Concurrency {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        Self::new(i64::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn positive_values_round_trip() {
        for n in 1..=16_i64 {
            assert_eq!(Concurrency::new(n).unwrap().value(), n as u32);
        }
    }

    #[test]
    fn zero_and_negative_values_are_invalid_argument() {
        for n in [0, -1, -100] {
            let err = Concurrency::new(n).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        }
    }

    #[test]
    fn of_cpus_is_never_zero() {
        assert!(Concurrency::of_cpus(0.0).value() >= 1);
        assert!(Concurrency::of_cpus(-5.0).value() >= 1);
    }

    #[test]
    fn equality_and_hash_are_keyed_on_value() {
        use std::collections::HashSet;
        let a = Concurrency::new(4).unwrap();
        let b = Concurrency::new(4).unwrap();
        assert_eq!(a, b);
        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }
}
