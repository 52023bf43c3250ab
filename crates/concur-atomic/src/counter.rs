//! Cache-line-padded atomic counter.

use std::sync::atomic::{AtomicI64, Ordering};

/// An `i64` counter isolated within its own cache line.
///
/// A bare `AtomicI64` is 8 bytes; left unpadded, several counters packed
/// into an array would share a 64-byte cache line and every update would
/// bounce that line between cores (false sharing). `PaddedCounter` pads
/// itself out to a full 64-byte line with seven `u64` filler fields, and
/// aligns itself to 64 bytes so the padding actually lands the value on
/// its own line rather than merely following it.
#[repr(align(64))]
pub struct PaddedCounter {
    value: AtomicI64,
    _pad0: u64,
    _pad1: u64,
    _pad2: u64,
    _pad3: u64,
    _pad4: u64,
    _pad5: u64,
    _pad6: u64,
}

impl PaddedCounter {
    /// Creates a counter initialised to `initial`.
    #[must_use]
    pub const fn new(initial: i64) -> Self {
        Self {
            value: AtomicI64::new(initial),
            _pad0: 0,
            _pad1: 0,
            _pad2: 0,
            _pad3: 0,
            _pad4: 0,
            _pad5: 0,
            _pad6: 0,
        }
    }

    /// Reads the padding fields and folds them into a checksum.
    ///
    /// The padding fields are never written after construction, so this is
    /// always `0`; the point is that reading them here keeps the compiler
    /// from proving they are dead and eliding them, which would silently
    /// reintroduce false sharing.
    #[must_use]
    pub fn sum(&self) -> u64 {
        self._pad0
            ^ self._pad1
            ^ self._pad2
            ^ self._pad3
            ^ self._pad4
            ^ self._pad5
            ^ self._pad6
    }

    /// Linearisable load.
    #[must_use]
    pub fn load(&self) -> i64 {
        self.value.load(Ordering::SeqCst)
    }

    /// Linearisable store.
    pub fn store(&self, new: i64) {
        self.value.store(new, Ordering::SeqCst);
    }

    /// Linearisable compare-and-swap; returns `true` iff the swap happened.
    pub fn compare_and_swap(&self, current: i64, new: i64) -> bool {
        self.value
            .compare_exchange(current, new, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Linearisable swap, returning the previous value.
    pub fn get_and_set(&self, new: i64) -> i64 {
        self.value.swap(new, Ordering::SeqCst)
    }

    /// Linearisable add, returning the value *after* the add.
    pub fn add_and_get(&self, delta: i64) -> i64 {
        self.value.fetch_add(delta, Ordering::SeqCst) + delta
    }

    /// Linearisable add, returning the value *before* the add.
    pub fn get_and_add(&self, delta: i64) -> i64 {
        self.value.fetch_add(delta, Ordering::SeqCst)
    }

    /// Linearisable subtract, returning the value after the subtraction.
    pub fn sub_and_get(&self, delta: i64) -> i64 {
        self.value.fetch_sub(delta, Ordering::SeqCst) - delta
    }

    /// `add_and_get(1)`.
    pub fn increment_and_get(&self) -> i64 {
        self.add_and_get(1)
    }

    /// `sub_and_get(1)`.
    pub fn decrement_and_get(&self) -> i64 {
        self.sub_and_get(1)
    }
}

impl Default for PaddedCounter {
    fn default() -> Self {
        Self::new(0)
    }
}

impl std::fmt::Debug for PaddedCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaddedCounter")
            .field("value", &self.load())
            .finish()
    }
}
