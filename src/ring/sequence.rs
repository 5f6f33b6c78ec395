//! Cache-line-padded atomic sequence counters (§4.1, §4.2).

use std::sync::atomic::{AtomicI64, Ordering};

use crossbeam_utils::CachePadded;

/// Value stored in a fresh [`Sequence`] before anything has been claimed.
pub const INITIAL_SEQUENCE: i64 = -1;

/// A monotonically increasing counter shared between a producer/consumer
/// pair. Padded to a cache line so neighboring sequences (e.g. one per
/// consumer) never false-share.
#[derive(Debug)]
pub struct Sequence(CachePadded<AtomicI64>);

impl Sequence {
    /// A new sequence initialized to `value`.
    #[must_use]
    pub fn new(value: i64) -> Self {
        Self(CachePadded::new(AtomicI64::new(value)))
    }

    /// A new sequence initialized to [`INITIAL_SEQUENCE`].
    #[must_use]
    pub fn initial() -> Self {
        Self::new(INITIAL_SEQUENCE)
    }

    /// Current value, acquiring any writes published before it.
    #[must_use]
    pub fn get(&self) -> i64 {
        self.0.load(Ordering::Acquire)
    }

    /// Publish a new value.
    pub fn set(&self, value: i64) {
        self.0.store(value, Ordering::Release);
    }

    /// Atomically compare-and-swap, used by the multi-producer sequencer to
    /// claim a range without a lock.
    pub fn compare_and_swap(&self, current: i64, new: i64) -> bool {
        self.0
            .compare_exchange(current, new, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Atomically add `delta`, returning the value *after* the addition —
    /// used by the multi-producer sequencer's `next(n)` claim.
    pub fn add_and_get(&self, delta: i64) -> i64 {
        self.0.fetch_add(delta, Ordering::AcqRel) + delta
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::initial()
    }
}

/// The minimum of a fixed group of dependency sequences (§4.2: "Sequence
/// barriers compose multiple dependency sequences via a fixed group").
#[must_use]
pub fn min_sequence(sequences: &[std::sync::Arc<Sequence>]) -> i64 {
    sequences.iter().map(|s| s.get()).min().unwrap_or(i64::MAX)
}
