//! The multi-producer ring buffer and its sequencer (§4.1, §4.2).

use std::cell::UnsafeCell;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use parking_lot::RwLock;

use crate::error::RingBufferError;

use super::sequence::{Sequence, min_sequence};

/// Anything that can report a claim cursor and resolve the highest
/// contiguously published sequence in a range — the two primitives a
/// [`super::barrier::SequenceBarrier`] needs from its upstream producer or
/// processor (§4.2).
pub trait Cursored: Send + Sync {
    /// The sequence a waiting consumer should poll: the highest *claimed*
    /// sequence, which a multi-producer sequencer may still be in the
    /// process of publishing out of order.
    fn cursor_sequence(&self) -> &Sequence;

    /// The largest contiguous published sequence in `[lower_bound,
    /// available_upper_bound]` (§4.2).
    fn highest_published_sequence(&self, lower_bound: i64, available_upper_bound: i64) -> i64;
}

/// A fixed-capacity (power-of-two) circular buffer of preallocated slots
/// with a multi-producer claim sequencer layered on top (§4.1, §4.2).
///
/// Producers call [`RingBuffer::next`] to claim a contiguous range, mutate
/// the claimed slots through [`RingBuffer::get_mut`], then
/// [`RingBuffer::publish`]. Consumers read through a
/// [`super::barrier::SequenceBarrier`] built from [`RingBuffer::new_barrier`].
pub struct RingBuffer<T> {
    buffer: Box<[UnsafeCell<T>]>,
    mask: i64,
    buffer_size: i64,
    /// Highest sequence any producer has claimed (not necessarily
    /// published yet) — the value consumer wait strategies poll.
    claim_cursor: Arc<Sequence>,
    /// Per-slot record of which sequence was last published there (§4.2
    /// `availableBuffer`). `-1` means "never published".
    available: Box<[AtomicI64]>,
    /// Sequences of every registered consumer stage; producers must not
    /// claim past `min(gating_sequences) + buffer_size`.
    gating_sequences: RwLock<Vec<Arc<Sequence>>>,
}

// SAFETY: slot access is synchronized entirely through sequence claims —
// a producer only calls `get_mut` on a slot it has exclusively claimed via
// `next`, and consumers only call `get` on slots the barrier has confirmed
// published, i.e. no longer touched by their producer.
unsafe impl<T: Send> Sync for RingBuffer<T> {}

impl<T> RingBuffer<T> {
    /// Build a ring of `size` slots (must be a power of two), each
    /// initialized by `factory`.
    pub fn new(size: usize, mut factory: impl FnMut() -> T) -> Result<Self, RingBufferError> {
        if size == 0 || !size.is_power_of_two() {
            return Err(RingBufferError::NotPowerOfTwo(size as i64));
        }
        let buffer: Box<[UnsafeCell<T>]> = (0..size).map(|_| UnsafeCell::new(factory())).collect();
        let available: Box<[AtomicI64]> = (0..size).map(|_| AtomicI64::new(-1)).collect();
        Ok(Self {
            buffer,
            mask: size as i64 - 1,
            buffer_size: size as i64,
            claim_cursor: Arc::new(Sequence::initial()),
            available,
            gating_sequences: RwLock::new(Vec::new()),
        })
    }

    #[must_use]
    pub fn buffer_size(&self) -> i64 {
        self.buffer_size
    }

    fn index(&self, seq: i64) -> usize {
        (seq & self.mask) as usize
    }

    /// Register a consumer stage's sequence as a gate on producer claims
    /// (§5 "Producers may block in `next(n)` if the ring is full").
    pub fn add_gating_sequence(&self, sequence: Arc<Sequence>) {
        self.gating_sequences.write().push(sequence);
    }

    /// Build a barrier for a consumer stage that depends on this ring's
    /// publication cursor plus any upstream `dependencies` (other stages
    /// that must process a sequence before this one may).
    #[must_use]
    pub fn new_barrier(
        self: &Arc<Self>,
        dependencies: Vec<Arc<Sequence>>,
        wait_strategy: Arc<super::wait_strategy::AnyWaitStrategy>,
        alert: Arc<super::wait_strategy::AlertFlag>,
    ) -> super::barrier::SequenceBarrier {
        super::barrier::SequenceBarrier::new(
            self.clone() as Arc<dyn Cursored>,
            dependencies,
            wait_strategy,
            alert,
        )
    }

    /// Claim a contiguous range of `n` slots, blocking (spin/yield) while
    /// the ring is full with respect to the slowest registered consumer.
    /// Returns `(lo, hi)` inclusive.
    pub fn next(&self, n: i64) -> (i64, i64) {
        debug_assert!(n > 0 && n <= self.buffer_size);
        loop {
            let current = self.claim_cursor.get();
            let next_value = current + n;
            let wrap_point = next_value - self.buffer_size;
            let gating = {
                let gates = self.gating_sequences.read();
                if gates.is_empty() {
                    i64::MAX
                } else {
                    min_sequence(&gates)
                }
            };
            if wrap_point > gating {
                std::thread::yield_now();
                continue;
            }
            if self.claim_cursor.compare_and_swap(current, next_value) {
                return (current + 1, next_value);
            }
        }
    }

    /// Claim a single slot. Convenience wrapper over [`RingBuffer::next`].
    pub fn next_one(&self) -> i64 {
        self.next(1).1
    }

    /// Mutable access to a claimed-but-not-yet-published slot. Caller must
    /// hold the claim for `seq` (i.e. it came back from [`RingBuffer::next`]
    /// and has not yet been published).
    #[allow(clippy::mut_from_ref)]
    pub fn get_mut(&self, seq: i64) -> &mut T {
        // SAFETY: see the `unsafe impl Sync` note above.
        unsafe { &mut *self.buffer[self.index(seq)].get() }
    }

    /// Shared access to a published slot.
    pub fn get(&self, seq: i64) -> &T {
        // SAFETY: see the `unsafe impl Sync` note above.
        unsafe { &*self.buffer[self.index(seq)].get() }
    }

    /// Publish `[lo, hi]` inclusive, making them visible to consumers and
    /// waking any blocked wait strategy.
    pub fn publish(&self, lo: i64, hi: i64, wait_strategy: &super::wait_strategy::AnyWaitStrategy) {
        for seq in lo..=hi {
            self.available[self.index(seq)].store(seq, Ordering::Release);
        }
        wait_strategy.signal_all();
    }

    fn is_available(&self, seq: i64) -> bool {
        self.available[self.index(seq)].load(Ordering::Acquire) == seq
    }
}

impl<T: Send> Cursored for RingBuffer<T> {
    fn cursor_sequence(&self) -> &Sequence {
        &self.claim_cursor
    }

    fn highest_published_sequence(&self, lower_bound: i64, available_upper_bound: i64) -> i64 {
        let mut seq = lower_bound;
        while seq <= available_upper_bound {
            if !self.is_available(seq) {
                return seq - 1;
            }
            seq += 1;
        }
        available_upper_bound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_power_of_two() {
        assert!(matches!(
            RingBuffer::new(3, || 0i64),
            Err(RingBufferError::NotPowerOfTwo(3))
        ));
    }

    #[test]
    fn claim_and_publish_round_trip() {
        let ring = RingBuffer::new(8, || 0i64).unwrap();
        let (lo, hi) = ring.next(3);
        assert_eq!((lo, hi), (0, 2));
        for s in lo..=hi {
            *ring.get_mut(s) = s * 10;
        }
        let strategy = super::super::wait_strategy::AnyWaitStrategy::BusySpin(
            super::super::wait_strategy::BusySpinWaitStrategy,
        );
        ring.publish(lo, hi, &strategy);
        assert_eq!(ring.highest_published_sequence(0, 2), 2);
        assert_eq!(*ring.get(1), 10);
    }

    #[test]
    fn gating_sequence_blocks_wrap_around() {
        let ring = Arc::new(RingBuffer::new(4, || 0i64).unwrap());
        let consumer_seq = Arc::new(Sequence::initial());
        ring.add_gating_sequence(consumer_seq.clone());
        let (lo, hi) = ring.next(4);
        assert_eq!((lo, hi), (0, 3));
        let strategy = super::super::wait_strategy::AnyWaitStrategy::BusySpin(
            super::super::wait_strategy::BusySpinWaitStrategy,
        );
        ring.publish(lo, hi, &strategy);
        // Ring is full relative to the lagging consumer; advance it then
        // claiming one more slot should succeed promptly.
        consumer_seq.set(0);
        let (lo2, hi2) = ring.next(1);
        assert_eq!((lo2, hi2), (4, 4));
    }
}
