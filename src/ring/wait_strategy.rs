//! Interchangeable consumer wait strategies (§4.1).
//!
//! Every strategy answers the same question: given a `target` sequence a
//! consumer wants to observe published, and a cursor/dependency set that
//! will eventually reach it, how should the calling thread wait?

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use super::sequence::Sequence;

/// Raised by [`crate::ring::barrier::SequenceBarrier::halt`]; every blocked
/// waiter observes it and surfaces [`crate::error::RingBufferError::Alerted`]
/// to its consumer loop (§4.1 "Cancellation").
#[derive(Debug, Default)]
pub struct AlertFlag(AtomicBool);

impl AlertFlag {
    #[must_use]
    pub fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// A strategy for blocking a consumer thread until `cursor >= target` (or
/// alerted).
pub trait WaitStrategy: Send + Sync {
    /// Block until `cursor.get() >= target` or `alert.is_raised()`. Returns
    /// the observed cursor value, which may be `>= target`.
    fn wait_for(&self, target: i64, cursor: &Sequence, alert: &AlertFlag) -> i64;

    /// Called by a producer immediately after `publish` so that blocked
    /// waiters can be woken (no-op for spinning strategies).
    fn signal_all(&self) {}
}

/// Lowest latency, highest CPU: a tight loop re-reading the cursor.
#[derive(Debug, Default)]
pub struct BusySpinWaitStrategy;

impl WaitStrategy for BusySpinWaitStrategy {
    fn wait_for(&self, target: i64, cursor: &Sequence, alert: &AlertFlag) -> i64 {
        loop {
            let available = cursor.get();
            if available >= target || alert.is_raised() {
                return available;
            }
            std::hint::spin_loop();
        }
    }
}

/// Bounded spin, then a cooperative `thread::yield_now` — a middle ground
/// between [`BusySpinWaitStrategy`] and [`BlockingWaitStrategy`].
#[derive(Debug)]
pub struct YieldingWaitStrategy {
    spin_tries: u32,
}

impl YieldingWaitStrategy {
    const DEFAULT_SPIN_TRIES: u32 = 100;

    #[must_use]
    pub fn new() -> Self {
        Self {
            spin_tries: Self::DEFAULT_SPIN_TRIES,
        }
    }
}

impl Default for YieldingWaitStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitStrategy for YieldingWaitStrategy {
    fn wait_for(&self, target: i64, cursor: &Sequence, alert: &AlertFlag) -> i64 {
        let mut spins = self.spin_tries;
        loop {
            let available = cursor.get();
            if available >= target || alert.is_raised() {
                return available;
            }
            if spins > 0 {
                spins -= 1;
                std::hint::spin_loop();
            } else {
                std::thread::yield_now();
            }
        }
    }
}

/// Condition-variable wakeups: lowest CPU, highest latency. Producers must
/// call [`BlockingWaitStrategy::signal_all`] after publishing.
#[derive(Debug, Default)]
pub struct BlockingWaitStrategy {
    gate: Arc<(Mutex<()>, Condvar)>,
}

impl BlockingWaitStrategy {
    #[must_use]
    pub fn new() -> Self {
        Self {
            gate: Arc::new((Mutex::new(()), Condvar::new())),
        }
    }
}

impl WaitStrategy for BlockingWaitStrategy {
    fn wait_for(&self, target: i64, cursor: &Sequence, alert: &AlertFlag) -> i64 {
        let available = cursor.get();
        if available >= target || alert.is_raised() {
            return available;
        }
        let (lock, cvar) = &*self.gate;
        let mut guard = lock.lock();
        loop {
            let available = cursor.get();
            if available >= target || alert.is_raised() {
                return available;
            }
            cvar.wait_for(&mut guard, Duration::from_millis(1));
        }
    }

    fn signal_all(&self) {
        let (_lock, cvar) = &*self.gate;
        cvar.notify_all();
    }
}

/// Picks a concrete [`WaitStrategy`] from [`crate::config::WaitStrategyKind`]
/// without paying for dynamic dispatch on the hot wait loop itself (each
/// concrete type is still monomorphized where it is used).
#[derive(Debug)]
pub enum AnyWaitStrategy {
    BusySpin(BusySpinWaitStrategy),
    Yielding(YieldingWaitStrategy),
    Blocking(BlockingWaitStrategy),
}

impl WaitStrategy for AnyWaitStrategy {
    fn wait_for(&self, target: i64, cursor: &Sequence, alert: &AlertFlag) -> i64 {
        match self {
            AnyWaitStrategy::BusySpin(w) => w.wait_for(target, cursor, alert),
            AnyWaitStrategy::Yielding(w) => w.wait_for(target, cursor, alert),
            AnyWaitStrategy::Blocking(w) => w.wait_for(target, cursor, alert),
        }
    }

    fn signal_all(&self) {
        match self {
            AnyWaitStrategy::BusySpin(w) => w.signal_all(),
            AnyWaitStrategy::Yielding(w) => w.signal_all(),
            AnyWaitStrategy::Blocking(w) => w.signal_all(),
        }
    }
}
