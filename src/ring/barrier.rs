//! Sequence barriers: how a consumer learns "you may read up to here"
//! (§4.1, §4.2).

use std::sync::Arc;

use crate::error::RingBufferError;

use super::sequence::{Sequence, min_sequence};
use super::sequencer::Cursored;
use super::wait_strategy::{AlertFlag, AnyWaitStrategy, WaitStrategy};

/// Gates a consumer on the publisher's cursor *and* a fixed set of upstream
/// consumer sequences (§4.2: "composes multiple dependency sequences via a
/// fixed group (min across sequences)").
pub struct SequenceBarrier {
    source: Arc<dyn Cursored>,
    dependencies: Vec<Arc<Sequence>>,
    wait_strategy: Arc<AnyWaitStrategy>,
    alert: Arc<AlertFlag>,
}

impl SequenceBarrier {
    #[must_use]
    pub fn new(
        source: Arc<dyn Cursored>,
        dependencies: Vec<Arc<Sequence>>,
        wait_strategy: Arc<AnyWaitStrategy>,
        alert: Arc<AlertFlag>,
    ) -> Self {
        Self {
            source,
            dependencies,
            wait_strategy,
            alert,
        }
    }

    /// Block until sequence `target` is available to read, or the barrier
    /// is alerted. Returns the highest sequence known safe to read, which
    /// may be `>= target` (§4.2 `getHighestPublishedSequence`).
    pub fn wait_for(&self, target: i64) -> Result<i64, RingBufferError> {
        if self.alert.is_raised() {
            return Err(RingBufferError::Alerted);
        }
        let claimed = self
            .wait_strategy
            .wait_for(target, self.source.cursor_sequence(), &self.alert);
        if self.alert.is_raised() {
            return Err(RingBufferError::Alerted);
        }
        let highest = self.source.highest_published_sequence(target, claimed);
        let gated = if self.dependencies.is_empty() {
            highest
        } else {
            highest.min(min_sequence(&self.dependencies))
        };
        Ok(gated)
    }

    /// Raise the alert flag and wake every waiter on this barrier's wait
    /// strategy (§4.1 "halt").
    pub fn halt(&self) {
        self.alert.raise();
        self.wait_strategy.signal_all();
    }

    #[must_use]
    pub fn is_alerted(&self) -> bool {
        self.alert.is_raised()
    }

    pub fn clear_alert(&self) {
        self.alert.clear();
    }
}
