//! The two-step master/slave processor: pairs one risk shard's R1
//! (pre-risk) and R2 (post-risk) passes on a single thread (§4.3, §9
//! "Two-step master/slave control flow").
//!
//! R1 runs first and publishes its own sequence immediately — this is
//! what the matching engine shards gate on. The same thread then blocks
//! on the matching engines' sequences reaching the same upper bound
//! before running R2 for that range and publishing a second, independent
//! sequence that gates the results handler (and, when enabled, anything
//! chained after R2). Running both passes here, rather than handing R2
//! to a second thread fed over a channel, is what keeps a `UserProfile`
//! single-writer (§5 "Per user uid, all mutating operations are
//! serialized on a single R1/R2 pair").

use std::sync::Arc;

use tracing::error;

use crate::model::OrderCommand;
use crate::ring::{RingBuffer, Sequence, SequenceBarrier};
use crate::risk::RiskEngine;

/// Drives one [`RiskEngine`] shard through both halves of the two-step
/// contract.
pub struct TwoStepRiskProcessor {
    engine: RiskEngine,
    /// Published right after the R1 pass for a batch; matching engine
    /// shards depend on this.
    r1_sequence: Arc<Sequence>,
    /// Published after the R2 pass for the same batch; the results
    /// handler (and post-R2 journaling, if any) depends on this.
    r2_sequence: Arc<Sequence>,
}

impl TwoStepRiskProcessor {
    #[must_use]
    pub fn new(engine: RiskEngine) -> Self {
        Self {
            engine,
            r1_sequence: Arc::new(Sequence::initial()),
            r2_sequence: Arc::new(Sequence::initial()),
        }
    }

    /// The sequence matching engine shards should gate on.
    #[must_use]
    pub fn r1_sequence(&self) -> Arc<Sequence> {
        self.r1_sequence.clone()
    }

    /// The sequence the results handler should gate on.
    #[must_use]
    pub fn r2_sequence(&self) -> Arc<Sequence> {
        self.r2_sequence.clone()
    }

    #[must_use]
    pub fn engine(&self) -> &RiskEngine {
        &self.engine
    }

    /// Run until `r1_barrier` alerts.
    ///
    /// `r1_barrier` gates on the grouping stage only (R1 does not need
    /// matching results to run). `me_barrier` gates on every matching
    /// engine shard's sequence and is consulted only between the R1 and
    /// R2 passes of the same batch, implementing the "slave cannot run
    /// before ME finishes" half of §4.3.
    ///
    /// Returns the owned [`RiskEngine`] once the barrier alerts, so a
    /// caller that joins this stage's thread can still inspect final
    /// state (e.g. `total_balance_report` in tests).
    pub fn run(
        mut self,
        ring: Arc<RingBuffer<OrderCommand>>,
        r1_barrier: SequenceBarrier,
        me_barrier: SequenceBarrier,
    ) -> RiskEngine {
        let mut next = 0i64;
        loop {
            let available = match r1_barrier.wait_for(next) {
                Ok(a) => a,
                Err(_) => break,
            };
            if available < next {
                continue;
            }

            for seq in next..=available {
                let cmd = ring.get_mut(seq);
                self.engine.pre_process_command(cmd);
            }
            self.r1_sequence.set(available);

            if me_barrier.wait_for(available).is_err() {
                error!("matching engine barrier alerted before R2 step ran");
                break;
            }

            for seq in next..=available {
                let cmd = ring.get(seq);
                self.engine.post_process_command(cmd);
            }
            self.r2_sequence.set(available);

            next = available + 1;
        }
        self.engine
    }
}
