//! The results handler: the pipeline's final consumer, firing once per
//! sequence with the command's terminal outcome (§2 "Results handler +
//! API futures plumbing", §7 "Users are informed via the per-command
//! future delivered by the results handler").

use std::sync::Arc;

use crate::model::{CommandResultCode, MatcherTradeEvent, OrderCommand};
use crate::ring::{RingBuffer, Sequence, SequenceBarrier};

/// What the results handler hands back for one sequence: the terminal
/// result code plus the matcher event chain produced for it, if any
/// (§8 "results handler fires exactly once with cmd.resultCode in the
/// declared enum").
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub sequence: i64,
    pub result_code: CommandResultCode,
    pub matcher_event: Option<Box<MatcherTradeEvent>>,
}

/// Invoked once per sequence, strictly in order. `&mut self` rather than
/// `Fn` so a consumer can accumulate state (pending futures, a test's
/// captured outcomes) without interior mutability.
pub trait ResultsConsumer: Send {
    fn accept(&mut self, outcome: CommandOutcome);
}

impl<F: FnMut(CommandOutcome) + Send> ResultsConsumer for F {
    fn accept(&mut self, outcome: CommandOutcome) {
        self(outcome)
    }
}

/// Drives a [`ResultsConsumer`] off the post-R2 (and, when journaling is
/// enabled, post-journal) stream.
pub struct ResultsHandler<C: ResultsConsumer> {
    consumer: C,
}

impl<C: ResultsConsumer> ResultsHandler<C> {
    #[must_use]
    pub fn new(consumer: C) -> Self {
        Self { consumer }
    }

    /// Run until `barrier` alerts, publishing `own_sequence` after each
    /// batch so producers can use it as the ring's final backpressure
    /// gate.
    pub fn run(
        mut self,
        ring: Arc<RingBuffer<OrderCommand>>,
        barrier: SequenceBarrier,
        own_sequence: Arc<Sequence>,
    ) -> C {
        let mut next = 0i64;
        loop {
            let available = match barrier.wait_for(next) {
                Ok(a) => a,
                Err(_) => break,
            };
            if available < next {
                continue;
            }
            for seq in next..=available {
                let cmd = ring.get(seq);
                self.consumer.accept(CommandOutcome {
                    sequence: seq,
                    result_code: cmd.result_code,
                    matcher_event: cmd.matcher_event.clone(),
                });
            }
            own_sequence.set(available);
            next = available + 1;
        }
        self.consumer
    }
}
