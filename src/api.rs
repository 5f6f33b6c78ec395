//! `ExchangeCore`: the thin synchronous facade that wires every pipeline
//! stage onto one ring buffer and spawns a thread per stage (§2, §5, §7).
//!
//! This is deliberately minimal — it exists so the graph described in
//! `SPEC_FULL.md` is actually constructible and exercisable end-to-end from
//! a test or the included demo, the same role the teacher's
//! `orderbook::manager::BookManager` plays for a single book. Submission
//! wrappers for individual command types (`place_order`, `cancel_order`,
//! ...) are out of scope, same as the spec's own API surface: callers build
//! an `OrderCommand` directly.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::config::ExchangeConfiguration;
use crate::error::ExchangeCoreError;
use crate::matching::{MatchingEngineKind, MatchingEngineShard};
use crate::model::{OrderCommand, OrderCommandType};
use crate::pipeline::{CommandOutcome, GroupingProcessor, GroupingStage, ResultsHandler, TwoStepRiskProcessor};
use crate::ring::{AlertFlag, AnyWaitStrategy, RingBuffer, Sequence};
use crate::risk::RiskEngine;

#[cfg(feature = "journal")]
use crate::pipeline::JournalStage;

/// A pending command's eventual outcome, delivered by the results handler.
///
/// `wait()` blocks the calling thread; there is no async variant (§9 "no
/// async runtime").
pub struct CommandFuture {
    rx: Receiver<CommandOutcome>,
}

impl CommandFuture {
    /// Block until the results handler reports this command's outcome.
    ///
    /// Returns `None` if the exchange was shut down before the command
    /// reached the results handler.
    #[must_use]
    pub fn wait(self) -> Option<CommandOutcome> {
        self.rx.recv().ok()
    }
}

/// A running exchange: one ring buffer, a grouping stage, an optional
/// journaling stage, `risk_engines_num` two-step risk processors,
/// `matching_engines_num` matching shards, and one results handler, each on
/// its own thread (§4.3, §5).
pub struct ExchangeCore {
    ring: Arc<RingBuffer<OrderCommand>>,
    wait_strategy: Arc<AnyWaitStrategy>,
    alert: Arc<AlertFlag>,
    pending: Arc<DashMap<i64, Sender<CommandOutcome>>>,
    results_sequence: Arc<Sequence>,
    handles: Vec<JoinHandle<()>>,
}

impl ExchangeCore {
    /// Build and start every stage. `matching_kind` selects the book
    /// implementation every matching shard uses for newly installed
    /// symbols (§9 "naive impl is a conformance oracle" — production
    /// callers want [`MatchingEngineKind::Direct`]).
    pub fn start(cfg: ExchangeConfiguration, matching_kind: MatchingEngineKind) -> Result<Self, ExchangeCoreError> {
        cfg.validate()?;

        let ring = Arc::new(RingBuffer::new(cfg.performance.ring_buffer_size, || {
            OrderCommand::new(OrderCommandType::Nop)
        })?);
        let wait_strategy = Arc::new(cfg.performance.wait_strategy.build());
        let alert = Arc::new(AlertFlag::new());
        let pending: Arc<DashMap<i64, Sender<CommandOutcome>>> = Arc::new(DashMap::new());

        let mut handles = Vec::new();

        // --- Grouping: the ring's first consumer stage. ---------------
        let grouping_sequence = Arc::new(Sequence::initial());
        let grouping_enabled = Arc::new(std::sync::atomic::AtomicBool::new(true));
        let grouping_barrier = ring.new_barrier(vec![], wait_strategy.clone(), alert.clone());
        let grouping = GroupingStage::new(GroupingProcessor::new(&cfg.performance, grouping_enabled));
        {
            let ring = ring.clone();
            let own_sequence = grouping_sequence.clone();
            handles.push(std::thread::spawn(move || {
                grouping.run(ring, grouping_barrier, own_sequence);
            }));
        }

        // --- Journaling: a sibling stage chained after grouping. -------
        #[cfg(feature = "journal")]
        let journal_sequence = if cfg.journal.enabled {
            let snapshot_id = epoch_seconds();
            let stage = JournalStage::new(cfg.journal.clone(), snapshot_id)?;
            let own_sequence = Arc::new(Sequence::initial());
            let barrier = ring.new_barrier(vec![grouping_sequence.clone()], wait_strategy.clone(), alert.clone());
            let ring = ring.clone();
            let seq = own_sequence.clone();
            handles.push(std::thread::spawn(move || {
                stage.run(ring, barrier, seq);
            }));
            Some(own_sequence)
        } else {
            None
        };
        #[cfg(not(feature = "journal"))]
        let journal_sequence: Option<Arc<Sequence>> = None;

        // --- Risk shards: allocate their sequences up front so matching
        // shards (which gate on R1) and the R2 barriers (which gate on
        // matching) can both be built before any thread runs. -----------
        let risk_shard_mask = cfg.performance.risk_shard_mask();
        let risk_processors: Vec<TwoStepRiskProcessor> = (0..cfg.performance.risk_engines_num)
            .map(|shard_id| {
                let engine = RiskEngine::new(
                    shard_id,
                    risk_shard_mask,
                    cfg.orders_processing.margin_trading_mode,
                    cfg.orders_processing.risk_processing_mode,
                );
                TwoStepRiskProcessor::new(engine)
            })
            .collect();
        let r1_sequences: Vec<Arc<Sequence>> = risk_processors.iter().map(TwoStepRiskProcessor::r1_sequence).collect();

        // --- Matching shards: gate on every risk shard's R1 sequence. --
        let matching_shard_mask = cfg.performance.matching_shard_mask();
        let matching_sequences: Vec<Arc<Sequence>> = (0..cfg.performance.matching_engines_num)
            .map(|_| Arc::new(Sequence::initial()))
            .collect();
        for (shard_id, own_sequence) in matching_sequences.iter().enumerate() {
            let shard = MatchingEngineShard::new(shard_id as u32, matching_shard_mask, matching_kind);
            let barrier = ring.new_barrier(r1_sequences.clone(), wait_strategy.clone(), alert.clone());
            let ring = ring.clone();
            let own_sequence = own_sequence.clone();
            handles.push(std::thread::spawn(move || {
                shard.run(ring, barrier, own_sequence);
            }));
        }

        // --- Spawn the risk shards now that the matching sequences they
        // gate R2 on exist. ---------------------------------------------
        let r2_sequences: Vec<Arc<Sequence>> = risk_processors.iter().map(TwoStepRiskProcessor::r2_sequence).collect();
        for processor in risk_processors {
            let r1_barrier =
                ring.new_barrier(vec![grouping_sequence.clone()], wait_strategy.clone(), alert.clone());
            let me_barrier = ring.new_barrier(matching_sequences.clone(), wait_strategy.clone(), alert.clone());
            let ring = ring.clone();
            handles.push(std::thread::spawn(move || {
                processor.run(ring, r1_barrier, me_barrier);
            }));
        }

        // --- Results handler: the tail of the graph. -------------------
        let results_sequence = Arc::new(Sequence::initial());
        let mut results_deps = r2_sequences;
        if let Some(seq) = journal_sequence.clone() {
            results_deps.push(seq);
        }
        let results_barrier = ring.new_barrier(results_deps, wait_strategy.clone(), alert.clone());
        {
            let pending = pending.clone();
            let handler = ResultsHandler::new(move |outcome: CommandOutcome| {
                if let Some((_, tx)) = pending.remove(&outcome.sequence) {
                    let _ = tx.send(outcome);
                }
            });
            let ring = ring.clone();
            let own_sequence = results_sequence.clone();
            handles.push(std::thread::spawn(move || {
                handler.run(ring, results_barrier, own_sequence);
            }));
        }

        // The results handler is the slowest possible consumer on every
        // path (it depends, transitively, on every other stage), so it is
        // the only sequence producers need to respect for backpressure.
        ring.add_gating_sequence(results_sequence.clone());

        Ok(Self {
            ring,
            wait_strategy,
            alert,
            pending,
            results_sequence,
            handles,
        })
    }

    /// Claim the next ring slot, reset it to a fresh command, let `build`
    /// populate it, and publish. Returns a future resolving to the
    /// command's terminal outcome once the results handler reaches it.
    pub fn submit(&self, build: impl FnOnce(&mut OrderCommand)) -> CommandFuture {
        let seq = self.ring.next_one();
        {
            let cmd = self.ring.get_mut(seq);
            *cmd = OrderCommand::new(OrderCommandType::Nop);
            build(cmd);
        }
        let (tx, rx) = channel();
        self.pending.insert(seq, tx);
        self.ring.publish(seq, seq, &self.wait_strategy);
        CommandFuture { rx }
    }

    /// Publish `SHUTDOWN_SIGNAL`, wait for every stage to drain up to it
    /// (or `timeout` to elapse), then halt every barrier and join all
    /// stage threads (§4.3 "cancellation").
    pub fn shutdown(mut self, timeout: Duration) -> Result<(), ExchangeCoreError> {
        let seq = self.ring.next_one();
        {
            let cmd = self.ring.get_mut(seq);
            *cmd = OrderCommand::new(OrderCommandType::ShutdownSignal);
        }
        self.ring.publish(seq, seq, &self.wait_strategy);

        let deadline = Instant::now() + timeout;
        while self.results_sequence.get() < seq {
            if Instant::now() >= deadline {
                self.alert.raise();
                self.wait_strategy.signal_all();
                for handle in self.handles.drain(..) {
                    let _ = handle.join();
                }
                return Err(ExchangeCoreError::ShutdownTimeout(timeout));
            }
            std::thread::yield_now();
        }

        self.alert.raise();
        self.wait_strategy.signal_all();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
        Ok(())
    }
}

impl Drop for ExchangeCore {
    /// If a caller drops `ExchangeCore` without calling `shutdown`, halt
    /// every stage rather than leaking busy-spinning threads.
    fn drop(&mut self) {
        if !self.handles.is_empty() {
            self.alert.raise();
            self.wait_strategy.signal_all();
            for handle in self.handles.drain(..) {
                let _ = handle.join();
            }
        }
    }
}

fn epoch_seconds() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
