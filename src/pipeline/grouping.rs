//! The grouping processor: the first consumer stage every command passes
//! through, assigning `eventsGroup` and stamping the L2 heartbeat bit
//! (§4.4).
//!
//! Group boundaries exist so a downstream batch-oriented consumer (here,
//! nothing consumes groups as atomic units — the journal and risk stages
//! process sequence-by-sequence) could coalesce work; we still assign and
//! journal them so a replay sees the same group numbering a live run did.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::config::PerformanceConfiguration;
use crate::model::{OrderCommand, OrderCommandType};
use crate::ring::{RingBuffer, Sequence, SequenceBarrier};

/// Bit 0 of `serviceFlags`: "attach an L2 snapshot to this command" (§4.4,
/// §4.6).
const L2_HEARTBEAT_FLAG: i32 = 1;

/// Assigns `eventsGroup`, flags L2 heartbeats on a fixed cadence, and
/// tracks whether grouping is currently enabled (`GROUPING_CONTROL`, §4.4
/// "disabled mode").
///
/// `grouping_enabled` is shared with [`super::results::ResultsHandler`]:
/// when disabled, this stage stops batching (every command gets its own
/// group) and the results stage stops handing back matcher events / L2
/// snapshots, since "grouping disabled" is specified as an outward no-op
/// rather than a change to what risk/matching actually compute
/// (`SPEC_FULL.md` §3).
pub struct GroupingProcessor {
    group_counter: i64,
    msgs_in_group: i64,
    msgs_in_group_limit: i64,
    max_group_duration: Duration,
    group_started_at: Instant,
    l2_publish_interval: Duration,
    last_l2_heartbeat_at: Instant,
    grouping_enabled: Arc<AtomicBool>,
}

impl GroupingProcessor {
    #[must_use]
    pub fn new(cfg: &PerformanceConfiguration, grouping_enabled: Arc<AtomicBool>) -> Self {
        let now = Instant::now();
        Self {
            group_counter: 0,
            msgs_in_group: 0,
            msgs_in_group_limit: cfg.msgs_in_group_limit,
            max_group_duration: Duration::from_nanos(cfg.max_group_duration_ns.max(0) as u64),
            group_started_at: now,
            l2_publish_interval: Duration::from_nanos(cfg.l2_publish_interval_ns.max(0) as u64),
            last_l2_heartbeat_at: now,
            grouping_enabled,
        }
    }

    /// Assign `cmd` to a group, rolling to a new one first if a boundary
    /// trigger fires (§4.4):
    /// - `msgsInGroupLimit` or `maxGroupDurationNs` exceeded,
    /// - the command is `RESET`, `PERSIST_STATE_MATCHING`, or
    ///   `GROUPING_CONTROL`,
    /// - the command is a binary batch's terminating frame (`symbol ==
    ///   -1`),
    /// - grouping is currently disabled (every command is its own group).
    ///
    /// `PERSIST_STATE_RISK` deliberately does not trigger a new group: its
    /// sibling `PERSIST_STATE_MATCHING` already closed the prior one, and
    /// the two must share a group so a replay re-creates both in lockstep.
    pub fn assign(&mut self, cmd: &mut OrderCommand) {
        let now = Instant::now();
        let is_terminal_binary_frame = matches!(
            cmd.command,
            OrderCommandType::BinaryDataCommand | OrderCommandType::BinaryDataQuery
        ) && cmd.symbol == -1;
        let forces_new_group = matches!(
            cmd.command,
            OrderCommandType::Reset | OrderCommandType::PersistStateMatching | OrderCommandType::GroupingControl
        ) || is_terminal_binary_frame;
        let limit_reached = self.msgs_in_group >= self.msgs_in_group_limit
            || now.duration_since(self.group_started_at) >= self.max_group_duration;
        let disabled = !self.grouping_enabled.load(Ordering::Relaxed);

        if forces_new_group || limit_reached || disabled {
            self.group_counter += 1;
            self.msgs_in_group = 0;
            self.group_started_at = now;
        }
        cmd.events_group = self.group_counter;
        self.msgs_in_group += 1;

        if cmd.command == OrderCommandType::GroupingControl {
            self.grouping_enabled.store(cmd.order_id == 1, Ordering::Relaxed);
        }

        if now.duration_since(self.last_l2_heartbeat_at) >= self.l2_publish_interval {
            cmd.service_flags |= L2_HEARTBEAT_FLAG;
            self.last_l2_heartbeat_at = now;
        }
    }
}

/// Runs a [`GroupingProcessor`] as the ring's first consumer stage.
///
/// No explicit event-chain pool recycling is implemented here (§4.4):
/// slots are plain `OrderCommand` values, so the leftover
/// `Box<MatcherTradeEvent>` chain from a slot's previous lap around the
/// ring is simply dropped — by `OrderCommand::clear_transient` below, or
/// automatically when a producer overwrites the whole slot — which is
/// exactly the spec's documented fallback ("when pooling is disabled, the
/// chain is released immediately"). A manual free-list would fight Rust's
/// ownership model for no behavioral difference once RAII already frees
/// the chain at the same point.
pub struct GroupingStage {
    processor: GroupingProcessor,
}

impl GroupingStage {
    #[must_use]
    pub fn new(processor: GroupingProcessor) -> Self {
        Self { processor }
    }

    /// Run until `barrier` alerts, publishing `own_sequence` after each
    /// batch.
    pub fn run(
        mut self,
        ring: Arc<RingBuffer<OrderCommand>>,
        barrier: SequenceBarrier,
        own_sequence: Arc<Sequence>,
    ) -> GroupingProcessor {
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
                let cmd = ring.get_mut(seq);
                cmd.clear_transient();
                self.processor.assign(cmd);
            }
            own_sequence.set(available);
            next = available + 1;
        }
        self.processor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> PerformanceConfiguration {
        let mut cfg = PerformanceConfiguration::default();
        cfg.msgs_in_group_limit = 3;
        cfg.max_group_duration_ns = Duration::from_secs(3600).as_nanos() as i64;
        cfg.l2_publish_interval_ns = Duration::from_secs(3600).as_nanos() as i64;
        cfg
    }

    #[test]
    fn batches_up_to_the_configured_limit() {
        let mut grouping = GroupingProcessor::new(&cfg(), Arc::new(AtomicBool::new(true)));
        let groups: Vec<i64> = (0..7)
            .map(|_| {
                let mut cmd = OrderCommand::new(OrderCommandType::Nop);
                grouping.assign(&mut cmd);
                cmd.events_group
            })
            .collect();
        assert_eq!(groups, vec![1, 1, 1, 2, 2, 2, 3]);
    }

    #[test]
    fn reset_forces_a_new_group_but_persist_state_risk_does_not() {
        let mut grouping = GroupingProcessor::new(&cfg(), Arc::new(AtomicBool::new(true)));
        let mut first = OrderCommand::new(OrderCommandType::Nop);
        grouping.assign(&mut first);
        let mut reset = OrderCommand::new(OrderCommandType::Reset);
        grouping.assign(&mut reset);
        let mut persist_risk = OrderCommand::new(OrderCommandType::PersistStateRisk);
        grouping.assign(&mut persist_risk);
        assert_eq!(first.events_group, 1);
        assert_eq!(reset.events_group, 2);
        assert_eq!(persist_risk.events_group, 2);
    }

    #[test]
    fn disabled_grouping_gives_every_command_its_own_group() {
        let enabled = Arc::new(AtomicBool::new(false));
        let mut grouping = GroupingProcessor::new(&cfg(), enabled);
        let mut a = OrderCommand::new(OrderCommandType::Nop);
        let mut b = OrderCommand::new(OrderCommandType::Nop);
        grouping.assign(&mut a);
        grouping.assign(&mut b);
        assert_ne!(a.events_group, b.events_group);
    }

    #[test]
    fn grouping_control_flips_the_shared_flag() {
        let enabled = Arc::new(AtomicBool::new(true));
        let mut grouping = GroupingProcessor::new(&cfg(), enabled.clone());
        let mut disable = OrderCommand::new(OrderCommandType::GroupingControl);
        disable.order_id = 0;
        grouping.assign(&mut disable);
        assert!(!enabled.load(Ordering::Relaxed));

        let mut enable = OrderCommand::new(OrderCommandType::GroupingControl);
        enable.order_id = 1;
        grouping.assign(&mut enable);
        assert!(enabled.load(Ordering::Relaxed));
    }
}
