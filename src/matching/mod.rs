//! Matching engines: the common contract, two implementations, and the
//! per-shard router that owns one order book per symbol (§4.3, §4.5, §4.6,
//! §4.9).

mod direct;
mod engine_trait;
mod naive;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::binary::{BinaryCommand, BinaryCommandsProcessor};
use crate::model::{CommandResultCode, L2MarketData, OrderCommand, OrderCommandType};
use crate::ring::{RingBuffer, Sequence, SequenceBarrier};

pub use direct::DirectOrderBook;
pub use engine_trait::MatchingEngine;
pub use naive::NaiveOrderBook;

/// Which concrete book a newly created symbol uses. Both implementations
/// must agree on every observable outcome (§9: "naive impl is a
/// conformance oracle").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchingEngineKind {
    /// Price-level map of FIFO queues; reference semantics, not a
    /// production target.
    Naive,
    /// Adaptive-radix-tree-backed book; the hot path.
    Direct,
}

/// Tagged-variant dispatch over the two book implementations (§9 "Deep
/// inheritance / polymorphism").
pub enum OrderBookImpl {
    Naive(NaiveOrderBook),
    Direct(DirectOrderBook),
}

impl OrderBookImpl {
    #[must_use]
    pub fn new(kind: MatchingEngineKind, symbol: i32) -> Self {
        match kind {
            MatchingEngineKind::Naive => OrderBookImpl::Naive(NaiveOrderBook::new(symbol)),
            MatchingEngineKind::Direct => OrderBookImpl::Direct(DirectOrderBook::new(symbol)),
        }
    }
}

impl MatchingEngine for OrderBookImpl {
    fn process_order_command(&mut self, cmd: &mut OrderCommand) {
        match self {
            OrderBookImpl::Naive(b) => b.process_order_command(cmd),
            OrderBookImpl::Direct(b) => b.process_order_command(cmd),
        }
    }

    fn get_l2_market_data_snapshot(&self, depth: usize) -> L2MarketData {
        match self {
            OrderBookImpl::Naive(b) => b.get_l2_market_data_snapshot(depth),
            OrderBookImpl::Direct(b) => b.get_l2_market_data_snapshot(depth),
        }
    }

    fn state_hash(&self) -> u64 {
        match self {
            OrderBookImpl::Naive(b) => b.state_hash(),
            OrderBookImpl::Direct(b) => b.state_hash(),
        }
    }

    fn clear(&mut self) {
        match self {
            OrderBookImpl::Naive(b) => b.clear(),
            OrderBookImpl::Direct(b) => b.clear(),
        }
    }
}

/// One matching-engine shard: owns every symbol whose id hashes to this
/// shard (§4.3, §5 "Order books: owned by one matching engine shard").
pub struct MatchingEngineShard {
    shard_id: u32,
    shard_mask: u32,
    kind: MatchingEngineKind,
    books: HashMap<i32, OrderBookImpl>,
    binary: BinaryCommandsProcessor,
}

impl MatchingEngineShard {
    #[must_use]
    pub fn new(shard_id: u32, shard_mask: u32, kind: MatchingEngineKind) -> Self {
        Self {
            shard_id,
            shard_mask,
            kind,
            books: HashMap::new(),
            binary: BinaryCommandsProcessor::new(),
        }
    }

    /// `true` if `symbol` belongs to this shard under the configured mask.
    #[must_use]
    pub fn owns_symbol(&self, symbol: i32) -> bool {
        self.shard_mask == 0 || (symbol as u32 & self.shard_mask) == self.shard_id
    }

    /// Register a new symbol's order book on this shard. A no-op if the
    /// symbol is not owned by this shard.
    pub fn add_symbol(&mut self, symbol: i32) {
        if self.owns_symbol(symbol) {
            self.books
                .entry(symbol)
                .or_insert_with(|| OrderBookImpl::new(self.kind, symbol));
        }
    }

    /// Process one command. Ignores commands for symbols not owned by this
    /// shard, and non-order-book command types (control/lifecycle commands
    /// are handled by the pipeline core directly, see §4.9).
    pub fn process(&mut self, cmd: &mut OrderCommand) {
        if matches!(
            cmd.command,
            OrderCommandType::BinaryDataCommand | OrderCommandType::BinaryDataQuery
        ) {
            self.process_binary_frame(cmd);
            return;
        }
        if cmd.command == OrderCommandType::Reset {
            self.clear_all();
            self.binary.clear();
            return;
        }
        if !matches!(
            cmd.command,
            OrderCommandType::PlaceOrder
                | OrderCommandType::CancelOrder
                | OrderCommandType::MoveOrder
                | OrderCommandType::ReduceOrder
                | OrderCommandType::OrderBookRequest
        ) {
            return;
        }
        if !self.owns_symbol(cmd.symbol) {
            return;
        }
        if cmd.command == OrderCommandType::PlaceOrder
            && cmd.result_code != CommandResultCode::ValidForMatchingEngine
        {
            // Risk already rejected this order (NSF, invalid symbol, ...);
            // nothing to match.
            return;
        }
        match self.books.get_mut(&cmd.symbol) {
            Some(book) => book.process_order_command(cmd),
            None => cmd.result_code = CommandResultCode::MatchingInvalidOrderBookId,
        }
    }

    /// Assemble one `BINARY_DATA_COMMAND`/`BINARY_DATA_QUERY` frame,
    /// registering any newly installed symbols' order books on the
    /// terminal frame (§4.8: "one per risk shard, one per matching
    /// shard").
    fn process_binary_frame(&mut self, cmd: &mut OrderCommand) {
        match self.binary.accept_frame(cmd) {
            Ok(Some(BinaryCommand::AddSymbols(specs))) => {
                for spec in specs {
                    self.add_symbol(spec.symbol_id);
                }
            }
            Ok(Some(BinaryCommand::AddAccounts(_))) => {
                // Accounts concern risk shards only; nothing for matching
                // to do here.
            }
            Ok(None) => {}
            Err(err) => {
                warn!(error = %err, "binary frame assembly failed on matching shard");
            }
        }
    }

    /// An L2 snapshot for `symbol`, or `None` if this shard doesn't own it.
    #[must_use]
    pub fn l2_snapshot(&self, symbol: i32, depth: usize) -> Option<L2MarketData> {
        self.books
            .get(&symbol)
            .map(|b| b.get_l2_market_data_snapshot(depth))
    }

    /// Combined state hash across every book on this shard, folded in
    /// symbol order for determinism (§8).
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        use std::hash::{Hash, Hasher};
        let mut symbols: Vec<&i32> = self.books.keys().collect();
        symbols.sort_unstable();
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        for symbol in symbols {
            symbol.hash(&mut hasher);
            self.books[symbol].state_hash().hash(&mut hasher);
        }
        hasher.finish()
    }

    /// Drop every book's state, used by `RESET` (§4.9).
    pub fn clear_all(&mut self) {
        for book in self.books.values_mut() {
            book.clear();
        }
    }

    /// Run this shard as a ring consumer until `barrier` alerts,
    /// publishing `own_sequence` after each batch (§5 "one thread per
    /// processor"). `barrier` must gate on every risk shard's R1
    /// sequence (§4.3: "both complete before any ME sees s").
    pub fn run(
        mut self,
        ring: Arc<RingBuffer<OrderCommand>>,
        barrier: SequenceBarrier,
        own_sequence: Arc<Sequence>,
    ) -> Self {
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
                self.process(cmd);
            }
            own_sequence.set(available);
            next = available + 1;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{OrderAction, OrderType};

    #[test]
    fn shard_routes_only_owned_symbols() {
        let mut shard = MatchingEngineShard::new(1, 0b1, MatchingEngineKind::Direct);
        shard.add_symbol(1);
        shard.add_symbol(2);
        assert!(shard.owns_symbol(1));
        assert!(!shard.owns_symbol(2));

        let mut cmd = OrderCommand::new(OrderCommandType::PlaceOrder);
        cmd.order_id = 1;
        cmd.uid = 10;
        cmd.symbol = 2;
        cmd.action = OrderAction::Bid;
        cmd.order_type = OrderType::Gtc;
        cmd.price = 100;
        cmd.size = 10;
        shard.process(&mut cmd);
        assert_eq!(cmd.result_code, CommandResultCode::New, "not this shard's symbol");
    }

    #[test]
    fn unknown_symbol_on_owned_shard_is_invalid_order_book() {
        let mut shard = MatchingEngineShard::new(0, 0, MatchingEngineKind::Naive);
        let mut cmd = OrderCommand::new(OrderCommandType::PlaceOrder);
        cmd.symbol = 99;
        cmd.order_id = 1;
        cmd.action = OrderAction::Bid;
        cmd.order_type = OrderType::Gtc;
        cmd.price = 100;
        cmd.size = 10;
        shard.process(&mut cmd);
        assert_eq!(cmd.result_code, CommandResultCode::MatchingInvalidOrderBookId);
    }
}
