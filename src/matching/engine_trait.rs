//! The common matching-engine contract (§4.5, §9 "Deep inheritance /
//! polymorphism").
//!
//! Two implementations exist — [`super::naive::NaiveOrderBook`] (a
//! conformance oracle) and [`super::direct::DirectOrderBook`] (the
//! production, ART-backed matcher). Both are driven through this trait and
//! dispatched via a small tagged-variant enum rather than dynamic dispatch,
//! matching the hot-path-friendly encoding spec §9 recommends.

use crate::model::{L2MarketData, OrderCommand};

/// Shared contract for a single symbol's order book.
pub trait MatchingEngine {
    /// Process one command against this book: matches, inserts, cancels,
    /// moves, or reduces as dictated by `cmd.command`, setting
    /// `cmd.result_code` and appending to `cmd.matcher_event`.
    fn process_order_command(&mut self, cmd: &mut OrderCommand);

    /// Build an L2 snapshot of up to `depth` levels per side, best price
    /// first.
    fn get_l2_market_data_snapshot(&self, depth: usize) -> L2MarketData;

    /// A deterministic fingerprint of this book's visible state (price
    /// levels, sizes, and resting order ids in priority order), used to
    /// build the exchange-wide state hash (§8).
    fn state_hash(&self) -> u64;

    /// Drop all resting orders and indices, returning the book to its
    /// just-created state (used by `RESET`).
    fn clear(&mut self);
}
