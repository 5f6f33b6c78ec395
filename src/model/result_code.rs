//! Result codes attached to every processed [`super::command::OrderCommand`].
//!
//! Numeric codes are not part of the public contract of this crate (unlike
//! the command type tags in [`super::command::OrderCommandType`], which must
//! be journal-stable) but the discriminants are still fixed to make journal
//! fixtures reproducible across versions.

use serde::{Deserialize, Serialize};

/// Outcome of processing a single [`super::command::OrderCommand`].
///
/// Every sequence resolves to exactly one of these (§8: "results handler
/// fires exactly once with `cmd.resultCode` in the declared enum").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum CommandResultCode {
    /// Freshly claimed slot, not yet processed by any stage.
    New = 0,
    /// Terminal success for non-matching commands (user lifecycle, control).
    Success = 1,
    /// Pre-risk accepted the command; matching engine should process it.
    ValidForMatchingEngine = 2,

    /// `uid` does not correspond to a known user profile.
    AuthInvalidUser = -1,
    /// `symbol` does not correspond to a known symbol specification.
    InvalidSymbol = -2,
    /// The symbol's type does not support the requested operation.
    UnsupportedSymbolType = -3,

    /// Risk check failed: insufficient funds / margin.
    RiskNsf = -100,
    /// BID `reserveBidPrice` was invalid for the order's type.
    RiskInvalidReserveBidPrice = -101,
    /// ASK limit price times quote scale was lower than the taker fee.
    RiskAskPriceLowerThanFee = -102,
    /// Futures order placed while margin trading is disabled.
    RiskMarginTradingDisabled = -103,

    /// `PLACE_ORDER` reused an `orderId` already present in the book.
    MatchingDuplicateOrderId = -200,
    /// `CANCEL_ORDER`/`MOVE_ORDER`/`REDUCE_ORDER` referenced an unknown or
    /// not-owned order id.
    MatchingUnknownOrderId = -201,
    /// The addressed symbol has no order book on this matching shard.
    MatchingInvalidOrderBookId = -202,
    /// `REDUCE_ORDER` was submitted with `size <= 0`.
    MatchingReduceFailedWrongSize = -203,
    /// `MOVE_ORDER` would have raised a BID's price past its
    /// `reserveBidPrice`.
    MatchingMoveFailedPriceOverRiskLimit = -204,
}

impl CommandResultCode {
    /// True for any of the `RISK_*` / `MATCHING_*` / `AUTH_*` / `*_SYMBOL`
    /// failure variants.
    #[must_use]
    pub fn is_failure(self) -> bool {
        (self as i32) < 0
    }
}
