//! The [`OrderCommand`] event and its tag/enum types (§3, §6).

use serde::{Deserialize, Serialize};

use super::event::MatcherTradeEvent;
use super::l2::L2MarketData;
use super::result_code::CommandResultCode;

/// Tagged kind of an [`OrderCommand`]. Discriminants are journal-stable —
/// never renumber a variant, only append (§6: "numeric codes must be
/// preserved for journal compatibility").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i8)]
pub enum OrderCommandType {
    /// Place a new order (GTC / IOC / FOK_BUDGET).
    PlaceOrder = 1,
    /// Move a resting order to a new price.
    MoveOrder = 2,
    /// Cancel a resting order outright.
    CancelOrder = 3,
    /// Reduce a resting order's remaining size.
    ReduceOrder = 4,
    /// Request an L2 snapshot of up to `size` levels.
    OrderBookRequest = 6,

    /// Create a user profile.
    AddUser = 10,
    /// Suspend a user profile (blocks further trading for that uid).
    SuspendUser = 11,
    /// Resume a previously suspended user profile.
    ResumeUser = 12,
    /// Apply a signed balance delta (deposit, withdrawal, funding fee).
    BalanceAdjustment = 13,

    /// One frame of a multi-frame binary batch command.
    BinaryDataCommand = 80,
    /// One frame of a multi-frame binary batch query.
    BinaryDataQuery = 81,

    /// Clear all engine state (used in tests and before full replay).
    Reset = 90,
    /// No-op, used to pad groups / measure latency.
    Nop = 91,

    /// Request the matching engines to persist a state snapshot.
    PersistStateMatching = 92,
    /// Request the risk engines to persist a state snapshot; does not
    /// switch the current `eventsGroup` (§4.4).
    PersistStateRisk = 93,
    /// Enable/disable the grouping stage's batching (`orderId == 1` means
    /// enabled).
    GroupingControl = 94,
    /// Fabric-internal: initiates drain and shutdown of every stage.
    ShutdownSignal = 95,
    /// Sentinel journal record type: the following bytes are an LZ4-
    /// compressed nested record stream (§4.9). Never appears as a live
    /// ring buffer command.
    ReservedCompressed = 99,
}

/// Side of an order or trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderAction {
    /// Resting/incoming sell.
    Ask,
    /// Resting/incoming buy.
    Bid,
}

impl OrderAction {
    /// The other side.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            OrderAction::Ask => OrderAction::Bid,
            OrderAction::Bid => OrderAction::Ask,
        }
    }
}

/// Time-in-force / fill semantics for `PLACE_ORDER` (§1, §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    /// Good-till-cancel: unmatched residual rests in the book.
    Gtc,
    /// Immediate-or-cancel: unmatched residual is rejected.
    Ioc,
    /// Fill-or-kill with a spend/receipt budget rather than just a limit
    /// price (§4.5 "FOK_BUDGET semantics").
    FokBudget,
}

/// A fixed-shape command slot stored in the ring buffer (§3).
///
/// Slots are reused in place across the ring; every mutating stage must
/// leave fields it does not own untouched, and the grouping stage clears
/// `matcherEvent`/`marketData` at group boundaries so stale pointers never
/// leak into the next occupant of a slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCommand {
    /// Tagged command kind.
    pub command: OrderCommandType,
    /// Order identifier (command-specific meaning for non-order commands).
    pub order_id: i64,
    /// Symbol id this command addresses (`-1` marks a binary batch's
    /// terminating frame).
    pub symbol: i32,
    /// Originating user id.
    pub uid: i64,
    /// ASK or BID.
    pub action: OrderAction,
    /// GTC / IOC / FOK_BUDGET. For `BALANCE_ADJUSTMENT` this field instead
    /// carries the encoded [`super::risk::BalanceAdjustmentType`].
    pub order_type: OrderType,
    /// Limit price (minor units).
    pub price: i64,
    /// BID risk ceiling: max price a later `MOVE_ORDER` may reach, and the
    /// price used to size the taker-fee hold.
    pub reserve_bid_price: i64,
    /// Order size (lots).
    pub size: i64,
    /// Submission timestamp, nanoseconds.
    pub timestamp: i64,
    /// Opaque client correlation id; repurposed as `transferId` for binary
    /// batch frames.
    pub user_cookie: i64,
    /// Bit 0 requests an L2 snapshot be attached by the matching engine.
    pub service_flags: i32,
    /// Group assigned by the grouping stage (§4.4).
    pub events_group: i64,
    /// Outcome of processing, set by R1/ME/R2.
    pub result_code: CommandResultCode,
    /// Singly-linked chain of matcher events produced by the matching
    /// engine for this command, consumed by R2 and the results handler.
    pub matcher_event: Option<Box<MatcherTradeEvent>>,
    /// Optional L2 snapshot attached when `service_flags & 1 != 0`.
    pub market_data: Option<L2MarketData>,
}

impl OrderCommand {
    /// A freshly claimed, unprocessed slot for `command` — every other
    /// field zeroed/defaulted the way grouping expects to find it.
    #[must_use]
    pub fn new(command: OrderCommandType) -> Self {
        Self {
            command,
            order_id: 0,
            symbol: 0,
            uid: 0,
            action: OrderAction::Ask,
            order_type: OrderType::Gtc,
            price: 0,
            reserve_bid_price: 0,
            size: 0,
            timestamp: 0,
            user_cookie: 0,
            service_flags: 0,
            events_group: 0,
            result_code: CommandResultCode::New,
            matcher_event: None,
            market_data: None,
        }
    }

    /// Clears owned-pointer-like fields, as required at group boundaries
    /// and whenever a slot is about to be reused for a different command
    /// (§3 "Ownership rules").
    pub fn clear_transient(&mut self) {
        self.matcher_event = None;
        self.market_data = None;
    }
}
