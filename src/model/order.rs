//! [`Order`] — state owned exclusively by a matching engine shard (§3).

use serde::{Deserialize, Serialize};

use super::command::{OrderAction, OrderType};

/// A resting (or in-flight) order.
///
/// Invariant: `filled <= size`, and `filled == size` only transiently while
/// the order is being unlinked from its bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Unique order id (unique engine-wide, not just per symbol).
    pub order_id: i64,
    /// Owning user id.
    pub uid: i64,
    /// ASK or BID.
    pub action: OrderAction,
    /// Resting limit price.
    pub price: i64,
    /// BID risk ceiling carried from placement, consulted on `MOVE_ORDER`.
    pub reserve_bid_price: i64,
    /// Original total size.
    pub size: i64,
    /// Cumulative filled size.
    pub filled: i64,
    /// Order type at placement (GTC orders are the only ones that can
    /// still be resting, but the field is kept for diagnostics/snapshots).
    pub order_type: OrderType,
    /// Timestamp at placement, nanoseconds.
    pub timestamp: i64,
}

impl Order {
    /// Size not yet matched.
    #[must_use]
    pub fn remaining(&self) -> i64 {
        self.size - self.filled
    }

    /// `true` once `filled == size`.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.filled >= self.size
    }
}
