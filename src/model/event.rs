//! [`MatcherTradeEvent`] — the intrusive singly-linked chain attached to a
//! command by the matching engine (§3).

use serde::{Deserialize, Serialize};

use super::command::OrderAction;

/// One matcher event. Chains are built tail-to-head by the matching engine
/// in execution order (best price first, FIFO within price, §4.5
/// "Ordering and determinism") and walked head-to-tail by R2 / the results
/// handler / the grouping recycler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherTradeEvent {
    /// The specific event payload.
    pub kind: MatcherEventKind,
    /// Next event in the chain, or `None` at the tail.
    pub next_event: Option<Box<MatcherTradeEvent>>,
}

impl MatcherTradeEvent {
    /// Wrap a kind with no successor.
    #[must_use]
    pub fn leaf(kind: MatcherEventKind) -> Box<Self> {
        Box::new(Self {
            kind,
            next_event: None,
        })
    }

    /// Append `next` after the last event currently in the chain rooted at
    /// `head` (or make `next` the new head if `head` is empty), returning
    /// the (possibly new) head.
    #[must_use]
    pub fn push_back(
        mut head: Option<Box<MatcherTradeEvent>>,
        next: Box<MatcherTradeEvent>,
    ) -> Option<Box<MatcherTradeEvent>> {
        match head {
            None => Some(next),
            Some(ref mut h) => {
                let mut cur = h.as_mut();
                while cur.next_event.is_some() {
                    cur = cur.next_event.as_mut().unwrap();
                }
                cur.next_event = Some(next);
                head
            }
        }
    }

    /// Number of events in the chain rooted at `self`, inclusive.
    #[must_use]
    pub fn chain_len(&self) -> usize {
        let mut n = 1;
        let mut cur = &self.next_event;
        while let Some(ev) = cur {
            n += 1;
            cur = &ev.next_event;
        }
        n
    }
}

/// Event payload variants (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MatcherEventKind {
    /// A single maker/taker match.
    Trade {
        /// The resting order's id.
        maker_order_id: i64,
        /// The resting order's owner.
        maker_uid: i64,
        /// Execution price — always the maker's resting price (price-time
        /// priority: makers always get their own price).
        price: i64,
        /// Size exchanged in this interaction.
        size: i64,
        /// Taker's `reserveBidPrice` at submission time, used by R2 to
        /// size refunds on a BID taker.
        bidder_hold_price: i64,
        /// True if this trade fully consumed the taker (active) order.
        taker_completed: bool,
        /// True if this trade fully consumed the maker order.
        maker_completed: bool,
    },
    /// The active order (or its unmatched residual) was rejected.
    Reject {
        /// Size rejected.
        size: i64,
        /// Price at rejection time (limit price, or budget price for
        /// FOK_BUDGET).
        price: i64,
        /// Taker's `reserveBidPrice`, used to size the refund.
        bidder_hold_price: i64,
    },
    /// A resting order's remaining size was reduced (by `REDUCE_ORDER`,
    /// `CANCEL_ORDER`, or a partial `MOVE_ORDER`/match).
    Reduce {
        /// Size removed from the order.
        size: i64,
        /// Price at the time of reduction.
        price: i64,
    },
    /// Carries a serialized report-query response fragment; never
    /// inspected by R2's settlement logic (§4.7 "skip events processing
    /// ... or contains BINARY_EVENT").
    Binary {
        /// Opaque serialized fragment.
        payload: Vec<u8>,
    },
}

impl MatcherEventKind {
    /// `true` for [`MatcherEventKind::Reject`] — per §8, `activeOrderCompleted`
    /// is always true for REJECT.
    #[must_use]
    pub fn active_order_completed(&self) -> bool {
        matches!(self, MatcherEventKind::Reject { .. })
    }
}

/// Direction implied for settlement bookkeeping: which side of `action` a
/// [`MatcherEventKind::Trade`]'s maker stood on.
#[must_use]
pub fn maker_action(taker_action: OrderAction) -> OrderAction {
    taker_action.opposite()
}
