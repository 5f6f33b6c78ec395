//! [`SymbolPositionRecord`] — per-user, per-symbol futures position
//! netting state (§3).

use serde::{Deserialize, Serialize};

use crate::model::OrderAction;

/// Which way a futures position currently leans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionDirection {
    Empty,
    Long,
    Short,
}

impl PositionDirection {
    #[must_use]
    fn of(action: OrderAction) -> Self {
        match action {
            OrderAction::Bid => PositionDirection::Long,
            OrderAction::Ask => PositionDirection::Short,
        }
    }

}

/// One user's open futures position in one symbol (§3 "SymbolPositionRecord").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolPositionRecord {
    pub symbol_id: i32,
    pub direction: PositionDirection,
    /// Total open size on `direction`'s side.
    pub open_volume: i64,
    /// Sum of `price * size` for every still-open lot, used to derive the
    /// weighted-average open price (`open_price_sum / open_volume`).
    pub open_price_sum: i64,
    /// Reserved size for resting SELL orders not yet matched (margin hold).
    pub pending_sell_size: i64,
    /// Reserved size for resting BUY orders not yet matched (margin hold).
    pub pending_buy_size: i64,
    pub quote_currency: i32,
}

impl SymbolPositionRecord {
    #[must_use]
    pub fn new(symbol_id: i32, quote_currency: i32) -> Self {
        Self {
            symbol_id,
            direction: PositionDirection::Empty,
            open_volume: 0,
            open_price_sum: 0,
            pending_sell_size: 0,
            pending_buy_size: 0,
            quote_currency,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.direction == PositionDirection::Empty && self.open_volume == 0
    }

    /// Weighted-average open price, or `0` if flat.
    #[must_use]
    pub fn avg_open_price(&self) -> i64 {
        if self.open_volume == 0 {
            0
        } else {
            self.open_price_sum / self.open_volume
        }
    }

    /// Net a `size`-lot fill at `price` on `action`'s side into this
    /// position (§3 "position netting semantics"): offsetting reduces
    /// volume toward zero (closing at the weighted-average open price),
    /// same-side extends and updates `open_price_sum`. Returns the portion
    /// of `size` that *opened* new exposure (as opposed to closing
    /// existing exposure) — used by the caller to prorate fees.
    pub fn update_position_for_margin_trade(
        &mut self,
        action: OrderAction,
        size: i64,
        price: i64,
    ) -> i64 {
        let trade_direction = PositionDirection::of(action);
        if self.direction == PositionDirection::Empty || self.open_volume == 0 {
            self.direction = trade_direction;
            self.open_volume = size;
            self.open_price_sum = price * size;
            return size;
        }

        if self.direction == trade_direction {
            self.open_volume += size;
            self.open_price_sum += price * size;
            return size;
        }

        // Opposite side: close existing exposure first.
        let closing = size.min(self.open_volume);
        let avg = self.avg_open_price();
        self.open_volume -= closing;
        self.open_price_sum -= avg * closing;

        let opened = size - closing;
        if self.open_volume == 0 {
            if opened > 0 {
                self.direction = trade_direction;
                self.open_volume = opened;
                self.open_price_sum = price * opened;
            } else {
                self.direction = PositionDirection::Empty;
                self.open_price_sum = 0;
            }
        }
        opened
    }

    pub fn reserve_pending(&mut self, action: OrderAction, size: i64) {
        match action {
            OrderAction::Bid => self.pending_buy_size += size,
            OrderAction::Ask => self.pending_sell_size += size,
        }
    }

    pub fn release_pending(&mut self, action: OrderAction, size: i64) {
        match action {
            OrderAction::Bid => self.pending_buy_size = (self.pending_buy_size - size).max(0),
            OrderAction::Ask => self.pending_sell_size = (self.pending_sell_size - size).max(0),
        }
    }
}
