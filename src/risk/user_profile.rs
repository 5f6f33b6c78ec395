//! [`UserProfile`] — per-user balances and positions, owned exclusively by
//! one risk shard (§3).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::OrderType;

use super::position::SymbolPositionRecord;

/// Subtype encoded into `OrderCommand::order_type` for `BALANCE_ADJUSTMENT`
/// commands (§3 "repurposed"), distinguishing a deposit/withdrawal from a
/// suspend-related adjustment for accounting purposes (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalanceAdjustmentType {
    /// A regular deposit or withdrawal.
    Adjustment,
    /// An adjustment applied while suspending/resuming a user, tracked
    /// separately in the conservation-of-funds ledger (§8).
    Suspend,
}

impl BalanceAdjustmentType {
    /// Decode the subtype a `BALANCE_ADJUSTMENT` command carries in its
    /// repurposed `order_type` field. `FOK_BUDGET` is not a meaningful
    /// encoding for this command type and is treated as a plain adjustment.
    #[must_use]
    pub fn from_order_type(order_type: OrderType) -> Self {
        match order_type {
            OrderType::Ioc => BalanceAdjustmentType::Suspend,
            OrderType::Gtc | OrderType::FokBudget => BalanceAdjustmentType::Adjustment,
        }
    }
}

/// One user's balances and positions (§3 "UserProfile").
///
/// Created by [`super::engine::RiskEngine`] on `ADD_USER`, or implicitly
/// (flagged `suspended`) the first time a trade arrives against a maker
/// uid this shard has not seen an `ADD_USER` for yet. Destroyed only on a
/// full `RESET`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub uid: i64,
    /// `currency -> signed balance`, minor units.
    pub accounts: HashMap<i32, i64>,
    /// `symbolId -> position`, futures only.
    pub positions: HashMap<i32, SymbolPositionRecord>,
    pub suspended: bool,
}

impl UserProfile {
    #[must_use]
    pub fn new(uid: i64) -> Self {
        Self {
            uid,
            accounts: HashMap::new(),
            positions: HashMap::new(),
            suspended: false,
        }
    }

    /// An implicitly-created profile for a maker this shard has not seen
    /// an `ADD_USER` for (§3 "Ownership: ... created ... on first trade
    /// against a maker not yet known (then flagged suspended)").
    #[must_use]
    pub fn implicit(uid: i64) -> Self {
        let mut profile = Self::new(uid);
        profile.suspended = true;
        profile
    }

    #[must_use]
    pub fn balance(&self, currency: i32) -> i64 {
        self.accounts.get(&currency).copied().unwrap_or(0)
    }

    pub fn adjust_balance(&mut self, currency: i32, delta: i64) {
        *self.accounts.entry(currency).or_insert(0) += delta;
    }

    pub fn position_mut(&mut self, symbol_id: i32, quote_currency: i32) -> &mut SymbolPositionRecord {
        self.positions
            .entry(symbol_id)
            .or_insert_with(|| SymbolPositionRecord::new(symbol_id, quote_currency))
    }

    #[must_use]
    pub fn position(&self, symbol_id: i32) -> Option<&SymbolPositionRecord> {
        self.positions.get(&symbol_id)
    }
}
