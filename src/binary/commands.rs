//! Payloads carried by multi-frame binary batch commands (§3, §4.8).

use serde::{Deserialize, Serialize};

use crate::risk::CoreSymbolSpecification;

/// One currency balance to seed for a user, used by `AddAccounts` (§2 of
/// `SPEC_FULL.md`: "BatchAddAccountsCommand ... seeding initial balances
/// via synthetic funding transaction ids").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSeed {
    pub uid: i64,
    pub currency: i32,
    pub amount: i64,
}

/// The decoded payload of a fully-assembled binary batch command (§4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BinaryCommand {
    /// `BatchAddSymbolsCommand`.
    AddSymbols(Vec<CoreSymbolSpecification>),
    /// `BatchAddAccountsCommand`.
    AddAccounts(Vec<AccountSeed>),
}

/// First synthetic `transferId` used by [`super::processor::apply_add_accounts`]
/// to credit seeded balances as if they were ordinary `BALANCE_ADJUSTMENT`
/// deposits (§2 of `SPEC_FULL.md`).
pub const SYNTHETIC_FUNDING_TRANSFER_BASE: i64 = 1_000_000_000;

#[must_use]
pub fn synthetic_funding_transfer_id(currency: i32) -> i64 {
    SYNTHETIC_FUNDING_TRANSFER_BASE + i64::from(currency)
}
