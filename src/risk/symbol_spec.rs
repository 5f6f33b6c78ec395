//! [`CoreSymbolSpecification`] and the read-only provider both risk and
//! matching shards consult (§3 "CoreSymbolSpecification").

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::model::CommandResultCode;

/// What a symbol trades as — determines which risk path (§4.7) applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolType {
    /// Spot currency pair: BID holds quote currency, ASK holds base.
    CurrencyExchangePair,
    /// Cash-settled futures contract: margin against a position, not a
    /// currency transfer.
    FuturesContract,
}

/// A symbol's immutable trading parameters, created once via
/// `BatchAddSymbolsCommand` (§3, §4.8) and never mutated after insertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreSymbolSpecification {
    pub symbol_id: i32,
    pub symbol_type: SymbolType,
    pub base_currency: i32,
    pub quote_currency: i32,
    /// Integer lot multiplier applied to `size` to get base-currency units.
    pub base_scale_k: i64,
    /// Integer lot multiplier applied to `price` to get quote-currency
    /// minor units.
    pub quote_scale_k: i64,
    /// Per-lot fee charged to the maker side of a trade.
    pub maker_fee: i64,
    /// Per-lot fee charged to the taker side of a trade.
    pub taker_fee: i64,
}

/// Read-only (after population) table of every known symbol spec, shared
/// by every risk and matching shard (§3 "Symbol specs are read-only after
/// insertion; both risk and matching engines hold immutable references").
#[derive(Debug, Default)]
pub struct SymbolSpecificationProvider {
    specs: HashMap<i32, Arc<CoreSymbolSpecification>>,
}

impl SymbolSpecificationProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a batch of new symbols (`BatchAddSymbolsCommand`, §4.8).
    /// Existing entries for the same `symbol_id` are left untouched — specs
    /// are create-once.
    pub fn add_symbols(&mut self, specs: impl IntoIterator<Item = CoreSymbolSpecification>) {
        for spec in specs {
            self.specs.entry(spec.symbol_id).or_insert_with(|| Arc::new(spec));
        }
    }

    #[must_use]
    pub fn get(&self, symbol_id: i32) -> Option<Arc<CoreSymbolSpecification>> {
        self.specs.get(&symbol_id).cloned()
    }

    #[must_use]
    pub fn contains(&self, symbol_id: i32) -> bool {
        self.specs.contains_key(&symbol_id)
    }

    pub fn clear(&mut self) {
        self.specs.clear();
    }

    /// Resolve `symbol_id`, returning the appropriate result code on
    /// failure (§4.7: `INVALID_SYMBOL`).
    pub fn resolve(
        &self,
        symbol_id: i32,
    ) -> Result<Arc<CoreSymbolSpecification>, CommandResultCode> {
        self.get(symbol_id).ok_or(CommandResultCode::InvalidSymbol)
    }
}
