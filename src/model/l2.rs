//! L2 market-data snapshot attached to a command when requested (§4.4, §4.5).

use serde::{Deserialize, Serialize};

/// Up to `L2RefreshDepth` price levels per side, best price first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct L2MarketData {
    /// Ask prices, ascending.
    pub ask_prices: Vec<i64>,
    /// Ask aggregate sizes, index-aligned with `ask_prices`.
    pub ask_volumes: Vec<i64>,
    /// Bid prices, descending.
    pub bid_prices: Vec<i64>,
    /// Bid aggregate sizes, index-aligned with `bid_prices`.
    pub bid_volumes: Vec<i64>,
}

impl L2MarketData {
    /// Number of ask levels present.
    #[must_use]
    pub fn ask_size(&self) -> usize {
        self.ask_prices.len()
    }

    /// Number of bid levels present.
    #[must_use]
    pub fn bid_size(&self) -> usize {
        self.bid_prices.len()
    }
}
