//! Pre-trade hold sizing and fee amounts for exchange-pair symbols (§4.7).
//!
//! Amounts are always in the currency the hold is placed against: quote
//! currency for BID (the taker is prepared to spend quote to buy base),
//! base currency for ASK (the taker is prepared to give up base to sell).
//! `quoteScaleK`/`baseScaleK` convert a raw `price`/`size` into minor
//! currency units the same way [`super::symbol_spec::CoreSymbolSpecification`]
//! is defined to scale them (§3).

use super::symbol_spec::CoreSymbolSpecification;

/// Quote-currency hold for a non-budget BID: notional at the *reserve*
/// price (the worst price the order could still execute at after a future
/// `MOVE_ORDER`) plus the taker fee for the full size.
#[must_use]
pub fn bid_taker_fee_amount(size: i64, reserve_bid_price: i64, spec: &CoreSymbolSpecification) -> i64 {
    size * (reserve_bid_price * spec.quote_scale_k + spec.taker_fee)
}

/// Quote-currency hold for a FOK_BUDGET BID: `price` already carries the
/// order's total spend ceiling (§4.5 "aggregate achievable spend"), so the
/// hold is that ceiling plus the taker fee for the full size.
#[must_use]
pub fn bid_taker_fee_for_budget(size: i64, price: i64, spec: &CoreSymbolSpecification) -> i64 {
    price + size * spec.taker_fee
}

/// Base-currency hold for an ASK: the full size being offered, scaled to
/// minor units. The taker fee is collected out of the quote-currency
/// proceeds at settlement, not held up front (§4.7 ASK requires only
/// `price * quoteScaleK >= takerFee`, it does not reserve the fee).
#[must_use]
pub fn ask_amount(size: i64, spec: &CoreSymbolSpecification) -> i64 {
    size * spec.base_scale_k
}

/// Quote-currency notional of one trade fill, used by post-risk
/// settlement to move funds and to prorate fees (§4.7).
#[must_use]
pub fn trade_quote_notional(size: i64, price: i64, spec: &CoreSymbolSpecification) -> i64 {
    size * price * spec.quote_scale_k
}

/// Base-currency notional of one trade fill.
#[must_use]
pub fn trade_base_notional(size: i64, spec: &CoreSymbolSpecification) -> i64 {
    size * spec.base_scale_k
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::symbol_spec::SymbolType;

    fn spec() -> CoreSymbolSpecification {
        CoreSymbolSpecification {
            symbol_id: 1,
            symbol_type: SymbolType::CurrencyExchangePair,
            base_currency: 1,
            quote_currency: 2,
            base_scale_k: 100,
            quote_scale_k: 10,
            maker_fee: 0,
            taker_fee: 0,
        }
    }

    #[test]
    fn bid_hold_scales_reserve_price_and_size() {
        let s = spec();
        assert_eq!(bid_taker_fee_amount(4, 1561, &s), 4 * 1561 * 10);
    }

    #[test]
    fn ask_hold_scales_size_only() {
        let s = spec();
        assert_eq!(ask_amount(7, &s), 7 * 100);
    }
}
