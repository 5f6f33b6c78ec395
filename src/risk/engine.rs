//! [`RiskEngine`] — one per-shard instance of the two-phase pre/post risk
//! contract (§4.7).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::binary::{AccountSeed, BinaryCommand, BinaryCommandsProcessor, TotalBalanceReport, synthetic_funding_transfer_id};
use crate::model::{CommandResultCode, MatcherEventKind, OrderAction, OrderCommand, OrderCommandType, OrderType};

use super::fees::{ask_amount, bid_taker_fee_amount, bid_taker_fee_for_budget, trade_base_notional, trade_quote_notional};
use super::symbol_spec::{CoreSymbolSpecification, SymbolSpecificationProvider, SymbolType};
use super::user_profile::{BalanceAdjustmentType, UserProfile};

/// Whether futures orders may hold margin at all (§6 `marginTradingMode`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarginTradingMode {
    Disabled,
    Enabled,
}

/// Whether pre/post risk actually enforce holds and settle trades, or are
/// bypassed entirely (§6 `riskProcessingMode`) — used by benchmarks and
/// conformance tests that want to isolate the matching engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskProcessingMode {
    Full,
    NoRiskProcessing,
}

/// What a per-order hold was computed for, so cancel/reduce/reject refunds
/// and trade settlement know which per-unit rate and currency to unwind
/// (§4.7).
#[derive(Debug, Clone, Copy)]
struct OrderHold {
    #[allow(dead_code)]
    uid: i64,
    currency: i32,
    /// Minor-currency units held per lot of remaining size.
    per_unit_rate: i64,
    remaining_size: i64,
}

/// One risk shard: owns every user profile whose `uid` hashes to this
/// shard, plus its own private, independently-populated copy of the symbol
/// table (§3 "Sharding key: uid & (numShards-1)", §5 "Global mutable
/// state: avoid").
pub struct RiskEngine {
    shard_id: u32,
    shard_mask: u32,
    margin_mode: MarginTradingMode,
    processing_mode: RiskProcessingMode,
    profiles: HashMap<i64, UserProfile>,
    symbols: SymbolSpecificationProvider,
    last_price_cache: HashMap<i32, i64>,
    order_holds: HashMap<i64, OrderHold>,
    binary: BinaryCommandsProcessor,
    account_balances_delta: HashMap<i32, i64>,
    order_balances: HashMap<i32, i64>,
    suspends: HashMap<i32, i64>,
    fees: HashMap<i32, i64>,
    adjustments: HashMap<i32, i64>,
}

impl RiskEngine {
    #[must_use]
    pub fn new(
        shard_id: u32,
        shard_mask: u32,
        margin_mode: MarginTradingMode,
        processing_mode: RiskProcessingMode,
    ) -> Self {
        Self {
            shard_id,
            shard_mask,
            margin_mode,
            processing_mode,
            profiles: HashMap::new(),
            symbols: SymbolSpecificationProvider::new(),
            last_price_cache: HashMap::new(),
            order_holds: HashMap::new(),
            binary: BinaryCommandsProcessor::new(),
            account_balances_delta: HashMap::new(),
            order_balances: HashMap::new(),
            suspends: HashMap::new(),
            fees: HashMap::new(),
            adjustments: HashMap::new(),
        }
    }

    #[must_use]
    pub fn owns_uid(&self, uid: i64) -> bool {
        self.shard_mask == 0 || (uid as u32 & self.shard_mask) == self.shard_id
    }

    #[must_use]
    fn is_control_shard(&self) -> bool {
        self.shard_id == 0
    }

    fn profile_mut(&mut self, uid: i64) -> &mut UserProfile {
        self.profiles.entry(uid).or_insert_with(|| UserProfile::implicit(uid))
    }

    fn credit(&mut self, uid: i64, currency: i32, amount: i64) {
        self.profile_mut(uid).adjust_balance(currency, amount);
        *self.account_balances_delta.entry(currency).or_insert(0) += amount;
    }

    fn debit(&mut self, uid: i64, currency: i32, amount: i64) {
        self.credit(uid, currency, -amount);
    }

    fn hold(&mut self, currency: i32, amount: i64) {
        *self.order_balances.entry(currency).or_insert(0) += amount;
    }

    fn unhold(&mut self, currency: i32, amount: i64) {
        *self.order_balances.entry(currency).or_insert(0) -= amount;
    }

    fn add_fee(&mut self, currency: i32, amount: i64) {
        *self.fees.entry(currency).or_insert(0) += amount;
    }

    /// Aggregate `totalBalanceReport()` fragment for this shard (§8).
    #[must_use]
    pub fn total_balance_report(&self) -> TotalBalanceReport {
        let mut account_balances = HashMap::new();
        for profile in self.profiles.values() {
            for (&currency, &amount) in &profile.accounts {
                *account_balances.entry(currency).or_insert(0) += amount;
            }
        }
        TotalBalanceReport {
            account_balances,
            order_balances: self.order_balances.clone(),
            suspends: self.suspends.clone(),
            fees: self.fees.clone(),
            adjustments: self.adjustments.clone(),
        }
    }

    /// Drop all shard state (`RESET`, §4.9).
    pub fn reset(&mut self) {
        self.profiles.clear();
        self.symbols.clear();
        self.last_price_cache.clear();
        self.order_holds.clear();
        self.binary.clear();
        self.account_balances_delta.clear();
        self.order_balances.clear();
        self.suspends.clear();
        self.fees.clear();
        self.adjustments.clear();
    }

    // ---- R1: pre-risk --------------------------------------------------

    /// Run before matching. Returns `true` if the pipeline should publish
    /// this sequence immediately rather than wait for a group boundary
    /// (§4.7 `shouldPublishNow`).
    pub fn pre_process_command(&mut self, cmd: &mut OrderCommand) -> bool {
        if matches!(self.processing_mode, RiskProcessingMode::NoRiskProcessing) {
            if matches!(cmd.command, OrderCommandType::PlaceOrder) {
                cmd.result_code = CommandResultCode::ValidForMatchingEngine;
            }
            return false;
        }

        match cmd.command {
            OrderCommandType::PlaceOrder => self.pre_place_order(cmd),
            OrderCommandType::BalanceAdjustment => self.apply_balance_adjustment(cmd),
            OrderCommandType::AddUser => self.add_user(cmd),
            OrderCommandType::SuspendUser => self.set_suspended(cmd, true),
            OrderCommandType::ResumeUser => self.set_suspended(cmd, false),
            OrderCommandType::BinaryDataCommand | OrderCommandType::BinaryDataQuery => {
                return self.pre_binary_frame(cmd);
            }
            OrderCommandType::PersistStateMatching => {
                if self.is_control_shard() {
                    cmd.result_code = CommandResultCode::ValidForMatchingEngine;
                }
                return true;
            }
            OrderCommandType::PersistStateRisk => {
                cmd.result_code = CommandResultCode::Success;
            }
            OrderCommandType::Reset => {
                self.reset();
                if self.is_control_shard() {
                    cmd.result_code = CommandResultCode::Success;
                }
            }
            _ => {}
        }
        false
    }

    fn pre_place_order(&mut self, cmd: &mut OrderCommand) {
        if !self.owns_uid(cmd.uid) {
            return;
        }
        let Ok(spec) = self.symbols.resolve(cmd.symbol) else {
            cmd.result_code = CommandResultCode::InvalidSymbol;
            return;
        };

        match spec.symbol_type {
            SymbolType::CurrencyExchangePair => self.pre_place_exchange_order(cmd, &spec),
            SymbolType::FuturesContract => self.pre_place_futures_order(cmd, &spec),
        }
    }

    fn pre_place_exchange_order(&mut self, cmd: &mut OrderCommand, spec: &CoreSymbolSpecification) {
        let (currency, amount, per_unit_rate) = match cmd.action {
            OrderAction::Bid => {
                if cmd.order_type == OrderType::FokBudget {
                    if cmd.reserve_bid_price != cmd.price {
                        cmd.result_code = CommandResultCode::RiskInvalidReserveBidPrice;
                        return;
                    }
                    (
                        spec.quote_currency,
                        bid_taker_fee_for_budget(cmd.size, cmd.price, spec),
                        0,
                    )
                } else {
                    if cmd.reserve_bid_price < cmd.price {
                        cmd.result_code = CommandResultCode::RiskInvalidReserveBidPrice;
                        return;
                    }
                    let rate = cmd.reserve_bid_price * spec.quote_scale_k + spec.taker_fee;
                    (
                        spec.quote_currency,
                        bid_taker_fee_amount(cmd.size, cmd.reserve_bid_price, spec),
                        rate,
                    )
                }
            }
            OrderAction::Ask => {
                if cmd.price * spec.quote_scale_k < spec.taker_fee {
                    cmd.result_code = CommandResultCode::RiskAskPriceLowerThanFee;
                    return;
                }
                (spec.base_currency, ask_amount(cmd.size, spec), spec.base_scale_k)
            }
        };

        let profile = self.profile_mut(cmd.uid);
        if profile.suspended || profile.balance(currency) < amount {
            cmd.result_code = CommandResultCode::RiskNsf;
            return;
        }
        self.debit(cmd.uid, currency, amount);
        self.hold(currency, amount);
        if cmd.order_type != OrderType::FokBudget {
            self.order_holds.insert(
                cmd.order_id,
                OrderHold {
                    uid: cmd.uid,
                    currency,
                    per_unit_rate,
                    remaining_size: cmd.size,
                },
            );
        }
        cmd.result_code = CommandResultCode::ValidForMatchingEngine;
    }

    fn pre_place_futures_order(&mut self, cmd: &mut OrderCommand, spec: &CoreSymbolSpecification) {
        if matches!(self.margin_mode, MarginTradingMode::Disabled) {
            cmd.result_code = CommandResultCode::RiskMarginTradingDisabled;
            return;
        }
        let reference_price = *self.last_price_cache.get(&cmd.symbol).unwrap_or(&cmd.price);
        let per_unit_rate = reference_price * spec.quote_scale_k;
        let amount = cmd.size * per_unit_rate;
        let currency = spec.quote_currency;

        let profile = self.profile_mut(cmd.uid);
        if profile.suspended || profile.balance(currency) < amount {
            cmd.result_code = CommandResultCode::RiskNsf;
            return;
        }
        self.debit(cmd.uid, currency, amount);
        self.hold(currency, amount);
        self.order_holds.insert(
            cmd.order_id,
            OrderHold {
                uid: cmd.uid,
                currency,
                per_unit_rate,
                remaining_size: cmd.size,
            },
        );
        cmd.result_code = CommandResultCode::ValidForMatchingEngine;
    }

    fn apply_balance_adjustment(&mut self, cmd: &mut OrderCommand) {
        if !self.owns_uid(cmd.uid) {
            return;
        }
        let currency = cmd.symbol;
        let delta = cmd.price;
        let kind = BalanceAdjustmentType::from_order_type(cmd.order_type);
        self.credit(cmd.uid, currency, delta);
        match kind {
            BalanceAdjustmentType::Adjustment => {
                *self.adjustments.entry(currency).or_insert(0) += delta;
            }
            BalanceAdjustmentType::Suspend => {
                *self.suspends.entry(currency).or_insert(0) += delta;
            }
        }
        cmd.result_code = CommandResultCode::Success;
    }

    fn add_user(&mut self, cmd: &mut OrderCommand) {
        if !self.owns_uid(cmd.uid) {
            return;
        }
        self.profiles.entry(cmd.uid).or_insert_with(|| UserProfile::new(cmd.uid));
        cmd.result_code = CommandResultCode::Success;
    }

    fn set_suspended(&mut self, cmd: &mut OrderCommand, suspended: bool) {
        if !self.owns_uid(cmd.uid) {
            return;
        }
        let Some(profile) = self.profiles.get_mut(&cmd.uid) else {
            cmd.result_code = CommandResultCode::AuthInvalidUser;
            return;
        };
        profile.suspended = suspended;
        cmd.result_code = CommandResultCode::Success;
    }

    fn pre_binary_frame(&mut self, cmd: &mut OrderCommand) -> bool {
        let decoded = match self.binary.accept_frame(cmd) {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!(error = %err, "binary frame assembly failed on risk shard");
                if self.is_control_shard() {
                    cmd.result_code = CommandResultCode::InvalidSymbol;
                }
                return cmd.symbol == -1 && self.is_control_shard();
            }
        };
        if let Some(command) = decoded {
            self.apply_binary_command(command);
        }
        if cmd.symbol == -1 {
            if self.is_control_shard() {
                cmd.result_code = CommandResultCode::ValidForMatchingEngine;
            }
            return true;
        }
        false
    }

    fn apply_binary_command(&mut self, command: BinaryCommand) {
        match command {
            BinaryCommand::AddSymbols(specs) => {
                trace!(count = specs.len(), "installing symbol batch on risk shard");
                self.symbols.add_symbols(specs);
            }
            BinaryCommand::AddAccounts(seeds) => self.seed_accounts(seeds),
        }
    }

    /// Seed initial balances via synthetic deposit transactions (§2 of
    /// `SPEC_FULL.md`).
    fn seed_accounts(&mut self, seeds: Vec<AccountSeed>) {
        for AccountSeed { uid, currency, amount } in seeds {
            if !self.owns_uid(uid) {
                continue;
            }
            let _transfer_id = synthetic_funding_transfer_id(currency);
            self.credit(uid, currency, amount);
            *self.adjustments.entry(currency).or_insert(0) += amount;
        }
    }

    // ---- R2: post-risk ---------------------------------------------------

    /// Run after matching, settling trades/refunds recorded in the
    /// command's matcher event chain (§4.7).
    pub fn post_process_command(&mut self, cmd: &OrderCommand) {
        if matches!(self.processing_mode, RiskProcessingMode::NoRiskProcessing) {
            return;
        }

        match cmd.command {
            OrderCommandType::PlaceOrder => self.post_place_order(cmd),
            OrderCommandType::CancelOrder | OrderCommandType::ReduceOrder => {
                self.post_cancel_or_reduce(cmd)
            }
            OrderCommandType::MoveOrder => self.post_move_order(cmd),
            _ => {}
        }

        if matches!(self.margin_mode, MarginTradingMode::Enabled) {
            if let Some(md) = &cmd.market_data {
                if let Some(&bid) = md.bid_prices.first() {
                    self.last_price_cache.insert(cmd.symbol, bid);
                } else if let Some(&ask) = md.ask_prices.first() {
                    self.last_price_cache.insert(cmd.symbol, ask);
                }
            }
        }
    }

    fn post_place_order(&mut self, cmd: &OrderCommand) {
        let Some(mut event) = cmd.matcher_event.as_deref() else {
            return;
        };
        let Ok(spec) = self.symbols.resolve(cmd.symbol) else {
            return;
        };

        let taker_owned = self.owns_uid(cmd.uid);
        let mut spent = 0i64;
        loop {
            match &event.kind {
                MatcherEventKind::Trade {
                    maker_order_id,
                    maker_uid,
                    price,
                    size,
                    ..
                } => {
                    let maker_action = cmd.action.opposite();
                    match spec.symbol_type {
                        SymbolType::CurrencyExchangePair => {
                            if taker_owned {
                                spent += self.settle_taker_fill(cmd, &spec, *price, *size);
                            }
                            if self.owns_uid(*maker_uid) {
                                self.settle_maker_fill(&spec, *maker_order_id, *maker_uid, *price, *size, maker_action);
                            }
                        }
                        SymbolType::FuturesContract => {
                            if taker_owned {
                                spent += self.settle_futures_fill(cmd.uid, cmd.action, &spec, cmd.order_id, *price, *size, false);
                            }
                            if self.owns_uid(*maker_uid) {
                                self.settle_futures_fill(*maker_uid, maker_action, &spec, *maker_order_id, *price, *size, true);
                            }
                        }
                    }
                }
                MatcherEventKind::Reject { size, .. } => {
                    if taker_owned {
                        self.release_taker_hold(cmd.uid, cmd.order_id, *size);
                    }
                }
                MatcherEventKind::Reduce { .. } | MatcherEventKind::Binary { .. } => {}
            }
            match &event.next_event {
                Some(next) => event = next.as_ref(),
                None => break,
            }
        }

        if !taker_owned {
            return;
        }

        if self.order_holds.contains_key(&cmd.order_id) {
            // A residual rests (GTC): the ledger entry inserted by pre-risk
            // already reflects the untouched remaining size/hold; nothing
            // more to refund here until it trades again, is reduced, or is
            // canceled.
            return;
        }
        // FOK_BUDGET (never tracked in the ledger) or a fully-matched
        // GTC/IOC order (ledger entry never inserted, or just removed by
        // the fill loop above because it reached zero remaining size).
        // Refund whatever of the original hold wasn't spent.
        match spec.symbol_type {
            SymbolType::CurrencyExchangePair => self.refund_untracked_place(cmd, &spec, spent),
            SymbolType::FuturesContract => self.refund_untracked_margin(cmd, &spec, spent),
        }
    }

    fn refund_untracked_place(&mut self, cmd: &OrderCommand, spec: &CoreSymbolSpecification, spent: i64) {
        let (currency, original_hold) = match cmd.action {
            OrderAction::Bid if cmd.order_type == OrderType::FokBudget => {
                (spec.quote_currency, bid_taker_fee_for_budget(cmd.size, cmd.price, spec))
            }
            OrderAction::Bid => (
                spec.quote_currency,
                bid_taker_fee_amount(cmd.size, cmd.reserve_bid_price, spec),
            ),
            OrderAction::Ask => (spec.base_currency, ask_amount(cmd.size, spec)),
        };
        let refund = original_hold - spent;
        if refund > 0 {
            self.credit(cmd.uid, currency, refund);
            self.unhold(currency, refund);
        }
    }

    /// Refund an IOC taker's rejected residual (the portion of its own
    /// order that found no match) at the ledger's reserved per-unit rate,
    /// no fee retained, and shrink/drop its hold-ledger entry. FOK_BUDGET
    /// orders never reach here with a ledger entry (none was inserted for
    /// them); their reject refund is computed wholesale from `cmd` in
    /// `refund_untracked_place` instead.
    fn release_taker_hold(&mut self, uid: i64, order_id: i64, size: i64) {
        let Some(hold) = self.order_holds.get_mut(&order_id) else {
            return;
        };
        let refund = size * hold.per_unit_rate;
        let currency = hold.currency;
        hold.remaining_size -= size;
        let done = hold.remaining_size <= 0;
        self.credit(uid, currency, refund);
        self.unhold(currency, refund);
        if done {
            self.order_holds.remove(&order_id);
        }
    }

    /// Settle the taker's side of one fill, returning the quote (Bid) or
    /// base (Ask) amount of the original hold it consumed.
    ///
    /// A GTC taker whose residual later rests gets a ledger entry from
    /// `pre_place_exchange_order` sized to the *whole* order; this shrinks
    /// that entry by each fill's size so it reflects only the still-resting
    /// remainder by the time `post_place_order` checks it.
    fn settle_taker_fill(&mut self, cmd: &OrderCommand, spec: &CoreSymbolSpecification, price: i64, size: i64) -> i64 {
        let ledger_rate = self.order_holds.get(&cmd.order_id).map(|hold| hold.per_unit_rate);
        if let Some(hold) = self.order_holds.get_mut(&cmd.order_id) {
            hold.remaining_size -= size;
            if hold.remaining_size <= 0 {
                self.order_holds.remove(&cmd.order_id);
            }
        }
        match cmd.action {
            OrderAction::Bid => {
                let notional = trade_quote_notional(size, price, spec);
                let fee = size * spec.taker_fee;
                // Release the hold at the rate reserved for this order at
                // placement time, not at whatever `cmd` carries now: a
                // `MOVE_ORDER` command settles a crossed move through this
                // same path (`post_move_order` -> `post_place_order`) and
                // carries no meaningful `reserve_bid_price`/`order_type` of
                // its own (§4.5 "MOVE_ORDER"). FOK_BUDGET orders are the one
                // case with no ledger entry to fall back on (§4.7: never
                // tracked), so for those the trade price stands in for the
                // reserve rate.
                let per_unit_rate = ledger_rate.unwrap_or_else(|| price * spec.quote_scale_k + spec.taker_fee);
                let consumed = size * per_unit_rate;
                let refund = consumed - (notional + fee);
                if refund > 0 {
                    self.credit(cmd.uid, spec.quote_currency, refund);
                }
                self.unhold(spec.quote_currency, consumed);
                self.add_fee(spec.quote_currency, fee);
                self.credit(cmd.uid, spec.base_currency, trade_base_notional(size, spec));
                consumed
            }
            OrderAction::Ask => {
                let base = trade_base_notional(size, spec);
                let notional = trade_quote_notional(size, price, spec);
                let fee = size * spec.taker_fee;
                self.unhold(spec.base_currency, base);
                self.add_fee(spec.quote_currency, fee);
                self.credit(cmd.uid, spec.quote_currency, notional - fee);
                base
            }
        }
    }

    fn settle_maker_fill(
        &mut self,
        spec: &CoreSymbolSpecification,
        maker_order_id: i64,
        maker_uid: i64,
        price: i64,
        size: i64,
        maker_action: OrderAction,
    ) {
        let Some(hold) = self.order_holds.get_mut(&maker_order_id) else {
            warn!(maker_order_id, "maker trade with no tracked hold on owning shard");
            return;
        };
        let per_unit_rate = hold.per_unit_rate;
        let consumed = size * per_unit_rate;
        hold.remaining_size -= size;
        let done = hold.remaining_size <= 0;
        if done {
            self.order_holds.remove(&maker_order_id);
        }

        match maker_action {
            OrderAction::Bid => {
                let notional = trade_quote_notional(size, price, spec);
                let fee = size * spec.maker_fee;
                let refund = consumed - (notional + fee);
                if refund > 0 {
                    self.credit(maker_uid, spec.quote_currency, refund);
                }
                self.unhold(spec.quote_currency, consumed);
                self.add_fee(spec.quote_currency, fee);
                self.credit(maker_uid, spec.base_currency, trade_base_notional(size, spec));
            }
            OrderAction::Ask => {
                let notional = trade_quote_notional(size, price, spec);
                let fee = size * spec.maker_fee;
                self.unhold(spec.base_currency, consumed);
                self.add_fee(spec.quote_currency, fee);
                self.credit(maker_uid, spec.quote_currency, notional - fee);
            }
        }
    }

    /// Settle one futures trade leg: update the position netting record,
    /// charge a fee proportional to the portion of `size` that opened new
    /// exposure, and release the matching slice of the margin hold.
    /// Realized P&L from a closing trade is absorbed into the released
    /// margin rather than separately credited/debited — §3's
    /// `SymbolPositionRecord` tracks exposure, not a cash mark-to-market
    /// (see `DESIGN.md`: futures settlement is margin-only).
    /// Returns the margin amount released, so the taker side can fold it
    /// into its running `spent` total.
    fn settle_futures_fill(
        &mut self,
        uid: i64,
        action: OrderAction,
        spec: &CoreSymbolSpecification,
        order_id: i64,
        price: i64,
        size: i64,
        is_maker: bool,
    ) -> i64 {
        let fee_rate = if is_maker { spec.maker_fee } else { spec.taker_fee };
        let opened = self
            .profile_mut(uid)
            .position_mut(spec.symbol_id, spec.quote_currency)
            .update_position_for_margin_trade(action, size, price);
        let fee = opened * fee_rate;

        let Some(hold) = self.order_holds.get_mut(&order_id) else {
            warn!(order_id, "futures trade with no tracked margin hold on owning shard");
            self.add_fee(spec.quote_currency, fee);
            self.debit(uid, spec.quote_currency, fee);
            return 0;
        };
        let consumed = size * hold.per_unit_rate;
        hold.remaining_size -= size;
        if hold.remaining_size <= 0 {
            self.order_holds.remove(&order_id);
        }

        let refund = consumed - fee;
        if refund > 0 {
            self.credit(uid, spec.quote_currency, refund);
        }
        self.unhold(spec.quote_currency, consumed);
        self.add_fee(spec.quote_currency, fee);
        consumed
    }

    fn refund_untracked_margin(&mut self, cmd: &OrderCommand, spec: &CoreSymbolSpecification, spent: i64) {
        let reference_price = *self.last_price_cache.get(&cmd.symbol).unwrap_or(&cmd.price);
        let original_hold = cmd.size * reference_price * spec.quote_scale_k;
        let refund = original_hold - spent;
        if refund > 0 {
            self.credit(cmd.uid, spec.quote_currency, refund);
            self.unhold(spec.quote_currency, refund);
        }
    }

    fn post_cancel_or_reduce(&mut self, cmd: &OrderCommand) {
        if !self.owns_uid(cmd.uid) {
            return;
        }
        let Some(MatcherEventKind::Reduce { size, .. }) = cmd.matcher_event.as_deref().map(|e| &e.kind) else {
            return;
        };
        let size = *size;
        let done = {
            let Some(hold) = self.order_holds.get_mut(&cmd.order_id) else {
                return;
            };
            let refund = size * hold.per_unit_rate;
            let currency = hold.currency;
            hold.remaining_size -= size;
            let done = hold.remaining_size <= 0;
            self.credit(cmd.uid, currency, refund);
            self.unhold(currency, refund);
            done
        };
        if done {
            self.order_holds.remove(&cmd.order_id);
        }
    }

    fn post_move_order(&mut self, cmd: &OrderCommand) {
        if cmd.result_code != CommandResultCode::Success || !self.owns_uid(cmd.uid) {
            return;
        }
        // A successful move only changes price; any trades it caused are
        // settled exactly like a fresh taker fill, and the surviving
        // residual keeps resting under the same order id, so the ledger
        // entry (still keyed by `cmd.order_id`) needs no adjustment beyond
        // what trade settlement above already applied.
        self.post_place_order(cmd);
    }
}
