//! Naive reference order book (§4.5): a price-level map of FIFO queues.
//!
//! Used as a conformance oracle — every test that checks
//! [`super::direct::DirectOrderBook`] against expected behavior also runs
//! against this implementation, so the two must agree bit-for-bit on result
//! codes, event chains, and L2 snapshots.

use std::collections::{BTreeMap, HashMap, VecDeque};

use crate::model::{
    CommandResultCode, L2MarketData, MatcherEventKind, MatcherTradeEvent, Order, OrderAction,
    OrderCommand, OrderCommandType, OrderType,
};

use super::engine_trait::MatchingEngine;

/// One price level: insertion-ordered FIFO of resting orders.
struct PriceLevel {
    orders: VecDeque<Order>,
}

impl PriceLevel {
    fn volume(&self) -> i64 {
        self.orders.iter().map(Order::remaining).sum()
    }
}

/// Where a live order currently rests, for lookup by id.
struct OrderLocation {
    action: OrderAction,
    price: i64,
}

/// Reference matching engine for one symbol.
pub struct NaiveOrderBook {
    symbol: i32,
    asks: BTreeMap<i64, PriceLevel>,
    bids: BTreeMap<i64, PriceLevel>,
    locations: HashMap<i64, OrderLocation>,
}

impl NaiveOrderBook {
    #[must_use]
    pub fn new(symbol: i32) -> Self {
        Self {
            symbol,
            asks: BTreeMap::new(),
            bids: BTreeMap::new(),
            locations: HashMap::new(),
        }
    }

    fn side(&self, action: OrderAction) -> &BTreeMap<i64, PriceLevel> {
        match action {
            OrderAction::Ask => &self.asks,
            OrderAction::Bid => &self.bids,
        }
    }

    /// Aggregate quantity and notional achievable by walking the opposite
    /// book for `taker_action`, honoring `price_bound` (`None` means walk
    /// unconstrained by price, as FOK_BUDGET requires) up to `size_wanted`.
    fn simulate(
        &self,
        taker_action: OrderAction,
        price_bound: Option<i64>,
        size_wanted: i64,
    ) -> (i64, i64) {
        let opposite = self.side(taker_action.opposite());
        let mut remaining = size_wanted;
        let mut notional = 0i64;
        let levels: Box<dyn Iterator<Item = (&i64, &PriceLevel)>> = match taker_action {
            OrderAction::Ask => Box::new(opposite.iter().rev()),
            OrderAction::Bid => Box::new(opposite.iter()),
        };
        for (&price, level) in levels {
            if remaining <= 0 {
                break;
            }
            if let Some(bound) = price_bound {
                let marketable = match taker_action {
                    OrderAction::Ask => price >= bound,
                    OrderAction::Bid => price <= bound,
                };
                if !marketable {
                    break;
                }
            }
            let take = remaining.min(level.volume());
            remaining -= take;
            notional += take * price;
        }
        (size_wanted - remaining, notional)
    }

    /// Execute a taker order against the opposite book, mutating state and
    /// appending TRADE events to `chain`. Returns quantity filled.
    fn execute(
        &mut self,
        taker_action: OrderAction,
        price_bound: Option<i64>,
        size_wanted: i64,
        bidder_hold_price: i64,
        chain: &mut Option<Box<MatcherTradeEvent>>,
    ) -> i64 {
        let opposite_action = taker_action.opposite();
        let mut remaining = size_wanted;

        loop {
            if remaining <= 0 {
                break;
            }

            let best_key = {
                let opposite = match opposite_action {
                    OrderAction::Ask => &self.asks,
                    OrderAction::Bid => &self.bids,
                };
                match taker_action {
                    OrderAction::Ask => opposite.keys().next_back().copied(),
                    OrderAction::Bid => opposite.keys().next().copied(),
                }
            };
            let Some(price) = best_key else { break };
            if let Some(bound) = price_bound {
                let marketable = match taker_action {
                    OrderAction::Ask => price >= bound,
                    OrderAction::Bid => price <= bound,
                };
                if !marketable {
                    break;
                }
            }

            let mut trade = None;
            {
                let opposite = match opposite_action {
                    OrderAction::Ask => &mut self.asks,
                    OrderAction::Bid => &mut self.bids,
                };
                let level = opposite.get_mut(&price).expect("price key just read");
                let mut emptied = false;
                if let Some(maker) = level.orders.front_mut() {
                    let trade_qty = remaining.min(maker.remaining());
                    maker.filled += trade_qty;
                    remaining -= trade_qty;
                    let maker_completed = maker.is_complete();
                    let maker_order_id = maker.order_id;
                    let maker_uid = maker.uid;
                    if maker_completed {
                        level.orders.pop_front();
                    }
                    if level.orders.is_empty() {
                        emptied = true;
                    }
                    trade = Some((
                        maker_order_id,
                        maker_uid,
                        trade_qty,
                        maker_completed,
                        remaining == 0,
                    ));
                } else {
                    emptied = true;
                }
                if emptied {
                    opposite.remove(&price);
                }
            }

            let Some((maker_order_id, maker_uid, trade_qty, maker_completed, taker_completed)) =
                trade
            else {
                continue;
            };
            if maker_completed {
                self.locations.remove(&maker_order_id);
            }
            *chain = MatcherTradeEvent::push_back(
                chain.take(),
                MatcherTradeEvent::leaf(MatcherEventKind::Trade {
                    maker_order_id,
                    maker_uid,
                    price,
                    size: trade_qty,
                    bidder_hold_price,
                    taker_completed,
                    maker_completed,
                }),
            );
        }

        size_wanted - remaining
    }

    fn place_order(&mut self, cmd: &mut OrderCommand) {
        if self.locations.contains_key(&cmd.order_id) {
            cmd.result_code = CommandResultCode::MatchingDuplicateOrderId;
            return;
        }

        let mut chain: Option<Box<MatcherTradeEvent>> = None;
        let filled = match cmd.order_type {
            OrderType::FokBudget => {
                let (achievable_qty, achievable_notional) =
                    self.simulate(cmd.action, None, cmd.size);
                let expectation_met = match cmd.action {
                    OrderAction::Bid => {
                        achievable_qty == cmd.size && achievable_notional <= cmd.price
                    }
                    OrderAction::Ask => {
                        achievable_qty == cmd.size && achievable_notional >= cmd.price
                    }
                };
                if !expectation_met {
                    cmd.result_code = CommandResultCode::Success;
                    cmd.matcher_event = Some(MatcherTradeEvent::leaf(MatcherEventKind::Reject {
                        size: cmd.size,
                        price: cmd.price,
                        bidder_hold_price: cmd.reserve_bid_price,
                    }));
                    return;
                }
                self.execute(cmd.action, None, cmd.size, cmd.reserve_bid_price, &mut chain)
            }
            OrderType::Gtc | OrderType::Ioc => self.execute(
                cmd.action,
                Some(cmd.price),
                cmd.size,
                cmd.reserve_bid_price,
                &mut chain,
            ),
        };

        let residual = cmd.size - filled;
        if residual > 0 {
            match cmd.order_type {
                OrderType::Gtc => {
                    let order = Order {
                        order_id: cmd.order_id,
                        uid: cmd.uid,
                        action: cmd.action,
                        price: cmd.price,
                        reserve_bid_price: cmd.reserve_bid_price,
                        size: cmd.size,
                        filled,
                        order_type: cmd.order_type,
                        timestamp: cmd.timestamp,
                    };
                    let side = match cmd.action {
                        OrderAction::Ask => &mut self.asks,
                        OrderAction::Bid => &mut self.bids,
                    };
                    side.entry(cmd.price)
                        .or_insert_with(|| PriceLevel {
                            orders: VecDeque::new(),
                        })
                        .orders
                        .push_back(order);
                    self.locations.insert(
                        cmd.order_id,
                        OrderLocation {
                            action: cmd.action,
                            price: cmd.price,
                        },
                    );
                }
                OrderType::Ioc => {
                    chain = MatcherTradeEvent::push_back(
                        chain.take(),
                        MatcherTradeEvent::leaf(MatcherEventKind::Reject {
                            size: residual,
                            price: cmd.price,
                            bidder_hold_price: cmd.reserve_bid_price,
                        }),
                    );
                }
                OrderType::FokBudget => unreachable!("FOK_BUDGET never leaves a residual"),
            }
        }

        cmd.result_code = CommandResultCode::Success;
        cmd.matcher_event = chain;
    }

    fn cancel_order(&mut self, cmd: &mut OrderCommand) {
        let Some(loc) = self.locations.get(&cmd.order_id) else {
            cmd.result_code = CommandResultCode::MatchingUnknownOrderId;
            return;
        };
        let (action, price) = (loc.action, loc.price);

        let remaining;
        {
            let side = match action {
                OrderAction::Ask => &mut self.asks,
                OrderAction::Bid => &mut self.bids,
            };
            let level = side.get_mut(&price).expect("indexed");
            let idx = level
                .orders
                .iter()
                .position(|o| o.order_id == cmd.order_id)
                .expect("indexed");
            if level.orders[idx].uid != cmd.uid {
                cmd.result_code = CommandResultCode::MatchingUnknownOrderId;
                return;
            }
            remaining = level.orders[idx].remaining();
            level.orders.remove(idx);
            if level.orders.is_empty() {
                side.remove(&price);
            }
        }
        self.locations.remove(&cmd.order_id);
        cmd.result_code = CommandResultCode::Success;
        cmd.matcher_event = Some(MatcherTradeEvent::leaf(MatcherEventKind::Reduce {
            size: remaining,
            price,
        }));
    }

    fn reduce_order(&mut self, cmd: &mut OrderCommand) {
        if cmd.size <= 0 {
            cmd.result_code = CommandResultCode::MatchingReduceFailedWrongSize;
            return;
        }
        let Some(loc) = self.locations.get(&cmd.order_id) else {
            cmd.result_code = CommandResultCode::MatchingUnknownOrderId;
            return;
        };
        let (action, price) = (loc.action, loc.price);

        let reduce_by;
        let now_complete;
        {
            let side = match action {
                OrderAction::Ask => &mut self.asks,
                OrderAction::Bid => &mut self.bids,
            };
            let level = side.get_mut(&price).expect("indexed");
            let idx = level
                .orders
                .iter()
                .position(|o| o.order_id == cmd.order_id)
                .expect("indexed");
            if level.orders[idx].uid != cmd.uid {
                cmd.result_code = CommandResultCode::MatchingUnknownOrderId;
                return;
            }
            reduce_by = cmd.size.min(level.orders[idx].remaining());
            level.orders[idx].filled += reduce_by;
            now_complete = level.orders[idx].is_complete();
            if now_complete {
                level.orders.remove(idx);
                if level.orders.is_empty() {
                    side.remove(&price);
                }
            }
        }
        if now_complete {
            self.locations.remove(&cmd.order_id);
        }
        cmd.result_code = CommandResultCode::Success;
        cmd.matcher_event = Some(MatcherTradeEvent::leaf(MatcherEventKind::Reduce {
            size: reduce_by,
            price,
        }));
    }

    fn move_order(&mut self, cmd: &mut OrderCommand) {
        let Some(loc) = self.locations.get(&cmd.order_id) else {
            cmd.result_code = CommandResultCode::MatchingUnknownOrderId;
            return;
        };
        let (action, old_price) = (loc.action, loc.price);
        // A MOVE_ORDER command carries no side of its own; stamp it with
        // the resting order's so post-risk settlement (which branches on
        // `cmd.action`) treats a crossed move exactly like a fresh taker
        // fill on the correct side (§4.5 "MOVE_ORDER").
        cmd.action = action;

        let removed;
        {
            let side = match action {
                OrderAction::Ask => &mut self.asks,
                OrderAction::Bid => &mut self.bids,
            };
            let level = side.get_mut(&old_price).expect("indexed");
            let idx = level
                .orders
                .iter()
                .position(|o| o.order_id == cmd.order_id)
                .expect("indexed");
            if level.orders[idx].uid != cmd.uid {
                cmd.result_code = CommandResultCode::MatchingUnknownOrderId;
                return;
            }
            if action == OrderAction::Bid && cmd.price > level.orders[idx].reserve_bid_price {
                cmd.result_code = CommandResultCode::MatchingMoveFailedPriceOverRiskLimit;
                return;
            }
            removed = level.orders.remove(idx);
            if level.orders.is_empty() {
                side.remove(&old_price);
            }
        }
        self.locations.remove(&cmd.order_id);

        let mut order = removed.expect("just located");
        order.price = cmd.price;
        let remaining = order.remaining();

        let mut chain: Option<Box<MatcherTradeEvent>> = None;
        let filled = self.execute(
            action,
            Some(order.price),
            remaining,
            order.reserve_bid_price,
            &mut chain,
        );
        order.filled += filled;

        if !order.is_complete() {
            let new_price = order.price;
            let side = match action {
                OrderAction::Ask => &mut self.asks,
                OrderAction::Bid => &mut self.bids,
            };
            side.entry(new_price)
                .or_insert_with(|| PriceLevel {
                    orders: VecDeque::new(),
                })
                .orders
                .push_back(order);
            self.locations.insert(
                cmd.order_id,
                OrderLocation {
                    action,
                    price: new_price,
                },
            );
        }

        cmd.result_code = CommandResultCode::Success;
        cmd.matcher_event = chain;
    }
}

impl MatchingEngine for NaiveOrderBook {
    fn process_order_command(&mut self, cmd: &mut OrderCommand) {
        cmd.clear_transient();
        match cmd.command {
            OrderCommandType::PlaceOrder => self.place_order(cmd),
            OrderCommandType::CancelOrder => self.cancel_order(cmd),
            OrderCommandType::ReduceOrder => self.reduce_order(cmd),
            OrderCommandType::MoveOrder => self.move_order(cmd),
            OrderCommandType::OrderBookRequest => {
                cmd.market_data = Some(self.get_l2_market_data_snapshot(cmd.size.max(0) as usize));
                cmd.result_code = CommandResultCode::Success;
            }
            other => {
                tracing::warn!(symbol = self.symbol, command = ?other, "command not handled by matching engine");
                cmd.result_code = CommandResultCode::Success;
            }
        }
        if cmd.service_flags & 1 != 0 && cmd.market_data.is_none() {
            cmd.market_data = Some(self.get_l2_market_data_snapshot(8));
        }
    }

    fn get_l2_market_data_snapshot(&self, depth: usize) -> L2MarketData {
        let mut data = L2MarketData::default();
        for (&price, level) in self.asks.iter().take(depth) {
            data.ask_prices.push(price);
            data.ask_volumes.push(level.volume());
        }
        for (&price, level) in self.bids.iter().rev().take(depth) {
            data.bid_prices.push(price);
            data.bid_volumes.push(level.volume());
        }
        data
    }

    fn state_hash(&self) -> u64 {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.symbol.hash(&mut hasher);
        for (&price, level) in &self.asks {
            price.hash(&mut hasher);
            for o in &level.orders {
                (o.order_id, o.uid, o.remaining()).hash(&mut hasher);
            }
        }
        for (&price, level) in &self.bids {
            price.hash(&mut hasher);
            for o in &level.orders {
                (o.order_id, o.uid, o.remaining()).hash(&mut hasher);
            }
        }
        hasher.finish()
    }

    fn clear(&mut self) {
        self.asks.clear();
        self.bids.clear();
        self.locations.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(
        book: &mut NaiveOrderBook,
        order_id: i64,
        uid: i64,
        action: OrderAction,
        price: i64,
        size: i64,
    ) -> OrderCommand {
        let mut cmd = OrderCommand::new(OrderCommandType::PlaceOrder);
        cmd.order_id = order_id;
        cmd.uid = uid;
        cmd.action = action;
        cmd.order_type = OrderType::Gtc;
        cmd.price = price;
        cmd.reserve_bid_price = price;
        cmd.size = size;
        book.process_order_command(&mut cmd);
        cmd
    }

    #[test]
    fn resting_gtc_order_appears_in_l2() {
        let mut book = NaiveOrderBook::new(1);
        let cmd = place(&mut book, 1, 100, OrderAction::Bid, 18_000, 500);
        assert_eq!(cmd.result_code, CommandResultCode::Success);
        let l2 = book.get_l2_market_data_snapshot(10);
        assert_eq!(l2.bid_prices, vec![18_000]);
        assert_eq!(l2.bid_volumes, vec![500]);
    }

    #[test]
    fn crossing_order_trades_at_maker_price() {
        let mut book = NaiveOrderBook::new(1);
        place(&mut book, 1, 100, OrderAction::Ask, 18_000, 300);
        let taker = place(&mut book, 2, 200, OrderAction::Bid, 18_100, 200);
        let event = taker.matcher_event.expect("trade expected");
        match event.kind {
            MatcherEventKind::Trade {
                maker_order_id,
                price,
                size,
                taker_completed,
                maker_completed,
                ..
            } => {
                assert_eq!(maker_order_id, 1);
                assert_eq!(price, 18_000);
                assert_eq!(size, 200);
                assert!(taker_completed);
                assert!(!maker_completed);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn duplicate_order_id_is_rejected() {
        let mut book = NaiveOrderBook::new(1);
        place(&mut book, 1, 100, OrderAction::Ask, 18_000, 100);
        let dup = place(&mut book, 1, 200, OrderAction::Ask, 18_000, 100);
        assert_eq!(dup.result_code, CommandResultCode::MatchingDuplicateOrderId);
        assert!(dup.matcher_event.is_none());
    }

    #[test]
    fn ioc_residual_is_rejected_not_rested() {
        let mut book = NaiveOrderBook::new(1);
        place(&mut book, 1, 100, OrderAction::Ask, 18_000, 100);
        let mut cmd = OrderCommand::new(OrderCommandType::PlaceOrder);
        cmd.order_id = 2;
        cmd.uid = 200;
        cmd.action = OrderAction::Bid;
        cmd.order_type = OrderType::Ioc;
        cmd.price = 18_000;
        cmd.size = 300;
        book.process_order_command(&mut cmd);
        let l2 = book.get_l2_market_data_snapshot(10);
        assert!(l2.bid_prices.is_empty(), "IOC residual must not rest");
        let chain = cmd.matcher_event.expect("events expected");
        assert_eq!(chain.chain_len(), 2);
    }

    #[test]
    fn fok_budget_rejects_when_spend_exceeds_budget() {
        let mut book = NaiveOrderBook::new(1);
        place(&mut book, 1, 100, OrderAction::Ask, 18_000, 500);
        let mut cmd = OrderCommand::new(OrderCommandType::PlaceOrder);
        cmd.order_id = 2;
        cmd.uid = 200;
        cmd.action = OrderAction::Bid;
        cmd.order_type = OrderType::FokBudget;
        cmd.price = 100; // budget far too small
        cmd.size = 500;
        book.process_order_command(&mut cmd);
        let event = cmd.matcher_event.expect("reject expected");
        assert!(matches!(event.kind, MatcherEventKind::Reject { .. }));
        let l2 = book.get_l2_market_data_snapshot(10);
        assert_eq!(l2.ask_volumes, vec![500], "book must be untouched on FOK reject");
    }

    #[test]
    fn cancel_order_emits_reduce_with_remaining_size() {
        let mut book = NaiveOrderBook::new(1);
        place(&mut book, 1, 100, OrderAction::Ask, 18_000, 500);
        let mut cancel = OrderCommand::new(OrderCommandType::CancelOrder);
        cancel.order_id = 1;
        cancel.uid = 100;
        book.process_order_command(&mut cancel);
        assert_eq!(cancel.result_code, CommandResultCode::Success);
        match cancel.matcher_event.unwrap().kind {
            MatcherEventKind::Reduce { size, .. } => assert_eq!(size, 500),
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(book.get_l2_market_data_snapshot(10).ask_prices.is_empty());
    }

    #[test]
    fn move_beyond_reserve_bid_price_is_rejected() {
        let mut book = NaiveOrderBook::new(1);
        let mut cmd = OrderCommand::new(OrderCommandType::PlaceOrder);
        cmd.order_id = 1;
        cmd.uid = 100;
        cmd.action = OrderAction::Bid;
        cmd.order_type = OrderType::Gtc;
        cmd.price = 18_000;
        cmd.reserve_bid_price = 18_500;
        cmd.size = 500;
        book.process_order_command(&mut cmd);

        let mut mv = OrderCommand::new(OrderCommandType::MoveOrder);
        mv.order_id = 1;
        mv.uid = 100;
        mv.price = 18_501;
        book.process_order_command(&mut mv);
        assert_eq!(
            mv.result_code,
            CommandResultCode::MatchingMoveFailedPriceOverRiskLimit
        );

        let mut mv_ok = OrderCommand::new(OrderCommandType::MoveOrder);
        mv_ok.order_id = 1;
        mv_ok.uid = 100;
        mv_ok.price = 18_500;
        book.process_order_command(&mut mv_ok);
        assert_eq!(mv_ok.result_code, CommandResultCode::Success);
    }
}
