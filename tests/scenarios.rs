//! End-to-end scenarios driving a risk engine and a matching engine shard
//! through the same pre-risk / match / post-risk sequence the pipeline's
//! threads run, single-threaded and without the ring buffer, so each
//! step's result is directly inspectable (spec §8 "End-to-end scenarios
//! with literal inputs").

use exchange_core::binary::{AccountSeed, BinaryCommand, encode_frames};
use exchange_core::matching::{MatchingEngineKind, MatchingEngineShard};
use exchange_core::model::{
    CommandResultCode, MatcherEventKind, OrderAction, OrderCommand, OrderCommandType, OrderType,
};
use exchange_core::risk::{CoreSymbolSpecification, MarginTradingMode, RiskEngine, RiskProcessingMode, SymbolType};

const EUR: i32 = 1;
const USD: i32 = 2;
const EUR_USD: i32 = 1;

fn eur_usd() -> CoreSymbolSpecification {
    CoreSymbolSpecification {
        symbol_id: EUR_USD,
        symbol_type: SymbolType::CurrencyExchangePair,
        base_currency: EUR,
        quote_currency: USD,
        base_scale_k: 100,
        quote_scale_k: 10,
        maker_fee: 0,
        taker_fee: 0,
    }
}

/// Feed one binary batch to both the risk shard and the matching shard,
/// exactly as the production pipeline's risk/matching `BinaryCommandsProcessor`
/// instances each independently re-assemble the same frame stream.
fn install_batch(risk: &mut RiskEngine, shard: &mut MatchingEngineShard, transfer_id: i64, command: &BinaryCommand) {
    let frames = encode_frames(transfer_id, OrderCommandType::BinaryDataCommand, command).unwrap();
    for mut frame in frames {
        risk.pre_process_command(&mut frame);
        shard.process(&mut frame);
    }
}

fn add_user(risk: &mut RiskEngine, uid: i64) {
    let mut cmd = OrderCommand::new(OrderCommandType::AddUser);
    cmd.uid = uid;
    assert_eq!(risk.pre_process_command(&mut cmd), false);
    assert_eq!(cmd.result_code, CommandResultCode::Success);
}

#[allow(clippy::too_many_arguments)]
fn place(
    risk: &mut RiskEngine,
    shard: &mut MatchingEngineShard,
    order_id: i64,
    uid: i64,
    action: OrderAction,
    order_type: OrderType,
    price: i64,
    reserve_bid_price: i64,
    size: i64,
) -> OrderCommand {
    let mut cmd = OrderCommand::new(OrderCommandType::PlaceOrder);
    cmd.order_id = order_id;
    cmd.uid = uid;
    cmd.symbol = EUR_USD;
    cmd.action = action;
    cmd.order_type = order_type;
    cmd.price = price;
    cmd.reserve_bid_price = reserve_bid_price;
    cmd.size = size;
    risk.pre_process_command(&mut cmd);
    shard.process(&mut cmd);
    risk.post_process_command(&cmd);
    cmd
}

fn move_order(risk: &mut RiskEngine, shard: &mut MatchingEngineShard, order_id: i64, uid: i64, new_price: i64) -> OrderCommand {
    let mut cmd = OrderCommand::new(OrderCommandType::MoveOrder);
    cmd.order_id = order_id;
    cmd.uid = uid;
    cmd.symbol = EUR_USD;
    cmd.price = new_price;
    risk.pre_process_command(&mut cmd);
    shard.process(&mut cmd);
    risk.post_process_command(&cmd);
    cmd
}

fn cancel(risk: &mut RiskEngine, shard: &mut MatchingEngineShard, order_id: i64, uid: i64) -> OrderCommand {
    let mut cmd = OrderCommand::new(OrderCommandType::CancelOrder);
    cmd.order_id = order_id;
    cmd.uid = uid;
    cmd.symbol = EUR_USD;
    risk.pre_process_command(&mut cmd);
    shard.process(&mut cmd);
    risk.post_process_command(&cmd);
    cmd
}

fn fresh_shard() -> (RiskEngine, MatchingEngineShard) {
    let mut risk = RiskEngine::new(0, 0, MarginTradingMode::Disabled, RiskProcessingMode::Full);
    let mut shard = MatchingEngineShard::new(0, 0, MatchingEngineKind::Naive);
    install_batch(&mut risk, &mut shard, 1, &BinaryCommand::AddSymbols(vec![eur_usd()]));
    (risk, shard)
}

fn fund(risk: &mut RiskEngine, shard: &mut MatchingEngineShard, transfer_id: i64, uid: i64, currency: i32, amount: i64) {
    install_batch(
        risk,
        shard,
        transfer_id,
        &BinaryCommand::AddAccounts(vec![AccountSeed { uid, currency, amount }]),
    );
}

/// S1 — basic exchange cycle: two resting orders, an IOC partial fill, a
/// second resting bid, then a MOVE that crosses and fully fills it.
#[test]
fn s1_basic_exchange_cycle() {
    let (mut risk, mut shard) = fresh_shard();
    const ALICE: i64 = 1;
    const BOB: i64 = 2;
    add_user(&mut risk, ALICE);
    add_user(&mut risk, BOB);
    fund(&mut risk, &mut shard, 10, ALICE, EUR, 10_000);
    fund(&mut risk, &mut shard, 11, ALICE, USD, 10_000_000);
    fund(&mut risk, &mut shard, 12, BOB, USD, 10_000_000);

    // 1. Alice ASK GTC id=101 price=1600 size=7 -> rests.
    let c1 = place(&mut risk, &mut shard, 101, ALICE, OrderAction::Ask, OrderType::Gtc, 1600, 0, 7);
    assert_eq!(c1.result_code, CommandResultCode::Success);
    assert!(c1.matcher_event.is_none());

    // 2. Alice BID GTC id=102 price=1550 size=4 reserve=1561 -> rests.
    let c2 = place(&mut risk, &mut shard, 102, ALICE, OrderAction::Bid, OrderType::Gtc, 1550, 1561, 4);
    assert_eq!(c2.result_code, CommandResultCode::Success);
    assert!(c2.matcher_event.is_none());

    // 3. Bob BID IOC id=201 price=1700 size=2 reserve=1800 -> one TRADE
    // against maker 101 at 1600.
    let c3 = place(&mut risk, &mut shard, 201, BOB, OrderAction::Bid, OrderType::Ioc, 1700, 1800, 2);
    assert_eq!(c3.result_code, CommandResultCode::Success);
    let event = c3.matcher_event.as_ref().expect("one trade");
    match &event.kind {
        MatcherEventKind::Trade {
            maker_order_id,
            price,
            size,
            maker_completed,
            ..
        } => {
            assert_eq!(*maker_order_id, 101);
            assert_eq!(*price, 1600);
            assert_eq!(*size, 2);
            assert!(!maker_completed, "5 of 7 still resting");
        }
        other => panic!("expected a trade, got {other:?}"),
    }
    assert!(event.next_event.is_none());

    // 4. Bob BID GTC id=202 price=1583 size=4 reserve=1583 -> no match
    // (best ask is still 1600).
    let c4 = place(&mut risk, &mut shard, 202, BOB, OrderAction::Bid, OrderType::Gtc, 1583, 1583, 4);
    assert_eq!(c4.result_code, CommandResultCode::Success);
    assert!(c4.matcher_event.is_none());

    // 5. Alice MOVE id=101 -> 1580 crosses Bob's 202 bid: one TRADE,
    // maker 202 fully filled, 1 of the original 7 (less the IOC's 2 and
    // this fill's 4) still resting at 1580.
    let c5 = move_order(&mut risk, &mut shard, 101, ALICE, 1580);
    assert_eq!(c5.result_code, CommandResultCode::Success);
    let event = c5.matcher_event.as_ref().expect("move crossed and traded");
    match &event.kind {
        MatcherEventKind::Trade {
            maker_order_id,
            price,
            size,
            maker_completed,
            ..
        } => {
            assert_eq!(*maker_order_id, 202);
            assert_eq!(*price, 1583);
            assert_eq!(*size, 4);
            assert!(*maker_completed);
        }
        other => panic!("expected a trade, got {other:?}"),
    }

    let l2 = shard.l2_snapshot(EUR_USD, 8).expect("owned symbol");
    assert_eq!(l2.ask_prices, vec![1580]);
    assert_eq!(l2.ask_volumes, vec![1]);
    assert_eq!(l2.bid_prices, vec![1550]);
    assert_eq!(l2.bid_volumes, vec![4]);

    assert!(risk.total_balance_report().is_globally_balanced());
}

/// S2 — FOK_BUDGET sized exactly at what the book can fill succeeds in
/// full; one minor unit over the achievable notional is rejected outright.
#[test]
fn s2_fok_budget_exact_vs_one_over() {
    // Unit scale factors here so the budget arithmetic below matches the
    // spec's literal prices without a quote/base scaling multiplier.
    let mut risk = RiskEngine::new(0, 0, MarginTradingMode::Disabled, RiskProcessingMode::Full);
    let mut shard = MatchingEngineShard::new(0, 0, MatchingEngineKind::Naive);
    let spec = CoreSymbolSpecification {
        symbol_id: EUR_USD,
        symbol_type: SymbolType::CurrencyExchangePair,
        base_currency: EUR,
        quote_currency: USD,
        base_scale_k: 1,
        quote_scale_k: 1,
        maker_fee: 0,
        taker_fee: 0,
    };
    install_batch(&mut risk, &mut shard, 1, &BinaryCommand::AddSymbols(vec![spec]));

    const ALICE: i64 = 1;
    const BOB: i64 = 2;
    add_user(&mut risk, ALICE);
    add_user(&mut risk, BOB);
    fund(&mut risk, &mut shard, 10, ALICE, EUR, 10_000);
    fund(&mut risk, &mut shard, 11, BOB, USD, 10_000_000_000);

    for (id, price, size) in [(301, 81_599, 75), (302, 81_600, 100), (303, 200_954, 10), (304, 201_000, 60)] {
        let c = place(&mut risk, &mut shard, id, ALICE, OrderAction::Ask, OrderType::Gtc, price, 0, size);
        assert_eq!(c.result_code, CommandResultCode::Success);
    }

    // Achievable at size 180: all of 301 (75) and 302 (100), plus 5 of
    // 303's 10 — three maker fills, leaving 5 resting at 200954.
    let achievable = 81_599 * 75 + 81_600 * 100 + 200_954 * 5;
    let exact = place(&mut risk, &mut shard, 401, BOB, OrderAction::Bid, OrderType::FokBudget, achievable, achievable, 180);
    assert_eq!(exact.result_code, CommandResultCode::Success);
    let trades: Vec<_> = trade_chain(&exact).collect();
    assert_eq!(trades, vec![(301, 81_599, 75), (302, 81_600, 100), (303, 200_954, 5)]);

    let l2 = shard.l2_snapshot(EUR_USD, 8).unwrap();
    let remaining_203 = l2
        .ask_prices
        .iter()
        .position(|&p| p == 200_954)
        .map(|i| l2.ask_volumes[i]);
    assert_eq!(remaining_203, Some(5));

    // A budget one minor unit short of the true cost cannot fill the full
    // size and is rejected outright rather than partially filled.
    let over = place(
        &mut risk,
        &mut shard,
        402,
        BOB,
        OrderAction::Bid,
        OrderType::FokBudget,
        achievable - 1,
        achievable - 1,
        180,
    );
    assert_eq!(over.result_code, CommandResultCode::Success);
    match &over.matcher_event.as_deref().unwrap().kind {
        MatcherEventKind::Reject { size, .. } => assert_eq!(*size, 180),
        other => panic!("expected a reject, got {other:?}"),
    }
}

/// Walks a matcher event chain, yielding `(maker_order_id, price, size)`
/// for every TRADE leg.
fn trade_chain(cmd: &OrderCommand) -> impl Iterator<Item = (i64, i64, i64)> + '_ {
    let mut current = cmd.matcher_event.as_deref();
    std::iter::from_fn(move || loop {
        let event = current?;
        current = event.next_event.as_deref();
        if let MatcherEventKind::Trade {
            maker_order_id, price, size, ..
        } = &event.kind
        {
            return Some((*maker_order_id, *price, *size));
        }
    })
}

/// S3/S4 — a BID's MOVE past its own `reserveBidPrice` is rejected with no
/// balance effect; canceling it afterward refunds the full reserved hold.
#[test]
fn s3_s4_move_over_risk_limit_then_cancel_refunds() {
    let (mut risk, mut shard) = fresh_shard();
    const BOB: i64 = 2;
    add_user(&mut risk, BOB);
    fund(&mut risk, &mut shard, 10, BOB, USD, 10_000_000);

    let placed = place(&mut risk, &mut shard, 203, BOB, OrderAction::Bid, OrderType::Gtc, 18_000, 18_500, 500);
    assert_eq!(placed.result_code, CommandResultCode::Success);
    let balance_after_place = risk.total_balance_report();

    // MOVE to exactly the reserve price succeeds with no trade (no asks
    // resting to cross).
    let ok = move_order(&mut risk, &mut shard, 203, BOB, 18_500);
    assert_eq!(ok.result_code, CommandResultCode::Success);

    // MOVE one tick past the reserve price is rejected; balances unchanged.
    let rejected = move_order(&mut risk, &mut shard, 203, BOB, 18_501);
    assert_eq!(rejected.result_code, CommandResultCode::MatchingMoveFailedPriceOverRiskLimit);
    let balance_after_reject = risk.total_balance_report();
    assert_eq!(
        balance_after_reject.order_balances, balance_after_place.order_balances,
        "a rejected move must not touch holds"
    );

    // Cancel refunds the full reserved hold at bidderHoldPrice=18500.
    let canceled = cancel(&mut risk, &mut shard, 203, BOB);
    assert_eq!(canceled.result_code, CommandResultCode::Success);
    match &canceled.matcher_event.as_deref().unwrap().kind {
        MatcherEventKind::Reduce { size, price } => {
            assert_eq!(*size, 500);
            assert_eq!(*price, 18_500);
        }
        other => panic!("expected a reduce, got {other:?}"),
    }
    assert!(risk.total_balance_report().is_globally_balanced());
}

/// A MOVE that crosses and fully fills settles at the *order's* reserved
/// per-unit rate, not at the MoveOrder command's own (always-default)
/// `reserve_bid_price`/`order_type` fields — exercised here with non-zero
/// maker/taker fees so a wrong rate would leak funds and trip the global
/// balance invariant.
#[test]
fn move_that_crosses_settles_bid_at_the_orders_reserved_rate() {
    let mut risk = RiskEngine::new(0, 0, MarginTradingMode::Disabled, RiskProcessingMode::Full);
    let mut shard = MatchingEngineShard::new(0, 0, MatchingEngineKind::Naive);
    let spec = CoreSymbolSpecification {
        symbol_id: EUR_USD,
        symbol_type: SymbolType::CurrencyExchangePair,
        base_currency: EUR,
        quote_currency: USD,
        base_scale_k: 1,
        quote_scale_k: 1,
        maker_fee: 2,
        taker_fee: 5,
    };
    install_batch(&mut risk, &mut shard, 1, &BinaryCommand::AddSymbols(vec![spec]));

    const ALICE: i64 = 1;
    const BOB: i64 = 2;
    add_user(&mut risk, ALICE);
    add_user(&mut risk, BOB);
    fund(&mut risk, &mut shard, 10, BOB, EUR, 3);
    fund(&mut risk, &mut shard, 11, ALICE, USD, 3_615);

    // Bob rests an ask at 1000; Alice's bid at 900 (reserve 1200) doesn't
    // cross it yet.
    let maker = place(&mut risk, &mut shard, 10, BOB, OrderAction::Ask, OrderType::Gtc, 1_000, 0, 3);
    assert_eq!(maker.result_code, CommandResultCode::Success);
    let taker = place(&mut risk, &mut shard, 20, ALICE, OrderAction::Bid, OrderType::Gtc, 900, 1_200, 3);
    assert_eq!(taker.result_code, CommandResultCode::Success);
    assert!(taker.matcher_event.is_none());

    // Moving Alice's bid up to 1000 crosses Bob's ask and fully fills both.
    let moved = move_order(&mut risk, &mut shard, 20, ALICE, 1_000);
    assert_eq!(moved.result_code, CommandResultCode::Success);
    let event = moved.matcher_event.as_ref().expect("move crossed and traded");
    match &event.kind {
        MatcherEventKind::Trade {
            maker_order_id,
            price,
            size,
            maker_completed,
            ..
        } => {
            assert_eq!(*maker_order_id, 10);
            assert_eq!(*price, 1_000);
            assert_eq!(*size, 3);
            assert!(*maker_completed);
        }
        other => panic!("expected a trade, got {other:?}"),
    }

    let report = risk.total_balance_report();
    assert!(
        report.is_globally_balanced(),
        "settling at the wrong per-unit rate leaks/strands quote currency: {report:?}"
    );
    assert_eq!(
        report.order_balances.get(&USD).copied().unwrap_or(0),
        0,
        "the bid's full reserved hold must be released on a complete fill"
    );
    assert_eq!(report.fees.get(&USD).copied().unwrap_or(0), 3 * 5 + 3 * 2);
}

/// S5 — futures conservation: a matched long/short pair nets to equal
/// open interest on both sides and the books stay balanced.
#[test]
fn s5_futures_conservation() {
    const USD_JPY: i32 = 2;
    const USD2: i32 = 10;
    const JPY: i32 = 11;

    let mut risk = RiskEngine::new(0, 0, MarginTradingMode::Enabled, RiskProcessingMode::Full);
    let mut shard = MatchingEngineShard::new(0, 0, MatchingEngineKind::Naive);
    let spec = CoreSymbolSpecification {
        symbol_id: USD_JPY,
        symbol_type: SymbolType::FuturesContract,
        base_currency: JPY,
        quote_currency: USD2,
        base_scale_k: 1,
        quote_scale_k: 1,
        maker_fee: 0,
        taker_fee: 0,
    };
    install_batch(&mut risk, &mut shard, 1, &BinaryCommand::AddSymbols(vec![spec]));

    const ALICE: i64 = 1;
    const BOB: i64 = 2;
    add_user(&mut risk, ALICE);
    add_user(&mut risk, BOB);
    fund(&mut risk, &mut shard, 10, ALICE, USD2, 100_000_000);
    fund(&mut risk, &mut shard, 11, BOB, USD2, 100_000_000);

    let mut cmd = OrderCommand::new(OrderCommandType::PlaceOrder);
    cmd.order_id = 501;
    cmd.uid = BOB;
    cmd.symbol = USD_JPY;
    cmd.action = OrderAction::Ask;
    cmd.order_type = OrderType::Gtc;
    cmd.price = 10_770;
    cmd.size = 30;
    risk.pre_process_command(&mut cmd);
    shard.process(&mut cmd);
    risk.post_process_command(&cmd);
    assert_eq!(cmd.result_code, CommandResultCode::Success);

    let mut cmd = OrderCommand::new(OrderCommandType::PlaceOrder);
    cmd.order_id = 502;
    cmd.uid = ALICE;
    cmd.symbol = USD_JPY;
    cmd.action = OrderAction::Bid;
    cmd.order_type = OrderType::Gtc;
    cmd.price = 10_770;
    cmd.reserve_bid_price = 10_770;
    cmd.size = 30;
    risk.pre_process_command(&mut cmd);
    shard.process(&mut cmd);
    risk.post_process_command(&cmd);
    assert_eq!(cmd.result_code, CommandResultCode::Success);
    assert!(cmd.matcher_event.is_some(), "should fully match Bob's resting ask");

    let report = risk.total_balance_report();
    assert!(report.is_globally_balanced());
}

/// Placing the same `orderId` twice is rejected, never silently merged.
#[test]
fn duplicate_order_id_is_rejected() {
    let (mut risk, mut shard) = fresh_shard();
    add_user(&mut risk, 1);
    fund(&mut risk, &mut shard, 10, 1, EUR, 10_000);

    let first = place(&mut risk, &mut shard, 900, 1, OrderAction::Ask, OrderType::Gtc, 1000, 0, 5);
    assert_eq!(first.result_code, CommandResultCode::Success);

    let second = place(&mut risk, &mut shard, 900, 1, OrderAction::Ask, OrderType::Gtc, 1000, 0, 5);
    assert_eq!(second.result_code, CommandResultCode::MatchingDuplicateOrderId);
}

/// Placing an order against an unfunded account is rejected by risk before
/// the matching engine ever sees it.
#[test]
fn insufficient_balance_is_rejected_by_risk() {
    let (mut risk, mut shard) = fresh_shard();
    add_user(&mut risk, 1);

    let cmd = place(&mut risk, &mut shard, 1, 1, OrderAction::Ask, OrderType::Gtc, 1000, 0, 5);
    assert_eq!(cmd.result_code, CommandResultCode::RiskNsf);
    assert!(shard.l2_snapshot(EUR_USD, 4).unwrap().ask_prices.is_empty());
}
