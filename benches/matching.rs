//! Place/match throughput for the direct (ART-backed) order book against
//! the naive reference book, at a fixed depth of resting orders (§4.5,
//! §4.6, §9 "naive impl is a conformance oracle, not a production target").

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use exchange_core::matching::{DirectOrderBook, MatchingEngine, NaiveOrderBook};
use exchange_core::model::{OrderAction, OrderCommand, OrderCommandType, OrderType};

const SYMBOL: i32 = 1;
const DEPTH: i64 = 2_000;

fn place_limit(order_id: i64, action: OrderAction, price: i64, size: i64) -> OrderCommand {
    let mut cmd = OrderCommand::new(OrderCommandType::PlaceOrder);
    cmd.order_id = order_id;
    cmd.uid = 1;
    cmd.symbol = SYMBOL;
    cmd.action = action;
    cmd.order_type = OrderType::Gtc;
    cmd.price = price;
    cmd.reserve_bid_price = price;
    cmd.size = size;
    cmd
}

fn seed_asks(depth: i64) -> DirectOrderBook {
    let mut book = DirectOrderBook::new(SYMBOL);
    for i in 0..depth {
        let mut cmd = place_limit(i + 1, OrderAction::Ask, 10_000 + i, 10);
        book.process_order_command(&mut cmd);
    }
    book
}

fn seed_asks_naive(depth: i64) -> NaiveOrderBook {
    let mut book = NaiveOrderBook::new(SYMBOL);
    for i in 0..depth {
        let mut cmd = place_limit(i + 1, OrderAction::Ask, 10_000 + i, 10);
        book.process_order_command(&mut cmd);
    }
    book
}

fn direct_insert_depth(c: &mut Criterion) {
    c.bench_function("direct_book_insert_2000_resting_asks", |b| {
        b.iter(|| {
            let book = seed_asks(black_box(DEPTH));
            black_box(book.state_hash());
        });
    });
}

fn naive_insert_depth(c: &mut Criterion) {
    c.bench_function("naive_book_insert_2000_resting_asks", |b| {
        b.iter(|| {
            let book = seed_asks_naive(black_box(DEPTH));
            black_box(book.state_hash());
        });
    });
}

fn direct_marketable_walk(c: &mut Criterion) {
    c.bench_function("direct_book_ioc_sweep_best_price", |b| {
        b.iter(|| {
            let mut book = seed_asks(DEPTH);
            let mut cmd = place_limit(DEPTH + 1, OrderAction::Bid, 10_000, 10);
            cmd.order_type = OrderType::Ioc;
            book.process_order_command(black_box(&mut cmd));
        });
    });
}

fn direct_cancel_from_depth(c: &mut Criterion) {
    c.bench_function("direct_book_cancel_mid_book", |b| {
        b.iter(|| {
            let mut book = seed_asks(DEPTH);
            let mut cmd = OrderCommand::new(OrderCommandType::CancelOrder);
            cmd.order_id = DEPTH / 2;
            cmd.uid = 1;
            cmd.symbol = SYMBOL;
            book.process_order_command(black_box(&mut cmd));
        });
    });
}

criterion_group!(
    benches,
    direct_insert_depth,
    naive_insert_depth,
    direct_marketable_walk,
    direct_cancel_from_depth
);
criterion_main!(benches);
