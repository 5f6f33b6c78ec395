//! Claim/publish throughput for the ring buffer fabric, single producer
//! against a lagging consumer sequence — the baseline every staged
//! processor sits on top of (§4.1, §4.2).

use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use exchange_core::ring::{AnyWaitStrategy, BusySpinWaitStrategy, RingBuffer, Sequence};

fn claim_publish_round_trip(c: &mut Criterion) {
    let ring = Arc::new(RingBuffer::new(1 << 16, || 0i64).unwrap());
    let consumer_sequence = Arc::new(Sequence::initial());
    ring.add_gating_sequence(consumer_sequence.clone());
    let wait_strategy = AnyWaitStrategy::BusySpin(BusySpinWaitStrategy);

    c.bench_function("ring_buffer_claim_publish_single", |b| {
        b.iter(|| {
            let seq = ring.next_one();
            *ring.get_mut(seq) = black_box(seq);
            ring.publish(seq, seq, &wait_strategy);
            consumer_sequence.set(seq);
        });
    });

    c.bench_function("ring_buffer_claim_publish_batch_64", |b| {
        b.iter(|| {
            let (lo, hi) = ring.next(64);
            for seq in lo..=hi {
                *ring.get_mut(seq) = black_box(seq);
            }
            ring.publish(lo, hi, &wait_strategy);
            consumer_sequence.set(hi);
        });
    });
}

criterion_group!(benches, claim_publish_round_trip);
criterion_main!(benches);
