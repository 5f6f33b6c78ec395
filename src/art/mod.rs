//! Adaptive radix tree keyed on 8-byte integers (§3, §4.6).
//!
//! Not a generic container library — implemented only to the depth the
//! direct matching engine needs: ordered `u64 -> V` storage with O(log₂₅₆N)
//! insert/remove/nearest-key, used for the price→bucket and
//! order-id→order indices.

mod map;
mod node;

pub use map::LongAdaptiveRadixMap;
