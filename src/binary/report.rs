//! Report-query fragment reduction (§4.8: "Report queries return one
//! fragment per shard; the requesting API call collects fragments across
//! shards and merges them in a single-shard thread").

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A binary report query response, produced once per shard and reduced
/// into a single answer by the caller. Implementors describe how their own
/// per-shard fragments combine (summation for balance maps, concatenation
/// for listings, ...).
pub trait ReportQuery: Sized {
    /// Combine this shard's fragment with `other`'s, consuming both.
    #[must_use]
    fn reduce(self, other: Self) -> Self;
}

/// Reduce a non-empty list of per-shard fragments into one report.
///
/// # Panics
/// If `fragments` is empty — every shard always contributes a fragment
/// (possibly empty), so a genuinely empty list indicates a caller bug.
pub fn reduce_fragments<R: ReportQuery>(mut fragments: Vec<R>) -> R {
    let mut acc = fragments.remove(0);
    for fragment in fragments {
        acc = acc.reduce(fragment);
    }
    acc
}

/// `totalBalanceReport()` fragment (§8 "conservation of funds" test hook):
/// per-currency sums of account balances, order holds, suspended funds,
/// fees, and deposit/withdrawal adjustments, contributed by one risk
/// shard.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TotalBalanceReport {
    pub account_balances: HashMap<i32, i64>,
    pub order_balances: HashMap<i32, i64>,
    pub suspends: HashMap<i32, i64>,
    pub fees: HashMap<i32, i64>,
    pub adjustments: HashMap<i32, i64>,
}

fn merge_into(target: &mut HashMap<i32, i64>, other: HashMap<i32, i64>) {
    for (k, v) in other {
        *target.entry(k).or_insert(0) += v;
    }
}

impl ReportQuery for TotalBalanceReport {
    fn reduce(mut self, other: Self) -> Self {
        merge_into(&mut self.account_balances, other.account_balances);
        merge_into(&mut self.order_balances, other.order_balances);
        merge_into(&mut self.suspends, other.suspends);
        merge_into(&mut self.fees, other.fees);
        merge_into(&mut self.adjustments, other.adjustments);
        self
    }
}

impl TotalBalanceReport {
    /// `true` if, for every currency seen, `accounts + orders + suspends +
    /// fees + adjustments == 0` — the invariant §8 calls "conservation of
    /// funds" relative to an all-deposits-are-adjustments baseline (every
    /// credited unit of currency must appear as a negative adjustment
    /// entry or be otherwise accounted for).
    #[must_use]
    pub fn is_globally_balanced(&self) -> bool {
        let mut currencies: std::collections::HashSet<i32> = std::collections::HashSet::new();
        currencies.extend(self.account_balances.keys().copied());
        currencies.extend(self.order_balances.keys().copied());
        currencies.extend(self.suspends.keys().copied());
        currencies.extend(self.fees.keys().copied());
        currencies.extend(self.adjustments.keys().copied());

        currencies.into_iter().all(|c| {
            let total = self.account_balances.get(&c).copied().unwrap_or(0)
                + self.order_balances.get(&c).copied().unwrap_or(0)
                + self.suspends.get(&c).copied().unwrap_or(0)
                + self.fees.get(&c).copied().unwrap_or(0)
                - self.adjustments.get(&c).copied().unwrap_or(0);
            total == 0
        })
    }
}
