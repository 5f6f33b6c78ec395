//! `ExchangeConfiguration` and its sub-configs (§6 "Configuration").
//!
//! Plain, serde-derived structs mirroring the C++ original's
//! `ExchangeConfiguration`/`PerformanceConfiguration`/
//! `OrdersProcessingConfiguration`, with `Default` impls carrying the
//! literal defaults §6 names. Loaded from JSON/TOML the way the teacher
//! derives `Serialize`/`Deserialize` on `FeeSchedule` and snapshots.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::risk::{MarginTradingMode, RiskProcessingMode};

/// Interchangeable consumer wait strategies (§4.1, §6 `waitStrategy`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaitStrategyKind {
    /// Lowest latency, highest CPU.
    BusySpin,
    /// Bounded spin then cooperative yield.
    Yielding,
    /// Condition-variable wakeups.
    Blocking,
}

impl Default for WaitStrategyKind {
    fn default() -> Self {
        WaitStrategyKind::BusySpin
    }
}

impl WaitStrategyKind {
    /// Build the concrete strategy this kind names.
    #[must_use]
    pub fn build(self) -> crate::ring::AnyWaitStrategy {
        match self {
            WaitStrategyKind::BusySpin => {
                crate::ring::AnyWaitStrategy::BusySpin(crate::ring::BusySpinWaitStrategy)
            }
            WaitStrategyKind::Yielding => {
                crate::ring::AnyWaitStrategy::Yielding(crate::ring::YieldingWaitStrategy::new())
            }
            WaitStrategyKind::Blocking => {
                crate::ring::AnyWaitStrategy::Blocking(crate::ring::BlockingWaitStrategy::new())
            }
        }
    }
}

/// Sizing and timing knobs for the ring buffer fabric and its grouping
/// stage (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfiguration {
    /// Power of two; typical 2048 ... 131072.
    pub ring_buffer_size: usize,
    /// Number of matching-engine shards (>= 1).
    pub matching_engines_num: u32,
    /// Number of risk-engine shards (power of two).
    pub risk_engines_num: u32,
    /// Consumer wait strategy for every stage.
    pub wait_strategy: WaitStrategyKind,
    /// Max commands per `eventsGroup` (must be `<= ring_buffer_size / 4`).
    pub msgs_in_group_limit: i64,
    /// Max wall-clock duration of a group before it is force-closed.
    pub max_group_duration_ns: i64,
    /// Cadence of the grouping stage's L2 market-data heartbeat.
    pub l2_publish_interval_ns: i64,
    /// Max price levels per side attached to an `ORDER_BOOK_REQUEST` /
    /// heartbeat L2 snapshot.
    pub l2_refresh_depth: usize,
}

impl Default for PerformanceConfiguration {
    fn default() -> Self {
        Self {
            ring_buffer_size: 65536,
            matching_engines_num: 1,
            risk_engines_num: 1,
            wait_strategy: WaitStrategyKind::BusySpin,
            msgs_in_group_limit: 4096,
            max_group_duration_ns: 10_000_000,
            l2_publish_interval_ns: 10_000_000,
            l2_refresh_depth: 8,
        }
    }
}

impl PerformanceConfiguration {
    /// Validate the cross-field invariants §6/§4.4 require.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ring_buffer_size == 0 || !self.ring_buffer_size.is_power_of_two() {
            return Err(ConfigError::RingSizeNotPowerOfTwo(self.ring_buffer_size as i64));
        }
        if self.risk_engines_num == 0 || !self.risk_engines_num.is_power_of_two() {
            return Err(ConfigError::RiskShardsNotPowerOfTwo(self.risk_engines_num as i64));
        }
        if self.matching_engines_num == 0 {
            return Err(ConfigError::NoMatchingEngines);
        }
        if !self.matching_engines_num.is_power_of_two() {
            return Err(ConfigError::MatchingShardsNotPowerOfTwo(self.matching_engines_num as i64));
        }
        let max = self.ring_buffer_size as i64 / 4;
        if self.msgs_in_group_limit > max {
            return Err(ConfigError::GroupLimitTooLarge {
                limit: self.msgs_in_group_limit,
                max,
            });
        }
        Ok(())
    }

    /// `(numShards - 1)`, the low-order mask used to shard both users
    /// (risk) and symbols (matching) (§3 "sharding key").
    #[must_use]
    pub fn risk_shard_mask(&self) -> u32 {
        self.risk_engines_num - 1
    }

    /// `(numShards - 1)` for the matching-engine side of the same sharding
    /// key (§3 "sharding key").
    #[must_use]
    pub fn matching_shard_mask(&self) -> u32 {
        self.matching_engines_num - 1
    }
}

/// Which risk/margin behaviors are active (§6 `riskProcessingMode`,
/// `marginTradingMode`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OrdersProcessingConfiguration {
    pub risk_processing_mode: RiskProcessingMode,
    pub margin_trading_mode: MarginTradingMode,
}

impl Default for OrdersProcessingConfiguration {
    fn default() -> Self {
        Self {
            risk_processing_mode: RiskProcessingMode::Full,
            margin_trading_mode: MarginTradingMode::Disabled,
        }
    }
}

/// Journaling/snapshot knobs (§4.9, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalConfiguration {
    pub enabled: bool,
    pub folder: std::path::PathBuf,
    pub exchange_id: String,
    pub journal_buffer_size: usize,
    pub journal_buffer_flush_trigger: usize,
    pub journal_batch_compress_threshold: usize,
    pub journal_file_max_size: u64,
}

impl Default for JournalConfiguration {
    fn default() -> Self {
        Self {
            enabled: false,
            folder: std::path::PathBuf::from("./journal"),
            exchange_id: "EC".to_string(),
            journal_buffer_size: 1 << 20,
            journal_buffer_flush_trigger: 1 << 16,
            journal_batch_compress_threshold: 2048,
            journal_file_max_size: 1 << 30,
        }
    }
}

/// Top-level exchange configuration (§6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExchangeConfiguration {
    pub performance: PerformanceConfiguration,
    pub orders_processing: OrdersProcessingConfiguration,
    pub journal: JournalConfiguration,
}

impl ExchangeConfiguration {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.performance.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_configuration_validates() {
        assert!(ExchangeConfiguration::default().validate().is_ok());
    }

    #[test]
    fn rejects_group_limit_over_quarter_ring() {
        let mut cfg = PerformanceConfiguration::default();
        cfg.ring_buffer_size = 1024;
        cfg.msgs_in_group_limit = 1024;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::GroupLimitTooLarge { .. })
        ));
    }

    #[test]
    fn rejects_non_power_of_two_ring_size() {
        let mut cfg = PerformanceConfiguration::default();
        cfg.ring_buffer_size = 100;
        assert!(matches!(cfg.validate(), Err(ConfigError::RingSizeNotPowerOfTwo(100))));
    }
}
