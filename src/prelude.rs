/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 2/10/25
******************************************************************************/

//! Prelude module that re-exports commonly used types and traits.
//!
//! ```rust
//! use exchange_core::prelude::*;
//! ```

// Facade: the synchronous, thread-spawning exchange runner.
pub use crate::api::{CommandFuture, ExchangeCore};

// Shared data model.
pub use crate::model::{
    CommandResultCode, MatcherEventKind, MatcherTradeEvent, Order, OrderAction, OrderCommand,
    OrderCommandType, OrderType, maker_action,
};
pub use crate::model::L2MarketData;

// Matching.
pub use crate::matching::{DirectOrderBook, MatchingEngine, MatchingEngineKind, MatchingEngineShard, NaiveOrderBook};

// Risk.
pub use crate::risk::{
    BalanceAdjustmentType, CoreSymbolSpecification, MarginTradingMode, PositionDirection,
    RiskEngine, RiskProcessingMode, SymbolPositionRecord, SymbolSpecificationProvider, SymbolType,
    UserProfile,
};

// Binary batch commands and report queries.
pub use crate::binary::{AccountSeed, BinaryCommand, ReportQuery, TotalBalanceReport};

// Configuration.
pub use crate::config::{
    ExchangeConfiguration, JournalConfiguration, OrdersProcessingConfiguration,
    PerformanceConfiguration, WaitStrategyKind,
};

// Errors.
pub use crate::error::{BinaryCommandError, ConfigError, ExchangeCoreError, JournalError, RingBufferError};

// Ring buffer fabric, for callers assembling a custom pipeline topology.
pub use crate::ring::{
    AlertFlag, AnyWaitStrategy, BlockingWaitStrategy, BusySpinWaitStrategy, Cursored, RingBuffer,
    Sequence, SequenceBarrier, WaitStrategy, YieldingWaitStrategy,
};

#[cfg(feature = "journal")]
pub use crate::journal::{discover_partitions, replay_commands};
