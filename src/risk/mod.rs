//! The risk engine: per-shard user profiles, balances, futures positions,
//! and the symbol specification table (§3, §4.7).

mod engine;
mod fees;
mod position;
mod symbol_spec;
mod user_profile;

pub use engine::{MarginTradingMode, RiskEngine, RiskProcessingMode};
pub use position::{PositionDirection, SymbolPositionRecord};
pub use symbol_spec::{CoreSymbolSpecification, SymbolSpecificationProvider, SymbolType};
pub use user_profile::{BalanceAdjustmentType, UserProfile};
