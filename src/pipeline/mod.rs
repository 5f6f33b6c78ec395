//! The staged processor graph: grouping, the optional journaling sibling,
//! the two-step risk master/slave pair, and the results handler (§4.3,
//! §4.4, §5).
//!
//! Wiring all of these into one running exchange core is [`crate::api`]'s
//! job; this module only supplies each stage's per-thread run loop.

mod grouping;
#[cfg(feature = "journal")]
mod journal_stage;
mod master_slave;
mod results;

pub use grouping::{GroupingProcessor, GroupingStage};
#[cfg(feature = "journal")]
pub use journal_stage::JournalStage;
pub use master_slave::TwoStepRiskProcessor;
pub use results::{CommandOutcome, ResultsConsumer, ResultsHandler};
