//! Binary batch command assembly and report-query fragment reduction
//! (§4.8).

mod commands;
mod processor;
mod report;

pub use commands::{AccountSeed, BinaryCommand, synthetic_funding_transfer_id};
pub use processor::{BinaryCommandsProcessor, encode_frames};
pub use report::{ReportQuery, TotalBalanceReport, reduce_fragments};
