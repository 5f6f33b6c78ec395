//! Crate-wide error types for fabric (structural) failures.
//!
//! Per-command logical failures never surface as `Result::Err` — they are
//! reported via `OrderCommand::result_code` (see [`crate::model::result_code`]).
//! This module covers the other axis: malformed binary batches, corrupt
//! journal records, impossible ring-buffer claims, and the like.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the ring buffer / sequencer fabric.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RingBufferError {
    /// The requested claim would exceed the buffer's capacity even after
    /// waiting for every gating sequence to advance.
    #[error("insufficient ring buffer capacity for a claim of {requested} slots")]
    InsufficientCapacity {
        /// Number of slots requested.
        requested: i64,
    },

    /// A consumer observed the alert (shutdown) state on its barrier.
    #[error("sequence barrier alerted")]
    Alerted,

    /// `ringBufferSize` was not a power of two.
    #[error("ring buffer size {0} is not a power of two")]
    NotPowerOfTwo(i64),
}

/// Errors surfaced by the binary command batching subsystem.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BinaryCommandError {
    /// A frame sequence ended without the terminating `symbol == -1` marker.
    #[error("binary frame sequence for transferId {transfer_id} truncated")]
    TruncatedSequence {
        /// The `userCookie` correlating the frame sequence.
        transfer_id: i64,
    },

    /// Nested compression: a compressed block itself contained another
    /// `RESERVED_COMPRESSED` sentinel.
    #[error("nested compression is not supported")]
    NestedCompression,

    /// LZ4 decompression failed or produced an unexpected size.
    #[error("failed to decompress binary payload: {0}")]
    Decompress(String),

    /// Deserializing the assembled payload into a known command failed.
    #[error("failed to deserialize binary command: {0}")]
    Deserialize(String),
}

/// Errors surfaced by the journaling / snapshot subsystem.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum JournalError {
    /// An I/O error occurred while reading or writing journal/snapshot files.
    #[error("journal I/O error at {path:?}: {message}")]
    Io {
        /// The underlying I/O error message.
        message: String,
        /// The file path involved, if known.
        path: Option<PathBuf>,
    },

    /// A compressed record contained a nested `RESERVED_COMPRESSED` sentinel.
    #[error("nested compression is rejected")]
    NestedCompression,

    /// A record's declared length ran past the end of the buffer.
    #[error("truncated journal record at offset {offset}")]
    Truncated {
        /// Byte offset within the segment where the error occurred.
        offset: usize,
    },

    /// A record's trailing CRC32 did not match its decoded bytes.
    #[error("corrupt journal record for seq {seq}: expected crc {expected:#010x}, got {actual:#010x}")]
    CorruptEntry {
        /// The record's sequence number, if it could be read before the
        /// mismatch was detected.
        seq: i64,
        /// The CRC32 stored in the trailer.
        expected: u32,
        /// The CRC32 computed over the decoded record bytes.
        actual: u32,
    },

    /// LZ4 (de)compression failed.
    #[error("compression error: {0}")]
    Compression(String),

    /// The replayed sequence was not strictly increasing.
    #[error("non-monotonic sequence during replay: expected > {expected}, got {actual}")]
    SequenceRegression {
        /// The last sequence replayed.
        expected: i64,
        /// The sequence found in the next record.
        actual: i64,
    },

    /// A snapshot file's on-disk header was malformed.
    #[error("malformed snapshot header in {0:?}")]
    MalformedSnapshot(PathBuf),
}

impl From<std::io::Error> for JournalError {
    fn from(err: std::io::Error) -> Self {
        JournalError::Io {
            message: err.to_string(),
            path: None,
        }
    }
}

/// Errors surfaced when loading an [`crate::config::ExchangeConfiguration`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// `msgsInGroupLimit` exceeded `ringBufferSize / 4`.
    #[error("msgsInGroupLimit ({limit}) must be <= ringBufferSize/4 ({max})")]
    GroupLimitTooLarge {
        /// Configured limit.
        limit: i64,
        /// Maximum allowed (`ringBufferSize / 4`).
        max: i64,
    },

    /// `ringBufferSize` was not a power of two.
    #[error("ringBufferSize {0} is not a power of two")]
    RingSizeNotPowerOfTwo(i64),

    /// `riskEnginesNum` was not a power of two.
    #[error("riskEnginesNum {0} is not a power of two")]
    RiskShardsNotPowerOfTwo(i64),

    /// `matchingEnginesNum` was zero.
    #[error("matchingEnginesNum must be >= 1")]
    NoMatchingEngines,

    /// `matchingEnginesNum` was not a power of two (required for the
    /// symbol-sharding mask, §3 "sharding key").
    #[error("matchingEnginesNum {0} is not a power of two")]
    MatchingShardsNotPowerOfTwo(i64),
}

/// Top-level error type returned by the fabric's exception handler boundary.
///
/// Any of these cause a `SHUTDOWN_SIGNAL` to be published and a graceful
/// drain to begin (§4.3, §7).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExchangeCoreError {
    /// Ring buffer / sequencer failure.
    #[error(transparent)]
    Ring(#[from] RingBufferError),

    /// Binary command assembly failure.
    #[error(transparent)]
    Binary(#[from] BinaryCommandError),

    /// Journaling / snapshot failure.
    #[error(transparent)]
    Journal(#[from] JournalError),

    /// Configuration failure.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Shutdown did not complete within the configured timeout.
    #[error("shutdown timed out after {0:?}")]
    ShutdownTimeout(std::time::Duration),
}
