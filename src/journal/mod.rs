//! Durability: journal record framing, the append-only writer/reader pair,
//! per-shard snapshots, and replay orchestration (§4.9).
//!
//! Gated behind the `journal` feature (enabled by default), since it's the
//! only part of the crate that touches disk or pulls in LZ4 compression.

mod reader;
mod record;
mod replay;
mod snapshot;
mod writer;

pub use reader::{parse_journal_bytes, read_journal_file};
pub use record::{JournalRecord, decode_record, encode_record};
pub use replay::{discover_partitions, replay_commands};
pub use snapshot::{ShardKind, read_snapshot, snapshot_path, write_snapshot};
pub use writer::{JournalWriter, append_main_index};
