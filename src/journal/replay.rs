//! Replay orchestration: discover a snapshot's journal partitions, read
//! them back in sequence order, and hand each record to a caller-supplied
//! handler (§4.9 "Replay").
//!
//! Deliberately state-agnostic: the journal module only knows how to frame
//! and sequence records. What a replayed [`JournalRecord`] *does* to a
//! matching or risk shard is the pipeline's concern, not this module's.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::JournalError;

use super::reader::read_journal_file;
use super::record::JournalRecord;

/// Find every `.ecj` partition file for `(exchange_id, snapshot_id)`, sorted
/// by partition number (the `_NNNN.ecj` suffix in hex, see
/// [`super::writer::journal_file_name`]).
pub fn discover_partitions(
    folder: impl AsRef<Path>,
    exchange_id: &str,
    snapshot_id: u64,
) -> Result<Vec<PathBuf>, JournalError> {
    let folder = folder.as_ref();
    let prefix = format!("{exchange_id}_journal_{snapshot_id}_");
    let mut partitions: Vec<(u32, PathBuf)> = Vec::new();

    let entries = match fs::read_dir(folder) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let Some(rest) = name.strip_prefix(&prefix) else {
            continue;
        };
        let Some(hex) = rest.strip_suffix(".ecj") else {
            continue;
        };
        let Ok(partition) = u32::from_str_radix(hex, 16) else {
            continue;
        };
        partitions.push((partition, entry.path()));
    }
    partitions.sort_by_key(|(p, _)| *p);
    Ok(partitions.into_iter().map(|(_, path)| path).collect())
}

/// Replay every record across `(exchange_id, snapshot_id)`'s partitions, in
/// file order then in-file order, invoking `handler` for each.
///
/// Sequence numbers must never decrease or repeat across the whole replay;
/// a regression is a corrupt journal and aborts replay
/// ([`JournalError::SequenceRegression`]). A gap (a jump forward larger
/// than 1) is tolerated — some commands are never journaled (§4.9
/// "OrderBookRequest", heartbeats) — but logged, since a large gap usually
/// means a missing partition file.
pub fn replay_commands(
    folder: impl AsRef<Path>,
    exchange_id: &str,
    snapshot_id: u64,
    mut handler: impl FnMut(&JournalRecord),
) -> Result<Option<i64>, JournalError> {
    let partitions = discover_partitions(&folder, exchange_id, snapshot_id)?;
    let mut last_seq: Option<i64> = None;

    for partition in partitions {
        let records = read_journal_file(&partition)?;
        for record in &records {
            if let Some(prev) = last_seq {
                if record.seq <= prev {
                    return Err(JournalError::SequenceRegression {
                        expected: prev,
                        actual: record.seq,
                    });
                }
                if record.seq > prev + 1 {
                    warn!(
                        from = prev,
                        to = record.seq,
                        partition = %partition.display(),
                        "gap in journal sequence during replay"
                    );
                }
            }
            last_seq = Some(record.seq);
            handler(record);
        }
    }
    Ok(last_seq)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::writer::JournalWriter;
    use crate::model::{OrderCommand, OrderCommandType};
    use tempfile::tempdir;

    #[test]
    fn replays_across_rotated_partitions_in_order() {
        let dir = tempdir().unwrap();
        let mut writer = JournalWriter::create(dir.path(), "EC", 3, 1 << 20, 64).unwrap();

        for i in 1..=5i64 {
            let mut cmd = OrderCommand::new(OrderCommandType::CancelOrder);
            cmd.order_id = i;
            writer.append(i, &cmd);
            writer.flush().unwrap();
            if i == 2 {
                writer.rotate().unwrap();
            }
        }

        let mut seen = Vec::new();
        let last = replay_commands(dir.path(), "EC", 3, |record| seen.push(record.seq)).unwrap();
        assert_eq!(seen, vec![1, 2, 3, 4, 5]);
        assert_eq!(last, Some(5));
    }

    #[test]
    fn no_partitions_is_not_an_error() {
        let dir = tempdir().unwrap();
        let last = replay_commands(dir.path(), "EC", 0, |_| {}).unwrap();
        assert_eq!(last, None);
    }

    #[test]
    fn regression_is_rejected() {
        let dir = tempdir().unwrap();
        let mut writer = JournalWriter::create(dir.path(), "EC", 0, 1 << 20, 1 << 20).unwrap();
        let mut cmd = OrderCommand::new(OrderCommandType::CancelOrder);
        cmd.order_id = 1;
        writer.append(5, &cmd);
        writer.append(3, &cmd);
        writer.flush().unwrap();

        let result = replay_commands(dir.path(), "EC", 0, |_| {});
        assert!(matches!(result, Err(JournalError::SequenceRegression { .. })));
    }
}
