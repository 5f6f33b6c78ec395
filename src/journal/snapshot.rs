//! Per-shard state snapshots (`.ecs` files): `[int32 originalSize][int32
//! compressedSize]` header followed by the raw LZ4 block body (§4.9
//! "Snapshots").
//!
//! One snapshot file exists per shard instance, named so a replay can find
//! every matching-engine and risk-engine shard's state for a given
//! `snapshotId` without reading the others.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::error::JournalError;

/// Which kind of shard a snapshot file belongs to, matching the `ME`/`RE`
/// instance-naming convention used throughout journaling (§4.9, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShardKind {
    Matching,
    Risk,
}

impl ShardKind {
    fn tag(self) -> &'static str {
        match self {
            ShardKind::Matching => "ME",
            ShardKind::Risk => "RE",
        }
    }
}

fn snapshot_file_name(exchange_id: &str, snapshot_id: u64, kind: ShardKind, instance: u32) -> String {
    format!(
        "{exchange_id}_snapshot_{snapshot_id}_{tag}{instance}.ecs",
        tag = kind.tag()
    )
}

/// Path a snapshot for `(kind, instance)` at `snapshot_id` would live at,
/// without requiring it to exist yet.
#[must_use]
pub fn snapshot_path(
    folder: impl AsRef<Path>,
    exchange_id: &str,
    snapshot_id: u64,
    kind: ShardKind,
    instance: u32,
) -> PathBuf {
    folder
        .as_ref()
        .join(snapshot_file_name(exchange_id, snapshot_id, kind, instance))
}

/// Serialize `state` (any shard's `serde`-compatible state struct) to JSON,
/// LZ4-block-compress it, and write the framed `.ecs` file.
pub fn write_snapshot<T: serde::Serialize>(
    folder: impl AsRef<Path>,
    exchange_id: &str,
    snapshot_id: u64,
    kind: ShardKind,
    instance: u32,
    state: &T,
) -> Result<PathBuf, JournalError> {
    let folder = folder.as_ref();
    fs::create_dir_all(folder)?;
    let path = snapshot_path(folder, exchange_id, snapshot_id, kind, instance);

    let original = serde_json::to_vec(state).map_err(|e| JournalError::Compression(e.to_string()))?;
    let compressed = lz4_flex::block::compress(&original);

    let mut file = File::create(&path).map_err(|e| JournalError::Io {
        message: e.to_string(),
        path: Some(path.clone()),
    })?;
    file.write_all(&(original.len() as i32).to_le_bytes())?;
    file.write_all(&(compressed.len() as i32).to_le_bytes())?;
    file.write_all(&compressed)?;
    file.flush()?;
    Ok(path)
}

/// Read and decompress a `.ecs` snapshot file, deserializing its JSON body
/// into `T`. Rejects a header whose declared sizes don't fit the file.
pub fn read_snapshot<T: serde::de::DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, JournalError> {
    let path = path.as_ref();
    let mut file = File::open(path).map_err(|e| JournalError::Io {
        message: e.to_string(),
        path: Some(path.to_path_buf()),
    })?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;

    if bytes.len() < 8 {
        return Err(JournalError::MalformedSnapshot(path.to_path_buf()));
    }
    let original_size = i32::from_le_bytes(bytes[0..4].try_into().unwrap()) as usize;
    let compressed_size = i32::from_le_bytes(bytes[4..8].try_into().unwrap()) as usize;
    let body = &bytes[8..];
    if body.len() != compressed_size {
        return Err(JournalError::MalformedSnapshot(path.to_path_buf()));
    }
    let original = lz4_flex::block::decompress(body, original_size)
        .map_err(|e| JournalError::Compression(e.to_string()))?;
    serde_json::from_slice(&original).map_err(|e| JournalError::Compression(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use tempfile::tempdir;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Dummy {
        value: i64,
        tags: Vec<String>,
    }

    #[test]
    fn round_trips_through_compression() {
        let dir = tempdir().unwrap();
        let state = Dummy {
            value: 42,
            tags: vec!["a".into(), "b".into()],
        };
        let path = write_snapshot(dir.path(), "EC", 7, ShardKind::Matching, 0, &state).unwrap();
        assert!(path.ends_with("EC_snapshot_7_ME0.ecs"));
        let restored: Dummy = read_snapshot(&path).unwrap();
        assert_eq!(restored, state);
    }

    #[test]
    fn malformed_header_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.ecs");
        fs::write(&path, [1, 2, 3]).unwrap();
        let result: Result<Dummy, _> = read_snapshot(&path);
        assert!(matches!(result, Err(JournalError::MalformedSnapshot(_))));
    }
}
