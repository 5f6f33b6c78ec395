//! Reads a `.ecj` journal partition back into an ordered stream of
//! [`JournalRecord`]s, transparently expanding `RESERVED_COMPRESSED`
//! blocks (§4.9 "Write path", "Replay").

use std::fs;
use std::path::Path;

use crate::error::JournalError;

use super::record::{JournalRecord, decode_record};

const RESERVED_COMPRESSED: u8 = 99;

/// Parse every record in `bytes`, a raw (uncompressed) concatenation of
/// records with no nested compression.
fn parse_raw(bytes: &[u8]) -> Result<Vec<JournalRecord>, JournalError> {
    let mut records = Vec::new();
    let mut offset = 0usize;
    while offset < bytes.len() {
        if bytes[offset] == RESERVED_COMPRESSED {
            return Err(JournalError::NestedCompression);
        }
        let (record, consumed) = decode_record(&bytes[offset..])?;
        offset += consumed;
        records.push(record);
    }
    Ok(records)
}

/// Parse a top-level journal byte stream: a sequence of raw-record runs
/// and `RESERVED_COMPRESSED` blocks (§4.9 "one level of nesting only;
/// nested compression is rejected").
pub fn parse_journal_bytes(bytes: &[u8]) -> Result<Vec<JournalRecord>, JournalError> {
    let mut records = Vec::new();
    let mut offset = 0usize;
    while offset < bytes.len() {
        if bytes[offset] == RESERVED_COMPRESSED {
            if offset + 9 > bytes.len() {
                return Err(JournalError::Truncated { offset });
            }
            let compressed_size =
                i32::from_le_bytes(bytes[offset + 1..offset + 5].try_into().unwrap()) as usize;
            let original_size =
                i32::from_le_bytes(bytes[offset + 5..offset + 9].try_into().unwrap()) as usize;
            let body_start = offset + 9;
            let body_end = body_start + compressed_size;
            if body_end > bytes.len() {
                return Err(JournalError::Truncated { offset });
            }
            let decompressed = lz4_flex::block::decompress(&bytes[body_start..body_end], original_size)
                .map_err(|e| JournalError::Compression(e.to_string()))?;
            records.extend(parse_raw(&decompressed)?);
            offset = body_end;
        } else {
            // Scan forward to the next RESERVED_COMPRESSED marker (or EOF)
            // and parse that whole span as one raw run. A raw run can
            // never legitimately contain byte 99 as a type tag (the
            // sentinel value is reserved and never emitted live), so the
            // first occurrence is always a genuine block boundary.
            let mut end = offset;
            while end < bytes.len() && bytes[end] != RESERVED_COMPRESSED {
                let (_, consumed) = decode_record(&bytes[end..])?;
                end += consumed;
            }
            records.extend(parse_raw(&bytes[offset..end])?);
            offset = end;
        }
    }
    Ok(records)
}

/// Read and parse an entire `.ecj` file.
pub fn read_journal_file(path: impl AsRef<Path>) -> Result<Vec<JournalRecord>, JournalError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| JournalError::Io {
        message: e.to_string(),
        path: Some(path.to_path_buf()),
    })?;
    parse_journal_bytes(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::writer::JournalWriter;
    use crate::model::{OrderAction, OrderCommand, OrderCommandType, OrderType};
    use tempfile::tempdir;

    #[test]
    fn reads_back_mixed_raw_and_compressed_flushes() {
        let dir = tempdir().unwrap();
        let mut writer = JournalWriter::create(dir.path(), "EC", 0, 64, 1 << 20).unwrap();

        let mut cancel = OrderCommand::new(OrderCommandType::CancelOrder);
        cancel.order_id = 1;
        writer.append(1, &cancel);
        writer.flush().unwrap(); // small, stays raw

        for i in 0..20 {
            let mut place = OrderCommand::new(OrderCommandType::PlaceOrder);
            place.order_id = i;
            place.action = OrderAction::Bid;
            place.order_type = OrderType::Gtc;
            place.size = 10;
            place.price = 100 + i;
            writer.append(2 + i as i64, &place);
        }
        writer.flush().unwrap(); // large, compresses

        let records = read_journal_file(writer.file_path()).unwrap();
        assert_eq!(records.len(), 21);
        assert_eq!(records[0].seq, 1);
        assert_eq!(records[0].command.command, OrderCommandType::CancelOrder);
        assert_eq!(records[20].seq, 21);
        assert_eq!(records[20].command.command, OrderCommandType::PlaceOrder);
    }
}
