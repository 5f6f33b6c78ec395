//! Multi-frame binary batch command assembly (§4.8).
//!
//! Large commands are serialized to JSON, LZ4-block-compressed, and
//! transmitted as a contiguous run of `BINARY_DATA_COMMAND`/
//! `BINARY_DATA_QUERY` ring events, five `i64` words per frame packed into
//! the fields a regular order command doesn't need for this command type
//! (`order_id`, `price`, `reserve_bid_price`, `size`, `timestamp`). The
//! terminating frame carries `symbol == -1` (§3, §4.8).
use std::collections::HashMap;

use crate::error::BinaryCommandError;
use crate::model::{OrderAction, OrderCommand, OrderCommandType, OrderType};

use super::commands::BinaryCommand;

const WORDS_PER_FRAME: usize = 5;
const BYTES_PER_WORD: usize = 8;

fn frame_words(cmd: &OrderCommand) -> [i64; WORDS_PER_FRAME] {
    [
        cmd.order_id,
        cmd.price,
        cmd.reserve_bid_price,
        cmd.size,
        cmd.timestamp,
    ]
}

/// Accumulates frames per `userCookie` (transferId) and decodes the
/// completed payload on the terminal frame. One instance lives on each
/// risk shard and each matching shard (§4.8: "one per risk shard, one per
/// matching shard").
#[derive(Debug, Default)]
pub struct BinaryCommandsProcessor {
    pending: HashMap<i64, Vec<u8>>,
}

impl BinaryCommandsProcessor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one frame. Returns `Ok(Some(command))` once `cmd.symbol == -1`
    /// completes the sequence for its `transferId`, `Ok(None)` for every
    /// non-terminal frame.
    pub fn accept_frame(
        &mut self,
        cmd: &OrderCommand,
    ) -> Result<Option<BinaryCommand>, BinaryCommandError> {
        let transfer_id = cmd.user_cookie;
        let buf = self.pending.entry(transfer_id).or_default();
        for word in frame_words(cmd) {
            buf.extend_from_slice(&word.to_le_bytes());
        }

        if cmd.symbol != -1 {
            return Ok(None);
        }

        let assembled = self
            .pending
            .remove(&transfer_id)
            .ok_or(BinaryCommandError::TruncatedSequence { transfer_id })?;
        let decompressed = lz4_flex::block::decompress_size_prepended(&assembled)
            .map_err(|e| BinaryCommandError::Decompress(e.to_string()))?;
        let decoded: BinaryCommand = serde_json::from_slice(&decompressed)
            .map_err(|e| BinaryCommandError::Deserialize(e.to_string()))?;
        Ok(Some(decoded))
    }

    /// Drop any partially-assembled sequence, e.g. on `RESET` (§4.9).
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

/// Encode `command` as the frame sequence a producer would publish for
/// `transfer_id` (the inverse of [`BinaryCommandsProcessor::accept_frame`]),
/// used by tests and by thin submission wrappers (§1 "out of scope" for
/// the fabric itself, but needed to exercise it end-to-end).
pub fn encode_frames(
    transfer_id: i64,
    command_type: OrderCommandType,
    command: &BinaryCommand,
) -> Result<Vec<OrderCommand>, BinaryCommandError> {
    let json = serde_json::to_vec(command).map_err(|e| BinaryCommandError::Deserialize(e.to_string()))?;
    let compressed = lz4_flex::block::compress_prepend_size(&json);

    let frame_bytes = WORDS_PER_FRAME * BYTES_PER_WORD;
    let mut frames = Vec::with_capacity(compressed.len().div_ceil(frame_bytes) + 1);
    let mut offset = 0;
    while offset < compressed.len() || frames.is_empty() {
        let end = (offset + frame_bytes).min(compressed.len());
        let mut chunk = [0u8; 40];
        chunk[..end - offset].copy_from_slice(&compressed[offset..end]);
        let mut words = [0i64; WORDS_PER_FRAME];
        for (i, w) in words.iter_mut().enumerate() {
            let start = i * BYTES_PER_WORD;
            *w = i64::from_le_bytes(chunk[start..start + BYTES_PER_WORD].try_into().unwrap());
        }
        let mut cmd = OrderCommand::new(command_type);
        cmd.user_cookie = transfer_id;
        cmd.symbol = 0;
        cmd.action = OrderAction::Ask;
        cmd.order_type = OrderType::Gtc;
        cmd.order_id = words[0];
        cmd.price = words[1];
        cmd.reserve_bid_price = words[2];
        cmd.size = words[3];
        cmd.timestamp = words[4];
        frames.push(cmd);
        offset = end;
        if offset >= compressed.len() {
            break;
        }
    }
    if let Some(last) = frames.last_mut() {
        last.symbol = -1;
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::commands::AccountSeed;

    #[test]
    fn round_trips_a_small_payload() {
        let payload = BinaryCommand::AddAccounts(vec![AccountSeed {
            uid: 1,
            currency: 2,
            amount: 1000,
        }]);
        let frames = encode_frames(42, OrderCommandType::BinaryDataCommand, &payload).unwrap();
        assert!(frames.last().unwrap().symbol == -1);

        let mut processor = BinaryCommandsProcessor::new();
        let mut decoded = None;
        for frame in &frames {
            if let Some(d) = processor.accept_frame(frame).unwrap() {
                decoded = Some(d);
            }
        }
        match decoded.unwrap() {
            BinaryCommand::AddAccounts(seeds) => {
                assert_eq!(seeds.len(), 1);
                assert_eq!(seeds[0].amount, 1000);
            }
            _ => panic!("wrong variant"),
        }
    }
}
