//! Fixed, command-specific binary layout for one journal record (§4.9).
//!
//! Every uncompressed record shares a common header — `[1 byte type][i64
//! seq][i64 timestampNs][i32 serviceFlags][i64 eventsGroup]` — followed by
//! command-specific fields in the fixed order §4.9 lists, and a trailing
//! `[4 bytes CRC32]` covering every byte that precedes it. Little-endian
//! throughout (§6 "File formats").
//!
//! The CRC trailer mirrors the teacher's
//! `orderbook::sequencer::file_journal::FileJournal`, which frames every
//! entry with a `crc32fast::hash` trailer over its header-plus-payload
//! bytes (§7 "corrupt journal block" is a named structural failure this
//! catches).

use crate::error::JournalError;
use crate::model::{OrderAction, OrderCommand, OrderCommandType, OrderType};
use crate::risk::BalanceAdjustmentType;

/// One replayable record: the command plus the sequence/timing metadata
/// the pipeline needs to reproduce it deterministically (§4.9
/// "Determinism").
#[derive(Debug, Clone, PartialEq)]
pub struct JournalRecord {
    pub seq: i64,
    pub command: OrderCommand,
}

fn command_type_code(t: OrderCommandType) -> u8 {
    t as i8 as u8
}

fn command_type_from_code(code: u8) -> Result<OrderCommandType, JournalError> {
    use OrderCommandType::*;
    let signed = code as i8;
    Ok(match signed {
        1 => PlaceOrder,
        2 => MoveOrder,
        3 => CancelOrder,
        4 => ReduceOrder,
        6 => OrderBookRequest,
        10 => AddUser,
        11 => SuspendUser,
        12 => ResumeUser,
        13 => BalanceAdjustment,
        80 => BinaryDataCommand,
        81 => BinaryDataQuery,
        90 => Reset,
        91 => Nop,
        92 => PersistStateMatching,
        93 => PersistStateRisk,
        94 => GroupingControl,
        95 => ShutdownSignal,
        99 => ReservedCompressed,
        _ => return Err(JournalError::Truncated { offset: 0 }),
    })
}

fn pack_action_type(action: OrderAction, order_type: OrderType) -> u8 {
    let a = match action {
        OrderAction::Ask => 0u8,
        OrderAction::Bid => 1u8,
    };
    let t = match order_type {
        OrderType::Gtc => 0u8,
        OrderType::Ioc => 1u8,
        OrderType::FokBudget => 2u8,
    };
    a | (t << 1)
}

fn unpack_action_type(byte: u8) -> (OrderAction, OrderType) {
    let action = if byte & 1 == 0 { OrderAction::Ask } else { OrderAction::Bid };
    let order_type = match (byte >> 1) & 0b11 {
        1 => OrderType::Ioc,
        2 => OrderType::FokBudget,
        _ => OrderType::Gtc,
    };
    (action, order_type)
}

struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    fn new() -> Self {
        Self { buf: Vec::with_capacity(64) }
    }
    fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }
    fn i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }
    fn i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn require(&self, n: usize) -> Result<(), JournalError> {
        if self.pos + n > self.buf.len() {
            Err(JournalError::Truncated { offset: self.pos })
        } else {
            Ok(())
        }
    }

    fn u8(&mut self) -> Result<u8, JournalError> {
        self.require(1)?;
        let v = self.buf[self.pos];
        self.pos += 1;
        Ok(v)
    }

    fn i32(&mut self) -> Result<i32, JournalError> {
        self.require(4)?;
        let v = i32::from_le_bytes(self.buf[self.pos..self.pos + 4].try_into().unwrap());
        self.pos += 4;
        Ok(v)
    }

    fn u32(&mut self) -> Result<u32, JournalError> {
        self.require(4)?;
        let v = u32::from_le_bytes(self.buf[self.pos..self.pos + 4].try_into().unwrap());
        self.pos += 4;
        Ok(v)
    }

    fn i64(&mut self) -> Result<i64, JournalError> {
        self.require(8)?;
        let v = i64::from_le_bytes(self.buf[self.pos..self.pos + 8].try_into().unwrap());
        self.pos += 8;
        Ok(v)
    }
}

/// Encode one command into its journal record bytes (no
/// `RESERVED_COMPRESSED` framing — the writer wraps batches of these in a
/// compressed block separately, §4.9).
#[must_use]
pub fn encode_record(seq: i64, cmd: &OrderCommand) -> Vec<u8> {
    let mut w = Writer::new();
    w.u8(command_type_code(cmd.command));
    w.i64(seq);
    w.i64(cmd.timestamp);
    w.i32(cmd.service_flags);
    w.i64(cmd.events_group);

    match cmd.command {
        OrderCommandType::PlaceOrder => {
            w.i64(cmd.uid);
            w.i32(cmd.symbol);
            w.i64(cmd.order_id);
            w.i64(cmd.price);
            w.i64(cmd.reserve_bid_price);
            w.i64(cmd.size);
            w.i64(cmd.user_cookie);
            w.u8(pack_action_type(cmd.action, cmd.order_type));
        }
        OrderCommandType::CancelOrder => {
            w.i64(cmd.uid);
            w.i32(cmd.symbol);
            w.i64(cmd.order_id);
        }
        OrderCommandType::MoveOrder => {
            w.i64(cmd.uid);
            w.i32(cmd.symbol);
            w.i64(cmd.order_id);
            w.i64(cmd.price);
        }
        OrderCommandType::ReduceOrder => {
            w.i64(cmd.uid);
            w.i32(cmd.symbol);
            w.i64(cmd.order_id);
            w.i64(cmd.size);
        }
        OrderCommandType::OrderBookRequest => {
            w.i64(cmd.uid);
            w.i32(cmd.symbol);
            w.i64(cmd.size);
        }
        OrderCommandType::BalanceAdjustment => {
            w.i64(cmd.uid);
            w.i32(cmd.symbol);
            w.i64(cmd.order_id);
            w.i64(cmd.price);
            let kind = BalanceAdjustmentType::from_order_type(cmd.order_type);
            w.u8(match kind {
                BalanceAdjustmentType::Adjustment => 0,
                BalanceAdjustmentType::Suspend => 1,
            });
        }
        OrderCommandType::AddUser | OrderCommandType::SuspendUser | OrderCommandType::ResumeUser => {
            w.i64(cmd.uid);
        }
        OrderCommandType::BinaryDataCommand | OrderCommandType::BinaryDataQuery => {
            w.u8(if cmd.symbol == -1 { 1 } else { 0 });
            w.i64(cmd.order_id);
            w.i64(cmd.price);
            w.i64(cmd.reserve_bid_price);
            w.i64(cmd.size);
            w.i64(cmd.user_cookie);
        }
        OrderCommandType::GroupingControl => {
            w.i64(cmd.order_id);
        }
        OrderCommandType::Reset
        | OrderCommandType::Nop
        | OrderCommandType::PersistStateMatching
        | OrderCommandType::PersistStateRisk
        | OrderCommandType::ShutdownSignal
        | OrderCommandType::ReservedCompressed => {}
    }
    let crc = crc32fast::hash(&w.buf);
    w.buf.extend_from_slice(&crc.to_le_bytes());
    w.buf
}

/// Decode one record, returning the record and the number of bytes
/// consumed from `buf` so a caller walking a concatenated stream of
/// records can advance past it.
pub fn decode_record(buf: &[u8]) -> Result<(JournalRecord, usize), JournalError> {
    let mut r = Reader::new(buf);
    let type_code = r.u8()?;
    let command_type = command_type_from_code(type_code)?;
    let seq = r.i64()?;
    let timestamp = r.i64()?;
    let service_flags = r.i32()?;
    let events_group = r.i64()?;

    let mut cmd = OrderCommand::new(command_type);
    cmd.timestamp = timestamp;
    cmd.service_flags = service_flags;
    cmd.events_group = events_group;

    match command_type {
        OrderCommandType::PlaceOrder => {
            cmd.uid = r.i64()?;
            cmd.symbol = r.i32()?;
            cmd.order_id = r.i64()?;
            cmd.price = r.i64()?;
            cmd.reserve_bid_price = r.i64()?;
            cmd.size = r.i64()?;
            cmd.user_cookie = r.i64()?;
            let (action, order_type) = unpack_action_type(r.u8()?);
            cmd.action = action;
            cmd.order_type = order_type;
        }
        OrderCommandType::CancelOrder => {
            cmd.uid = r.i64()?;
            cmd.symbol = r.i32()?;
            cmd.order_id = r.i64()?;
        }
        OrderCommandType::MoveOrder => {
            cmd.uid = r.i64()?;
            cmd.symbol = r.i32()?;
            cmd.order_id = r.i64()?;
            cmd.price = r.i64()?;
        }
        OrderCommandType::ReduceOrder => {
            cmd.uid = r.i64()?;
            cmd.symbol = r.i32()?;
            cmd.order_id = r.i64()?;
            cmd.size = r.i64()?;
        }
        OrderCommandType::OrderBookRequest => {
            cmd.uid = r.i64()?;
            cmd.symbol = r.i32()?;
            cmd.size = r.i64()?;
        }
        OrderCommandType::BalanceAdjustment => {
            cmd.uid = r.i64()?;
            cmd.symbol = r.i32()?;
            cmd.order_id = r.i64()?;
            cmd.price = r.i64()?;
            cmd.order_type = match r.u8()? {
                1 => OrderType::Ioc,
                _ => OrderType::Gtc,
            };
        }
        OrderCommandType::AddUser | OrderCommandType::SuspendUser | OrderCommandType::ResumeUser => {
            cmd.uid = r.i64()?;
        }
        OrderCommandType::BinaryDataCommand | OrderCommandType::BinaryDataQuery => {
            let last = r.u8()?;
            cmd.order_id = r.i64()?;
            cmd.price = r.i64()?;
            cmd.reserve_bid_price = r.i64()?;
            cmd.size = r.i64()?;
            cmd.user_cookie = r.i64()?;
            cmd.symbol = if last != 0 { -1 } else { 0 };
        }
        OrderCommandType::GroupingControl => {
            cmd.order_id = r.i64()?;
        }
        OrderCommandType::Reset
        | OrderCommandType::Nop
        | OrderCommandType::PersistStateMatching
        | OrderCommandType::PersistStateRisk
        | OrderCommandType::ShutdownSignal
        | OrderCommandType::ReservedCompressed => {}
    }

    let body_end = r.pos;
    let stored_crc = r.u32()?;
    let computed_crc = crc32fast::hash(&buf[..body_end]);
    if stored_crc != computed_crc {
        return Err(JournalError::CorruptEntry {
            seq,
            expected: stored_crc,
            actual: computed_crc,
        });
    }

    Ok((JournalRecord { seq, command: cmd }, r.pos))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OrderCommandType;

    #[test]
    fn place_order_round_trips() {
        let mut cmd = OrderCommand::new(OrderCommandType::PlaceOrder);
        cmd.uid = 7;
        cmd.symbol = 3;
        cmd.order_id = 101;
        cmd.price = 1600;
        cmd.reserve_bid_price = 1650;
        cmd.size = 7;
        cmd.user_cookie = 55;
        cmd.timestamp = 123_456;
        cmd.service_flags = 1;
        cmd.events_group = 9;
        cmd.action = OrderAction::Bid;
        cmd.order_type = OrderType::Ioc;

        let bytes = encode_record(42, &cmd);
        let (decoded, consumed) = decode_record(&bytes).unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(decoded.seq, 42);
        assert_eq!(decoded.command.uid, 7);
        assert_eq!(decoded.command.symbol, 3);
        assert_eq!(decoded.command.order_id, 101);
        assert_eq!(decoded.command.price, 1600);
        assert_eq!(decoded.command.reserve_bid_price, 1650);
        assert_eq!(decoded.command.size, 7);
        assert_eq!(decoded.command.user_cookie, 55);
        assert_eq!(decoded.command.action, OrderAction::Bid);
        assert_eq!(decoded.command.order_type, OrderType::Ioc);
    }

    #[test]
    fn cancel_order_round_trips() {
        let mut cmd = OrderCommand::new(OrderCommandType::CancelOrder);
        cmd.uid = 1;
        cmd.symbol = 2;
        cmd.order_id = 9;
        let bytes = encode_record(1, &cmd);
        let (decoded, consumed) = decode_record(&bytes).unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(decoded.command.order_id, 9);
    }

    #[test]
    fn truncated_buffer_is_rejected() {
        let mut cmd = OrderCommand::new(OrderCommandType::CancelOrder);
        cmd.order_id = 1;
        let bytes = encode_record(1, &cmd);
        assert!(decode_record(&bytes[..bytes.len() - 1]).is_err());
    }

    #[test]
    fn flipped_byte_is_rejected_by_crc() {
        let mut cmd = OrderCommand::new(OrderCommandType::CancelOrder);
        cmd.order_id = 9;
        let mut bytes = encode_record(1, &cmd);
        // Flip a bit in the header, well clear of the CRC trailer.
        bytes[9] ^= 0xFF;
        match decode_record(&bytes) {
            Err(JournalError::CorruptEntry { seq, .. }) => assert_eq!(seq, 1),
            other => panic!("expected CorruptEntry, got {other:?}"),
        }
    }
}
