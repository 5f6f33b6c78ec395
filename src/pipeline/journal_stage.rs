//! The journaling consumer: reads the post-grouping stream and appends a
//! framed record per command, rotating/snapshotting on the same triggers
//! the risk and matching stages react to (§4.9).
//!
//! Chained strictly after grouping rather than run as a true sibling of
//! the pre-risk stage: the spec's source system lets journaling and R1
//! read the same slot concurrently because its memory model tolerates a
//! benign race on fields R1 never touches. Rust's aliasing rules don't
//! make that distinction — two threads must never hold overlapping
//! references to the same ring slot without a happens-before edge between
//! them — so journaling is placed one step upstream of R1 instead. It
//! still runs as its own thread and pipelines normally (it can be
//! journaling sequence N while risk processes N-1), it simply never
//! touches a slot at the same instant another stage does.

use std::sync::Arc;

use tracing::warn;

use crate::config::JournalConfiguration;
use crate::error::JournalError;
use crate::model::{OrderCommand, OrderCommandType};
use crate::ring::{RingBuffer, Sequence, SequenceBarrier};

use crate::journal::{JournalWriter, append_main_index};

/// Drives [`JournalWriter`] off the ring, one barrier-gated batch at a
/// time, until alerted.
pub struct JournalStage {
    writer: JournalWriter,
    config: JournalConfiguration,
    flush_trigger: usize,
    pending_bytes_estimate: usize,
}

impl JournalStage {
    pub fn new(config: JournalConfiguration, snapshot_id: u64) -> Result<Self, JournalError> {
        let writer = JournalWriter::create(
            &config.folder,
            &config.exchange_id,
            snapshot_id,
            config.journal_batch_compress_threshold,
            config.journal_file_max_size,
        )?;
        Ok(Self {
            writer,
            flush_trigger: config.journal_buffer_flush_trigger,
            config,
            pending_bytes_estimate: 0,
        })
    }

    /// Append one command, flushing once the estimated pending size
    /// crosses `journalBufferFlushTrigger`, and rolling to a new snapshot
    /// on `RESET` / `PERSIST_STATE_RISK` (§4.9 "A new journal file is
    /// started on RESET ... or on PERSIST_STATE_RISK").
    fn record(&mut self, seq: i64, cmd: &OrderCommand) -> Result<(), JournalError> {
        self.writer.append(seq, cmd);
        self.pending_bytes_estimate += 64;
        if self.pending_bytes_estimate >= self.flush_trigger {
            self.writer.flush()?;
            self.pending_bytes_estimate = 0;
        }
        if matches!(cmd.command, OrderCommandType::Reset | OrderCommandType::PersistStateRisk) {
            self.writer.flush()?;
            self.pending_bytes_estimate = 0;
            self.writer.start_new_snapshot(seq as u64)?;
            append_main_index(
                &self.config.folder,
                &self.config.exchange_id,
                epoch_millis(cmd.timestamp),
                seq,
                cmd.timestamp,
                seq as u64,
                "JOURNAL",
                0,
            )?;
        }
        Ok(())
    }

    pub fn run(
        mut self,
        ring: Arc<RingBuffer<OrderCommand>>,
        barrier: SequenceBarrier,
        own_sequence: Arc<Sequence>,
    ) {
        let mut next = 0i64;
        loop {
            let available = match barrier.wait_for(next) {
                Ok(a) => a,
                Err(_) => break,
            };
            if available < next {
                continue;
            }
            for seq in next..=available {
                let cmd = ring.get(seq);
                if let Err(err) = self.record(seq, cmd) {
                    warn!(error = %err, seq, "journal append failed");
                }
            }
            if let Err(err) = self.writer.flush() {
                warn!(error = %err, "journal flush failed");
            }
            own_sequence.set(available);
            next = available + 1;
        }
        let _ = self.writer.flush();
    }
}

/// `timestamp` is nanoseconds since an arbitrary epoch in tests; in
/// production it is `SystemTime`-derived, so this is already
/// millisecond-scale wall-clock time.
fn epoch_millis(timestamp_ns: i64) -> i64 {
    timestamp_ns / 1_000_000
}
