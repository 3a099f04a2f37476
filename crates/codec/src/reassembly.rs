//! Per-message reassembly state machine.
//!
//! Each in-flight sequence id moves Unseen → Pending → Complete. Malformed
//! records (duplicate headers, orphaned or out-of-range data) are logged and
//! dropped without touching existing state, so a buggy or malicious peer can
//! never reset a message that is already reassembling.
//!
//! Completion requires every declared byte position to have been written at
//! least once. Segments may arrive in any order and duplicates are tolerated;
//! a lost interior segment leaves the message pending until it expires,
//! rather than surfacing zero-padded text.

use std::collections::HashMap;

use herald_core::message::{ConnectionId, Message};
use herald_core::wire::{DataUnit, HeaderUnit, TransportRecord};
use tracing::warn;

/// Ticks a pending message may wait for its remaining segments before the
/// table evicts it.
pub const DEFAULT_EXPIRY_TICKS: u64 = 600;

struct Partial {
    message: Message,
    buf: Vec<u8>,
    /// Per-byte fill map; `received` counts bytes flipped to true.
    filled: Vec<bool>,
    received: usize,
    born_at: u64,
}

/// Tracks partially received messages by sequence id.
///
/// Owned exclusively by one dispatch engine; not safe for concurrent
/// mutation (duplicate detection assumes linearizable access).
pub struct ReassemblyTable {
    pending: HashMap<u32, Partial>,
    expiry_ticks: u64,
    now: u64,
}

impl ReassemblyTable {
    pub fn new() -> Self {
        Self::with_expiry(DEFAULT_EXPIRY_TICKS)
    }

    /// Create a table with a custom pending-message lifetime.
    pub fn with_expiry(expiry_ticks: u64) -> Self {
        Self {
            pending: HashMap::new(),
            expiry_ticks,
            now: 0,
        }
    }

    /// Feed one received record.
    ///
    /// Returns the completed message when this record supplied its final
    /// missing byte (or announced an empty message); `None` otherwise.
    /// The record is consumed either way — no record is processed twice.
    pub fn accept(&mut self, from: ConnectionId, record: TransportRecord) -> Option<Message> {
        match record {
            TransportRecord::Header(header) => self.accept_header(from, header),
            TransportRecord::Data(data) => self.accept_data(data),
        }
    }

    fn accept_header(&mut self, from: ConnectionId, header: HeaderUnit) -> Option<Message> {
        if self.pending.contains_key(&header.seq) {
            warn!(seq = header.seq, from = %from, "duplicate header for in-flight message, dropping");
            return None;
        }

        let mut message = Message::pending(
            header.seq,
            header.kind,
            header.status,
            from,
            header.flags,
            header.total_len,
        );

        // An empty message is complete the moment it is announced.
        if header.total_len == 0 {
            message.attach_text(String::new());
            return Some(message);
        }

        let total = header.total_len as usize;
        self.pending.insert(
            header.seq,
            Partial {
                message,
                buf: vec![0u8; total],
                filled: vec![false; total],
                received: 0,
                born_at: self.now,
            },
        );
        None
    }

    fn accept_data(&mut self, data: DataUnit) -> Option<Message> {
        let Some(partial) = self.pending.get_mut(&data.seq) else {
            warn!(seq = data.seq, start = data.start, "data segment for unknown message, dropping");
            return None;
        };

        let start = data.start as usize;
        let end = start + data.payload.len();
        if end > partial.buf.len() {
            warn!(
                seq = data.seq,
                start = data.start,
                end = end,
                total = partial.buf.len(),
                "data segment exceeds declared length, dropping"
            );
            return None;
        }

        partial.buf[start..end].copy_from_slice(&data.payload);
        for flag in &mut partial.filled[start..end] {
            if !*flag {
                *flag = true;
                partial.received += 1;
            }
        }

        if partial.received < partial.buf.len() {
            return None;
        }

        // Every byte covered: decode, hand off, free the bookkeeping.
        let mut partial = self.pending.remove(&data.seq)?;
        match String::from_utf8(std::mem::take(&mut partial.buf)) {
            Ok(text) => {
                partial.message.attach_text(text);
                Some(partial.message)
            }
            Err(e) => {
                warn!(seq = data.seq, error = %e, "reassembled payload is not UTF-8, dropping");
                None
            }
        }
    }

    /// Advance the table's clock and evict messages pending too long.
    ///
    /// Called once per simulation tick by the dispatch engine. Without this
    /// a permanently partial message would hold its buffer forever.
    pub fn tick(&mut self) {
        self.now += 1;
        let now = self.now;
        let horizon = self.expiry_ticks;
        self.pending.retain(|seq, partial| {
            let keep = now.saturating_sub(partial.born_at) < horizon;
            if !keep {
                warn!(
                    seq = seq,
                    received = partial.received,
                    total = partial.buf.len(),
                    "pending message expired before completing"
                );
            }
            keep
        });
    }

    /// Number of messages still waiting for segments.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

impl Default for ReassemblyTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::encode_text;
    use herald_core::message::{MessageFlags, MessageKind, MessageStatus};

    const SENDER: ConnectionId = ConnectionId(4);

    fn encode(seq: u32, text: &str) -> Vec<TransportRecord> {
        encode_text(
            seq,
            MessageKind::Command,
            MessageStatus::None,
            MessageFlags::empty(),
            text,
        )
    }

    fn feed_all(table: &mut ReassemblyTable, records: Vec<TransportRecord>) -> Vec<Message> {
        records
            .into_iter()
            .filter_map(|r| table.accept(SENDER, r))
            .collect()
    }

    #[test]
    fn in_order_reassembly() {
        let mut table = ReassemblyTable::new();
        let done = feed_all(&mut table, encode(1, "attack the gate"));
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].text(), Some("attack the gate"));
        assert_eq!(done[0].sender, SENDER);
        assert_eq!(table.pending_len(), 0);
    }

    #[test]
    fn reverse_order_reassembly_of_four_segments() {
        // 200 bytes → segments of 64 + 64 + 64 + 8, delivered in reverse.
        let text = "b".repeat(200);
        let mut records = encode(2, &text);
        let header = records.remove(0);
        records.reverse();

        let mut table = ReassemblyTable::new();
        assert!(table.accept(SENDER, header).is_none());
        let mut done = Vec::new();
        for record in records {
            if let Some(msg) = table.accept(SENDER, record) {
                done.push(msg);
            }
        }
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].text(), Some(text.as_str()));
    }

    #[test]
    fn empty_message_completes_on_header_alone() {
        let mut table = ReassemblyTable::new();
        let done = feed_all(&mut table, encode(3, ""));
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].text(), Some(""));
    }

    #[test]
    fn subset_of_segments_never_completes() {
        let text = "c".repeat(200);
        let mut records = encode(4, &text);
        // Drop one interior segment (offset 64).
        records.remove(2);

        let mut table = ReassemblyTable::new();
        let done = feed_all(&mut table, records);
        assert!(done.is_empty());
        assert_eq!(table.pending_len(), 1);
    }

    #[test]
    fn duplicate_header_leaves_buffer_unaltered() {
        let text = "d".repeat(100);
        let records = encode(5, &text);
        let header = records[0].clone();
        let first_data = records[1].clone();
        let last_data = records[2].clone();

        let mut table = ReassemblyTable::new();
        assert!(table.accept(SENDER, header.clone()).is_none());
        assert!(table.accept(SENDER, first_data).is_none());
        // A second header for the same seq must not reset in-flight data.
        assert!(table.accept(SENDER, header).is_none());
        let done = table.accept(SENDER, last_data);
        assert_eq!(done.unwrap().text(), Some(text.as_str()));
    }

    #[test]
    fn duplicate_data_segment_is_tolerated() {
        let text = "e".repeat(100);
        let records = encode(6, &text);

        let mut table = ReassemblyTable::new();
        assert!(table.accept(SENDER, records[0].clone()).is_none());
        assert!(table.accept(SENDER, records[1].clone()).is_none());
        assert!(table.accept(SENDER, records[1].clone()).is_none());
        let done = table.accept(SENDER, records[2].clone());
        assert_eq!(done.unwrap().text(), Some(text.as_str()));
    }

    #[test]
    fn orphan_data_segment_dropped() {
        let mut table = ReassemblyTable::new();
        let orphan = TransportRecord::Data(DataUnit {
            seq: 99,
            start: 0,
            payload: vec![b'x'; 8],
        });
        assert!(table.accept(SENDER, orphan).is_none());
        assert_eq!(table.pending_len(), 0);
    }

    #[test]
    fn oversized_data_segment_dropped() {
        let mut table = ReassemblyTable::new();
        let records = encode(7, "short");
        assert!(table.accept(SENDER, records[0].clone()).is_none());
        let huge = TransportRecord::Data(DataUnit {
            seq: 7,
            start: 0,
            payload: vec![b'x'; 32],
        });
        assert!(table.accept(SENDER, huge).is_none());
        // The well-formed segment still completes the message.
        let done = table.accept(SENDER, records[1].clone());
        assert_eq!(done.unwrap().text(), Some("short"));
    }

    #[test]
    fn invalid_utf8_payload_rejected_at_completion() {
        let mut table = ReassemblyTable::new();
        let header = TransportRecord::Header(HeaderUnit {
            seq: 8,
            kind: MessageKind::ChatMessage,
            status: MessageStatus::None,
            total_len: 2,
            flags: MessageFlags::empty(),
        });
        let data = TransportRecord::Data(DataUnit {
            seq: 8,
            start: 0,
            payload: vec![0xff, 0xfe],
        });
        assert!(table.accept(SENDER, header).is_none());
        assert!(table.accept(SENDER, data).is_none());
        assert_eq!(table.pending_len(), 0);
    }

    #[test]
    fn pending_message_expires_after_horizon() {
        let mut table = ReassemblyTable::with_expiry(3);
        let mut records = encode(9, &"f".repeat(100));
        records.pop(); // withhold the final segment
        feed_all(&mut table, records);
        assert_eq!(table.pending_len(), 1);

        table.tick();
        table.tick();
        assert_eq!(table.pending_len(), 1);
        table.tick();
        assert_eq!(table.pending_len(), 0);
    }
}
